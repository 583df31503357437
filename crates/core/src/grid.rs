//! The dungeon grid: cell layout, movement rules and the text save format.

use std::fmt;
use std::fs;
use std::path::Path;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cell::{CellKind, Direction};
use crate::error::CoreError;

/// A (row, col) grid coordinate; `(0, 0)` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coord {
    pub row: usize,
    pub col: usize,
}

impl Coord {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// A validated `rows × cols` grid of cells, stored row-major.
///
/// Invariant: exactly one start, exactly one treasure, at least one key and
/// at least one sword. Every constructor checks it, so a `GridMap` in hand
/// is always a playable layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridMap {
    rows: usize,
    cols: usize,
    cells: Vec<CellKind>,
    start: Coord,
    treasure: Coord,
}

impl GridMap {
    /// Build a grid from row-major cells.
    ///
    /// # Errors
    ///
    /// Returns an error if the dimensions are empty, the cell count does not
    /// match, or the layout breaks the map invariant.
    pub fn new(rows: usize, cols: usize, cells: Vec<CellKind>) -> Result<Self, CoreError> {
        if rows == 0 || cols == 0 {
            return Err(CoreError::InvalidDimensions { rows, cols });
        }
        if cells.len() != rows * cols {
            return Err(CoreError::InvalidMap {
                reason: format!("expected {} cells, got {}", rows * cols, cells.len()),
            });
        }
        Self::validate(&cells)?;

        let find = |kind: CellKind| {
            let pos = cells.iter().position(|&c| c == kind).unwrap_or(0);
            Coord::new(pos / cols, pos % cols)
        };
        let start = find(CellKind::Start);
        let treasure = find(CellKind::Treasure);

        Ok(Self {
            rows,
            cols,
            cells,
            start,
            treasure,
        })
    }

    /// Check the one-start / one-treasure / ≥1-key / ≥1-sword invariant.
    pub fn validate(cells: &[CellKind]) -> Result<(), CoreError> {
        let count = |kind: CellKind| cells.iter().filter(|&&c| c == kind).count();
        let (starts, treasures) = (count(CellKind::Start), count(CellKind::Treasure));
        let (keys, swords) = (count(CellKind::Key), count(CellKind::Sword));

        if starts != 1 {
            return Err(CoreError::InvalidMap {
                reason: format!("expected exactly one start, found {}", starts),
            });
        }
        if treasures != 1 {
            return Err(CoreError::InvalidMap {
                reason: format!("expected exactly one treasure, found {}", treasures),
            });
        }
        if keys == 0 {
            return Err(CoreError::InvalidMap {
                reason: "no key on the map".to_string(),
            });
        }
        if swords == 0 {
            return Err(CoreError::InvalidMap {
                reason: "no sword on the map".to_string(),
            });
        }
        Ok(())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Number of cells (`rows * cols`).
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> &[CellKind] {
        &self.cells
    }

    pub fn start(&self) -> Coord {
        self.start
    }

    pub fn treasure(&self) -> Coord {
        self.treasure
    }

    /// All key cells, in row-major order.
    pub fn keys(&self) -> Vec<Coord> {
        self.coords_of(CellKind::Key)
    }

    /// All cells of a given kind, in row-major order.
    pub fn coords_of(&self, kind: CellKind) -> Vec<Coord> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, &c)| c == kind)
            .map(|(pos, _)| self.coord(pos))
            .collect()
    }

    /// Linear position `row * cols + col`.
    pub fn position(&self, coord: Coord) -> usize {
        coord.row * self.cols + coord.col
    }

    /// Inverse of [`GridMap::position`].
    pub fn coord(&self, position: usize) -> Coord {
        Coord::new(position / self.cols, position % self.cols)
    }

    pub fn contains(&self, coord: Coord) -> bool {
        coord.row < self.rows && coord.col < self.cols
    }

    /// Cell at a coordinate, `None` when off-grid.
    pub fn get(&self, coord: Coord) -> Option<CellKind> {
        if self.contains(coord) {
            Some(self.cells[self.position(coord)])
        } else {
            None
        }
    }

    /// Cell at a linear position.
    ///
    /// # Panics
    ///
    /// Panics if `position >= self.len()`.
    pub fn cell(&self, position: usize) -> CellKind {
        self.cells[position]
    }

    /// Position after one step, clamped to the grid bounds.
    ///
    /// A move off the edge leaves the position unchanged.
    pub fn move_coord(&self, coord: Coord, direction: Direction) -> Coord {
        let (dr, dc) = direction.delta();
        let row = (coord.row as isize + dr).clamp(0, self.rows as isize - 1) as usize;
        let col = (coord.col as isize + dc).clamp(0, self.cols as isize - 1) as usize;
        Coord::new(row, col)
    }

    /// In-bounds neighbours with the direction that reaches each of them.
    pub fn neighbors(&self, coord: Coord) -> Vec<(Coord, Direction)> {
        Direction::ALL
            .iter()
            .filter_map(|&d| {
                let next = self.move_coord(coord, d);
                (next != coord).then_some((next, d))
            })
            .collect()
    }

    /// Manhattan distance.
    pub fn distance(a: Coord, b: Coord) -> usize {
        a.row.abs_diff(b.row) + a.col.abs_diff(b.col)
    }

    /// Every non-wall cell within `max_dist` of `center`, in row-major order.
    ///
    /// With `max_dist < 0` the whole grid is a candidate, `center` included.
    /// Otherwise the candidates lie at distance `1..=max_dist`, so `center`
    /// itself is excluded.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NoCandidateCell`] when nothing qualifies.
    pub fn cells_within(&self, center: Coord, max_dist: i64) -> Result<Vec<Coord>, CoreError> {
        let candidates: Vec<Coord> = (0..self.len())
            .map(|pos| self.coord(pos))
            .filter(|&c| {
                let d = Self::distance(center, c) as i64;
                (max_dist < 0 || (0 < d && d <= max_dist)) && self.get(c) != Some(CellKind::Wall)
            })
            .collect();

        if candidates.is_empty() {
            return Err(CoreError::NoCandidateCell {
                row: center.row,
                col: center.col,
                max_dist,
            });
        }
        Ok(candidates)
    }

    /// Draw uniformly from [`GridMap::cells_within`].
    pub fn random_cell_within<R: Rng + ?Sized>(
        &self,
        center: Coord,
        max_dist: i64,
        rng: &mut R,
    ) -> Result<Coord, CoreError> {
        let candidates = self.cells_within(center, max_dist)?;
        // cells_within never returns an empty list
        Ok(*candidates.choose(rng).unwrap_or(&center))
    }

    /// Serialize to the two-line save format: `"<rows>,<cols>"` then one
    /// letter per cell.
    pub fn to_save_string(&self) -> String {
        let letters: String = self.cells.iter().map(|c| c.to_save_char()).collect();
        format!("{},{}\n{}", self.rows, self.cols, letters)
    }

    /// Parse the two-line save format.
    ///
    /// # Errors
    ///
    /// [`CoreError::Parse`] for a malformed header, cell count or letter;
    /// [`CoreError::InvalidMap`] when the layout breaks the map invariant.
    pub fn parse(text: &str) -> Result<Self, CoreError> {
        let mut lines = text.lines();

        let header = lines.next().ok_or_else(|| CoreError::Parse {
            line: 1,
            reason: "missing dimensions header".to_string(),
        })?;
        let dims: Vec<&str> = header.trim().split(',').collect();
        if dims.len() != 2 {
            return Err(CoreError::Parse {
                line: 1,
                reason: format!("expected \"<rows>,<cols>\", got {:?}", header),
            });
        }
        let parse_dim = |s: &str| {
            s.trim().parse::<usize>().map_err(|e| CoreError::Parse {
                line: 1,
                reason: format!("bad dimension {:?}: {}", s, e),
            })
        };
        let (rows, cols) = (parse_dim(dims[0])?, parse_dim(dims[1])?);

        let body = lines.next().unwrap_or("").trim_end();
        let cells = body
            .chars()
            .enumerate()
            .map(|(i, c)| {
                CellKind::from_save_char(c).ok_or_else(|| CoreError::Parse {
                    line: 2,
                    reason: format!("unknown cell letter {:?} at column {}", c, i),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if cells.len() != rows * cols {
            return Err(CoreError::Parse {
                line: 2,
                reason: format!("expected {} cells, got {}", rows * cols, cells.len()),
            });
        }

        Self::new(rows, cols, cells)
    }

    /// Write the save format to a file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), CoreError> {
        fs::write(path.as_ref(), self.to_save_string())?;
        debug!(path = %path.as_ref().display(), "saved map");
        Ok(())
    }

    /// Read a map from a file in the save format.
    ///
    /// A missing file is reported as [`CoreError::Io`] so the caller can
    /// fall back to generating a fresh map.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let text = fs::read_to_string(path.as_ref())?;
        let grid = Self::parse(&text)?;
        debug!(path = %path.as_ref().display(), rows = grid.rows, cols = grid.cols, "loaded map");
        Ok(grid)
    }
}

impl fmt::Display for GridMap {
    /// Box-drawing rendering, e.g.
    ///
    /// ```text
    /// ┌───┬───┐
    /// │ T │ K │
    /// ├───┼───┤
    /// │ S │ ◦ │
    /// └───┴───┘
    /// ```
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let span = |left: &str, mid: &str, right: &str| {
            format!("{}───{}{}", left, format!("{}───", mid).repeat(self.cols - 1), right)
        };
        writeln!(f, "{}", span("┌", "┬", "┐"))?;
        for row in 0..self.rows {
            let line: Vec<String> = (0..self.cols)
                .map(|col| self.cells[row * self.cols + col].glyph().to_string())
                .collect();
            writeln!(f, "│ {} │", line.join(" │ "))?;
            if row + 1 < self.rows {
                writeln!(f, "{}", span("├", "┼", "┤"))?;
            }
        }
        writeln!(f, "{}", span("└", "┴", "┘"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::EnemyKind;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn tiny() -> GridMap {
        GridMap::parse("2,2\ngihb").unwrap()
    }

    #[test]
    fn test_parse_and_accessors() {
        let grid = tiny();
        assert_eq!(grid.rows(), 2);
        assert_eq!(grid.cols(), 2);
        assert_eq!(grid.start(), Coord::new(1, 1));
        assert_eq!(grid.treasure(), Coord::new(0, 0));
        assert_eq!(grid.keys(), vec![Coord::new(0, 1)]);
        assert_eq!(grid.get(Coord::new(1, 0)), Some(CellKind::Sword));
        assert_eq!(grid.get(Coord::new(2, 0)), None);
    }

    #[test]
    fn test_save_string_roundtrip() {
        let text = "3,3\ngahdlijkb\n";
        let grid = GridMap::parse(text).unwrap();
        assert_eq!(grid.to_save_string(), text.trim_end());
        assert_eq!(
            grid.get(Coord::new(1, 1)),
            Some(CellKind::Enemy(EnemyKind::Special))
        );
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(matches!(GridMap::parse(""), Err(CoreError::Parse { .. })));
        assert!(matches!(
            GridMap::parse("2;2\ngihb"),
            Err(CoreError::Parse { line: 1, .. })
        ));
        assert!(matches!(
            GridMap::parse("2,2\ngih"),
            Err(CoreError::Parse { line: 2, .. })
        ));
        assert!(matches!(
            GridMap::parse("2,2\ngihz"),
            Err(CoreError::Parse { line: 2, .. })
        ));
    }

    #[test]
    fn test_invariant_violations() {
        // two starts
        assert!(matches!(
            GridMap::parse("2,2\ngibb"),
            Err(CoreError::InvalidMap { .. })
        ));
        // no sword
        assert!(matches!(
            GridMap::parse("2,2\ngiab"),
            Err(CoreError::InvalidMap { .. })
        ));
        // no key
        assert!(matches!(
            GridMap::parse("2,2\ngahb"),
            Err(CoreError::InvalidMap { .. })
        ));
    }

    #[test]
    fn test_move_clamps_to_bounds() {
        let grid = tiny();
        let corner = Coord::new(0, 0);
        assert_eq!(grid.move_coord(corner, Direction::North), corner);
        assert_eq!(grid.move_coord(corner, Direction::West), corner);
        assert_eq!(grid.move_coord(corner, Direction::East), Coord::new(0, 1));
        assert_eq!(grid.move_coord(corner, Direction::South), Coord::new(1, 0));
    }

    #[test]
    fn test_neighbors_report_direction() {
        let grid = GridMap::parse("3,3\ngaaaihaab").unwrap();
        let center = grid.neighbors(Coord::new(1, 1));
        assert_eq!(center.len(), 4);
        assert!(center.contains(&(Coord::new(0, 1), Direction::North)));
        assert!(center.contains(&(Coord::new(1, 0), Direction::West)));

        let corner = grid.neighbors(Coord::new(2, 2));
        assert_eq!(
            corner,
            vec![
                (Coord::new(1, 2), Direction::North),
                (Coord::new(2, 1), Direction::West)
            ]
        );
    }

    #[test]
    fn test_cells_within_skips_walls_and_center() {
        let grid = GridMap::parse("3,3\ngcaaihaab").unwrap();
        let near = grid.cells_within(Coord::new(0, 0), 1).unwrap();
        assert_eq!(near, vec![Coord::new(1, 0)]);

        let all = grid.cells_within(Coord::new(0, 0), -1).unwrap();
        assert_eq!(all.len(), 8);
        assert!(all.contains(&Coord::new(0, 0)));
    }

    #[test]
    fn test_cells_within_empty_fails() {
        let grid = tiny();
        // radius 0 never includes the center itself
        let err = grid.cells_within(Coord::new(0, 1), 0).unwrap_err();
        assert!(matches!(err, CoreError::NoCandidateCell { .. }));
    }

    #[test]
    fn test_random_cell_within_draws_candidates() {
        let grid = GridMap::parse("3,3\ngaaaihaab").unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let c = grid.random_cell_within(Coord::new(1, 1), 1, &mut rng).unwrap();
            assert_eq!(GridMap::distance(c, Coord::new(1, 1)), 1);
        }
    }

    #[test]
    fn test_display() {
        let expected = "┌───┬───┐\n│ T │ K │\n├───┼───┤\n│ S │ ◦ │\n└───┴───┘\n";
        assert_eq!(tiny().to_string(), expected);
    }

    #[test]
    fn test_load_missing_file_is_recoverable() {
        let err = GridMap::load("/nonexistent/dungeon.map").unwrap_err();
        assert!(matches!(err, CoreError::Io(_)));
    }
}

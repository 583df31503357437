//! A* shortest paths on the dungeon grid, and the winnability oracle.
//!
//! Every step costs `g = 10` and the heuristic is `h = 10 · manhattan`,
//! which is admissible with four-way moves at uniform cost. The open list is
//! kept unsorted: each iteration scans it for the lowest `f`, breaking ties
//! by insertion order.

use tracing::debug;

use crate::cell::CellKind;
use crate::error::CoreError;
use crate::grid::{Coord, GridMap};

/// Cost of one orthogonal step.
pub const STEP_COST: usize = 10;

/// Per-cell search bookkeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeRecord {
    pub parent: Option<usize>,
    pub f: usize,
    pub g: usize,
    pub h: usize,
}

/// A* search over one loaded map, skipping every cell kind in `unreachable`.
#[derive(Debug, Clone)]
pub struct PathFinder<'a> {
    unreachable: Vec<CellKind>,
    map: Option<&'a GridMap>,
    records: Vec<NodeRecord>,
    objective: Option<Coord>,
}

impl<'a> PathFinder<'a> {
    /// Cells the winnability check refuses to cross. Portals are excluded
    /// because they only ever give a random shortcut.
    pub const NO_PORTALS: [CellKind; 3] = [CellKind::Wall, CellKind::Crack, CellKind::Portal];

    /// Cells no path can cross.
    pub const DEFAULT_UNREACHABLE: [CellKind; 2] = [CellKind::Wall, CellKind::Crack];

    pub fn new(unreachable: &[CellKind]) -> Self {
        Self {
            unreachable: unreachable.to_vec(),
            map: None,
            records: Vec::new(),
            objective: None,
        }
    }

    /// Attach a map; required before any query.
    pub fn load_map(&mut self, map: &'a GridMap) {
        self.map = Some(map);
        self.records = vec![NodeRecord::default(); map.len()];
        self.objective = None;
    }

    pub fn unload_map(&mut self) {
        self.map = None;
        self.records.clear();
        self.objective = None;
    }

    /// True once a map is loaded and an objective set.
    pub fn ready(&self) -> bool {
        self.map.is_some() && self.objective.is_some()
    }

    /// Record for a cell after the last search.
    pub fn record(&self, coord: Coord) -> Option<&NodeRecord> {
        let map = self.map?;
        map.contains(coord)
            .then(|| &self.records[map.position(coord)])
    }

    fn reachable(&self, map: &GridMap, coord: Coord) -> bool {
        map.get(coord)
            .map(|cell| !self.unreachable.contains(&cell))
            .unwrap_or(false)
    }

    /// `10 ×` the Manhattan distance to the current objective.
    pub fn heuristic(&self, coord: Coord) -> Result<usize, CoreError> {
        let objective = self.objective.ok_or(CoreError::NoObjective)?;
        Ok(STEP_COST * GridMap::distance(coord, objective))
    }

    /// Shortest path from `start` to `goal`, both ends included.
    ///
    /// Returns `Ok(None)` when no path exists.
    ///
    /// # Errors
    ///
    /// [`CoreError::NotLoaded`] before [`PathFinder::load_map`];
    /// [`CoreError::PositionOutOfBounds`] if an endpoint is off-grid.
    pub fn find_path(&mut self, start: Coord, goal: Coord) -> Result<Option<Vec<Coord>>, CoreError> {
        let map = self.map.ok_or(CoreError::NotLoaded)?;
        for c in [start, goal] {
            if !map.contains(c) {
                return Err(CoreError::PositionOutOfBounds {
                    row: c.row,
                    col: c.col,
                    rows: map.rows(),
                    cols: map.cols(),
                });
            }
        }
        self.objective = Some(goal);
        self.records.iter_mut().for_each(|r| *r = NodeRecord::default());

        let start_pos = map.position(start);
        let goal_pos = map.position(goal);
        self.records[start_pos].h = self.heuristic(start)?;
        self.records[start_pos].f = self.records[start_pos].h;

        let mut open: Vec<usize> = vec![start_pos];
        let mut in_open = vec![false; map.len()];
        let mut closed = vec![false; map.len()];
        in_open[start_pos] = true;

        while !open.is_empty() {
            // lowest f, first inserted wins ties
            let mut best = 0;
            for (i, &pos) in open.iter().enumerate() {
                if self.records[pos].f < self.records[open[best]].f {
                    best = i;
                }
            }
            let current = open.remove(best);
            in_open[current] = false;
            closed[current] = true;

            if current == goal_pos {
                let path = self.trace_back(map, start_pos, goal_pos);
                debug!(%start, %goal, length = path.len(), "path found");
                return Ok(Some(path));
            }

            for (next, _) in map.neighbors(map.coord(current)) {
                let next_pos = map.position(next);
                if closed[next_pos] || !self.reachable(map, next) {
                    continue;
                }
                let g = self.records[current].g + STEP_COST;
                if in_open[next_pos] {
                    if self.records[next_pos].g > g {
                        self.update(next, next_pos, current, g)?;
                    }
                } else {
                    self.update(next, next_pos, current, g)?;
                    open.push(next_pos);
                    in_open[next_pos] = true;
                }
            }
        }

        debug!(%start, %goal, "no path");
        Ok(None)
    }

    fn update(&mut self, coord: Coord, pos: usize, parent: usize, g: usize) -> Result<(), CoreError> {
        let h = self.heuristic(coord)?;
        self.records[pos] = NodeRecord {
            parent: Some(parent),
            f: g + h,
            g,
            h,
        };
        Ok(())
    }

    fn trace_back(&self, map: &GridMap, start: usize, goal: usize) -> Vec<Coord> {
        let mut path = vec![map.coord(goal)];
        let mut pos = goal;
        while pos != start {
            match self.records[pos].parent {
                Some(parent) => {
                    pos = parent;
                    path.push(map.coord(pos));
                }
                None => break,
            }
        }
        path.reverse();
        path
    }

    /// Cost of a path: `10` per step.
    pub fn path_cost(path: &[Coord]) -> usize {
        STEP_COST * path.len().saturating_sub(1)
    }
}

/// Shortest path avoiding walls and cracks.
pub fn shortest_path(grid: &GridMap, start: Coord, goal: Coord) -> Result<Option<Vec<Coord>>, CoreError> {
    let mut finder = PathFinder::new(&PathFinder::DEFAULT_UNREACHABLE);
    finder.load_map(grid);
    finder.find_path(start, goal)
}

/// The three legs of a winning route, start → key → treasure → start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WinningRoute {
    pub to_key: Vec<Coord>,
    pub to_treasure: Vec<Coord>,
    pub back: Vec<Coord>,
}

impl WinningRoute {
    pub fn cost(&self) -> usize {
        PathFinder::path_cost(&self.to_key)
            + PathFinder::path_cost(&self.to_treasure)
            + PathFinder::path_cost(&self.back)
    }
}

/// Shortest portal-free route through some key, or `None` if no key admits
/// one. Among several keys, the cheapest route wins.
pub fn winning_route(grid: &GridMap) -> Result<Option<WinningRoute>, CoreError> {
    let mut finder = PathFinder::new(&PathFinder::NO_PORTALS);
    finder.load_map(grid);
    let (start, treasure) = (grid.start(), grid.treasure());

    let back = match finder.find_path(treasure, start)? {
        Some(path) => path,
        None => return Ok(None),
    };

    let mut best: Option<WinningRoute> = None;
    for key in grid.keys() {
        let Some(to_key) = finder.find_path(start, key)? else {
            continue;
        };
        let Some(to_treasure) = finder.find_path(key, treasure)? else {
            continue;
        };
        let route = WinningRoute {
            to_key,
            to_treasure,
            back: back.clone(),
        };
        if best.as_ref().map_or(true, |b| route.cost() < b.cost()) {
            best = Some(route);
        }
    }
    Ok(best)
}

/// A map is winnable when start → key → treasure → start can be walked
/// without stepping on walls, cracks or portals.
pub fn is_winnable(grid: &GridMap) -> Result<bool, CoreError> {
    Ok(winning_route(grid)?.is_some())
}

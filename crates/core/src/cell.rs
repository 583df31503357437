//! Cell kinds and movement directions.
//!
//! Cells are a closed set of tagged variants. Everything that reacts to a
//! cell (the stationary chain, the live environment, the path finder)
//! matches on [`CellKind`] exhaustively.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The two enemy variants.
///
/// A normal enemy is dangerous to an unarmed adventurer; a special enemy
/// is the inverse, harmless without the sword and dangerous with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnemyKind {
    Normal,
    Special,
}

/// What occupies a single grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellKind {
    Empty,
    Start,
    Wall,
    Enemy(EnemyKind),
    Trap,
    Crack,
    Treasure,
    Sword,
    Key,
    Portal,
    MovingPlatform,
}

impl CellKind {
    /// Portal and moving platform cells redirect the adventurer elsewhere.
    pub fn is_recursive(self) -> bool {
        matches!(self, CellKind::Portal | CellKind::MovingPlatform)
    }

    /// Letter used by the text save format.
    pub fn to_save_char(self) -> char {
        match self {
            CellKind::Empty => 'a',
            CellKind::Start => 'b',
            CellKind::Wall => 'c',
            CellKind::Enemy(EnemyKind::Normal) => 'd',
            CellKind::Trap => 'e',
            CellKind::Crack => 'f',
            CellKind::Treasure => 'g',
            CellKind::Sword => 'h',
            CellKind::Key => 'i',
            CellKind::Portal => 'j',
            CellKind::MovingPlatform => 'k',
            CellKind::Enemy(EnemyKind::Special) => 'l',
        }
    }

    /// Inverse of [`CellKind::to_save_char`].
    pub fn from_save_char(c: char) -> Option<Self> {
        let cell = match c {
            'a' => CellKind::Empty,
            'b' => CellKind::Start,
            'c' => CellKind::Wall,
            'd' => CellKind::Enemy(EnemyKind::Normal),
            'e' => CellKind::Trap,
            'f' => CellKind::Crack,
            'g' => CellKind::Treasure,
            'h' => CellKind::Sword,
            'i' => CellKind::Key,
            'j' => CellKind::Portal,
            'k' => CellKind::MovingPlatform,
            'l' => CellKind::Enemy(EnemyKind::Special),
            _ => return None,
        };
        Some(cell)
    }

    /// Single glyph used when rendering a grid.
    pub fn glyph(self) -> char {
        match self {
            CellKind::Empty => ' ',
            CellKind::Start => '◦',
            CellKind::Wall => '■',
            CellKind::Enemy(EnemyKind::Normal) => 'E',
            CellKind::Enemy(EnemyKind::Special) => 'Ê',
            CellKind::Trap => 'R',
            CellKind::Crack => 'C',
            CellKind::Treasure => 'T',
            CellKind::Sword => 'S',
            CellKind::Key => 'K',
            CellKind::Portal => 'P',
            CellKind::MovingPlatform => '-',
        }
    }
}

impl fmt::Display for CellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.glyph())
    }
}

/// The four cardinal moves. The discriminant is the action index used by
/// every tensor and table (`0..4`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North = 0,
    East = 1,
    South = 2,
    West = 3,
}

impl Direction {
    /// All directions in action-index order.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Number of actions.
    pub const COUNT: usize = 4;

    /// Action index in `0..4`.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Direction for an action index, `None` outside `0..4`.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// The opposite direction: if B is north of A, A is south of B.
    pub fn reverse(self) -> Self {
        Self::ALL[(self.index() + 2) % 4]
    }

    /// (row, col) offset of one step.
    pub fn delta(self) -> (isize, isize) {
        match self {
            Direction::North => (-1, 0),
            Direction::East => (0, 1),
            Direction::South => (1, 0),
            Direction::West => (0, -1),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arrow = match self {
            Direction::North => '↑',
            Direction::East => '→',
            Direction::South => '↓',
            Direction::West => '←',
        };
        write!(f, "{}", arrow)
    }
}

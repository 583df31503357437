//! # Error Types
//!
//! Errors in the dungeon core are caller errors: asking for a state id that
//! does not exist, querying the path finder before a map is loaded, or
//! handing over a grid that breaks the map invariants. None of them are
//! silently defaulted.

use thiserror::Error;

/// Core errors for grids, state encoding and path finding.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A grid needs at least one row and one column.
    #[error("Invalid dimensions: {rows}x{cols}")]
    InvalidDimensions { rows: usize, cols: usize },

    /// State id outside `0..=max_id`.
    #[error("State id {id} out of range (max id {max_id})")]
    OutOfRange { id: usize, max_id: usize },

    /// The death id has no (sword, stage, position) decomposition.
    #[error("State id {id} is the terminal death state")]
    TerminalState { id: usize },

    /// Grid position outside the map.
    #[error("Position ({row}, {col}) outside a {rows}x{cols} grid")]
    PositionOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    /// Map invariant violated (one start, one treasure, keys, swords).
    #[error("Invalid map: {reason}")]
    InvalidMap { reason: String },

    /// `cells_within` found nothing to choose from.
    #[error("No candidate cell within distance {max_dist} of ({row}, {col})")]
    NoCandidateCell { row: usize, col: usize, max_dist: i64 },

    /// Path finder used before `load_map`.
    #[error("Path finder has no map loaded")]
    NotLoaded,

    /// Path finder used before an objective was set.
    #[error("Path finder has no objective")]
    NoObjective,

    /// Malformed saved map.
    #[error("Parse error at line {line}: {reason}")]
    Parse { line: usize, reason: String },

    /// A configuration value is outside its domain.
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// The generator could not produce a winnable map.
    #[error("No winnable map found after {attempts} attempts")]
    GenerationExhausted { attempts: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

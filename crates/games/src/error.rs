//! Error types for game operations.

use dungeon_core::CoreError;
use dungeon_mdp::MdpError;
use dungeon_prob::ProbError;
use thiserror::Error;

/// Errors that can occur in game operations.
#[derive(Debug, Error)]
pub enum GameError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Mdp(#[from] MdpError),

    #[error(transparent)]
    Prob(#[from] ProbError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The episode is already over.
    #[error("Environment is in terminal state")]
    TerminalState,

    /// A Q-table with the wrong number of rows for this map.
    #[error("Q-table has {got} rows, expected {expected}")]
    QTableShape { expected: usize, got: usize },

    /// Malformed Q-table text.
    #[error("Q-table parse error at line {line}: {reason}")]
    Parse { line: usize, reason: String },

    /// A configuration value is outside its domain.
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

//! Error types for MDP construction and solving.

use dungeon_core::CoreError;
use dungeon_prob::ProbError;
use thiserror::Error;

/// Errors raised while building or solving the dungeon MDP.
#[derive(Debug, Error)]
pub enum MdpError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Prob(#[from] ProbError),

    /// A configuration value is outside its domain.
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// A transition row is not a probability distribution.
    #[error("Transition row ({state}, {action}) sums to {sum}")]
    RowNotNormalized {
        state: usize,
        action: usize,
        sum: f64,
    },

    /// Tensors of different state counts were combined.
    #[error("State count mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: usize, got: usize },

    /// The planner was queried before a solve.
    #[error("No policy available: solve the MDP first")]
    NotReady,

    /// Policy evaluation hit a singular linear system.
    #[error("Singular policy evaluation system at iteration {iteration}")]
    SingularSystem { iteration: usize },
}

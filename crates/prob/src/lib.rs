//! # Dungeon Prob - Finite Distributions and Markov Kernels
//!
//! The probability layer under the dungeon chain:
//!
//! ## Core Concepts
//!
//! - **Distributions**: Non-negative vectors summing to 1 over `{0..n}`
//! - **Kernels**: Row-stochastic matrices, `K[i,j]` = P(next=j | now=i)
//! - **Pushing forward**: `μK[j] = Σᵢ μ[i] · K[i,j]`
//! - **Fixed points**: Iterating `μ ← μK` until nothing moves, which is how
//!   chains of portals and moving platforms are resolved
//!
//! ## Example: Platform Drifting Into a Room
//!
//! ```rust
//! use dungeon_prob::{Dist, Kernel};
//!
//! // 0: platform, 1 and 2: ordinary floor
//! let drift = Kernel::new(vec![
//!     vec![0.0, 0.5, 0.5],
//!     vec![0.0, 1.0, 0.0],
//!     vec![0.0, 0.0, 1.0],
//! ]).unwrap();
//!
//! let landed = drift.converge(&Dist::point(3, 0), 100, 1e-12).unwrap();
//! assert!(landed.converged);
//! assert!((landed.dist.p[1] - 0.5).abs() < 1e-12);
//! ```

mod dist;
mod error;
mod kernel;

pub use dist::Dist;
pub use error::ProbError;
pub use kernel::{FixedPoint, Kernel};

/// Tolerance for probability comparisons.
pub const PROB_TOLERANCE: f64 = 1e-9;

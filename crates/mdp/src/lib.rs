//! # Dungeon MDP - Tensors and Exact Solvers
//!
//! Turns a [`dungeon_core::GridMap`] into a finite Markov decision process
//! and solves it.
//!
//! ## Core Concepts
//!
//! - **Stationary chain**: What entering an ordinary cell does to the
//!   adventurer (items, fights, traps, walls, cracks)
//! - **Recursive resolver**: Portals and moving platforms flattened into a
//!   single landing distribution by fixed-point iteration
//! - **Transition tensor**: `T[s][a][s']`, built per destination cell and
//!   scattered back along reversed directions
//! - **Reward tensor**: `R[s][a]`, paid only on certain transitions
//! - **Solvers**: Value iteration and exact policy iteration
//!
//! ## Example
//!
//! ```rust
//! use dungeon_core::GridMap;
//! use dungeon_mdp::{Method, Planner, PlannerConfig};
//!
//! // treasure key
//! // sword    start
//! let grid = GridMap::parse("2,2\ngihb").unwrap();
//! let mut planner = Planner::new(grid, PlannerConfig::default()).unwrap();
//! let solution = planner.solve(Method::ValueIteration).unwrap();
//! assert!(solution.converged());
//! ```

pub mod config;
pub mod error;
pub mod planner;
pub mod resolver;
pub mod reward;
pub mod solver;
pub mod stationary;
pub mod transition;

pub use config::{ChainConfig, PlannerConfig, ResolverConfig, SolverConfig, TrapOdds};
pub use error::MdpError;
pub use planner::Planner;
pub use resolver::RecursiveResolver;
pub use reward::{
    build_rewards, RewardTensor, DEATH_REWARD, KEY_REWARD, TREASURE_REWARD, WIN_REWARD,
};
pub use solver::{MdpSolver, Method, Solution, Termination};
pub use stationary::StationaryChain;
pub use transition::{TransitionBuilder, TransitionTensor};

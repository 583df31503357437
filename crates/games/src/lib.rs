//! # Dungeon Games - Live Play and Learning
//!
//! The sampled side of the dungeon: an environment that plays out moves,
//! policies that choose them, and a learner that needs no model at all.
//!
//! ## Core Components
//!
//! - [`Env`]: World dynamics, `(State, Act) -> (State, Obs, Reward)`
//! - [`DungeonEnv`]: The dungeon itself, observed through dense state ids
//! - [`Policy`]: `Obs -> Act`; random, tabular (from a solved planner),
//!   greedy or softmax over a Q-table
//! - [`QLearner`]: Online one-step Q-learning with Boltzmann exploration
//! - [`rollout()`] / [`evaluate()`]: Policy meets environment
//!
//! ## Example
//!
//! ```rust
//! use dungeon_core::GridMap;
//! use dungeon_games::{DungeonConfig, DungeonEnv, QLearner, QLearningConfig};
//!
//! let grid = GridMap::parse("2,2\ngihb").unwrap();
//! let env = DungeonEnv::new(grid, DungeonConfig::default()).unwrap();
//! let mut learner = QLearner::new(env.codec().num_states(), QLearningConfig::default()).unwrap();
//!
//! let reports = learner.train(&env, 50, 100).unwrap();
//! assert_eq!(reports.len(), 50);
//! ```
//!
//! Swap the policy and the environment stays the same; swap the map and
//! every policy runs unchanged.

pub mod env;
mod error;
pub mod policy;
pub mod qlearning;
pub mod rollout;

pub use env::{DungeonConfig, DungeonEnv, Env, GameState, Status, Transition};
pub use error::GameError;
pub use policy::{GreedyPolicy, Policy, RandomPolicy, SoftmaxPolicy, TabularPolicy};
pub use qlearning::{softmax, EpisodeReport, QLearner, QLearningConfig, QTable};
pub use rollout::{evaluate, rollout, rollout_batch, RolloutStats, Step, Trajectory};

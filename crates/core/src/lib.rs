//! # Dungeon Core - Grid, States and Paths
//!
//! This crate provides the static world model the dungeon MDP is built on:
//!
//! - **Cells**: The closed set of cell kinds and the four move directions
//! - **Grid**: A validated `n × m` layout with clamped movement, neighbour
//!   enumeration, Manhattan distance and the two-line text save format
//! - **Codec**: The bijection between `(sword, treasure stage, position)`
//!   and a dense state id, plus the reserved death id
//! - **A\***: Shortest paths and the start → key → treasure → start
//!   winnability oracle
//! - **Generator**: Random layouts rejected until winnable
//!
//! ## Example
//!
//! ```rust
//! use dungeon_core::{is_winnable, GridMap, StateCodec, TreasureStage, WorldState};
//!
//! // treasure key
//! // sword    start
//! let grid = GridMap::parse("2,2\ngihb").unwrap();
//! assert!(is_winnable(&grid).unwrap());
//!
//! let codec = StateCodec::new(grid.rows(), grid.cols()).unwrap();
//! let start = WorldState::new(false, TreasureStage::Nothing, grid.position(grid.start()));
//! let id = codec.to_id(start).unwrap();
//! assert_eq!(codec.from_id(id).unwrap(), start);
//! ```

pub mod astar;
pub mod cell;
pub mod codec;
pub mod error;
pub mod generator;
pub mod grid;

pub use astar::{is_winnable, shortest_path, winning_route, NodeRecord, PathFinder, WinningRoute};
pub use cell::{CellKind, Direction, EnemyKind};
pub use codec::{StateCodec, StateId, TreasureStage, WorldState};
pub use error::CoreError;
pub use generator::{CellWeights, GeneratorConfig, MapGenerator};
pub use grid::{Coord, GridMap};

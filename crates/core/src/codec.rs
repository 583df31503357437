//! Dense integer encoding of world states.
//!
//! A world state is `(sword, treasure stage, position)`. With `n·m` grid
//! cells, two sword states and three treasure stages there are `6·n·m`
//! live states, numbered
//!
//! ```text
//! id = sword · 3 · (n·m) + stage · (n·m) + position
//! ```
//!
//! plus one terminal death state at `id = max_id = 6·n·m`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

/// Dense state identifier in `0..=max_id`.
pub type StateId = usize;

/// Treasure progress: nothing, key in hand, treasure in hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TreasureStage {
    Nothing = 0,
    HasKey = 1,
    HasTreasure = 2,
}

impl TreasureStage {
    pub const ALL: [TreasureStage; 3] = [
        TreasureStage::Nothing,
        TreasureStage::HasKey,
        TreasureStage::HasTreasure,
    ];

    /// Number of stages.
    pub const COUNT: usize = 3;

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// One live world state. Never cached beyond the current tick; recompute it
/// from the adventurer's inventory and position instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorldState {
    pub sword: bool,
    pub stage: TreasureStage,
    pub position: usize,
}

impl WorldState {
    pub fn new(sword: bool, stage: TreasureStage, position: usize) -> Self {
        Self {
            sword,
            stage,
            position,
        }
    }

    /// Same inventory, different position.
    pub fn at(self, position: usize) -> Self {
        Self { position, ..self }
    }
}

impl fmt::Display for WorldState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<sword: {}, stage: {:?}, pos: {}>",
            self.sword, self.stage, self.position
        )
    }
}

/// Bijection between [`WorldState`] and [`StateId`], bound to one grid size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateCodec {
    rows: usize,
    cols: usize,
}

impl StateCodec {
    /// Number of sword states.
    pub const SWORDS: usize = 2;

    /// Bind the codec to an `rows × cols` grid.
    pub fn new(rows: usize, cols: usize) -> Result<Self, CoreError> {
        if rows == 0 || cols == 0 {
            return Err(CoreError::InvalidDimensions { rows, cols });
        }
        Ok(Self { rows, cols })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Number of grid cells.
    pub fn cells(&self) -> usize {
        self.rows * self.cols
    }

    /// The reserved death id, one past the last live state.
    pub fn max_id(&self) -> StateId {
        self.cells() * Self::SWORDS * TreasureStage::COUNT
    }

    /// The death id (same as [`StateCodec::max_id`]).
    pub fn death_id(&self) -> StateId {
        self.max_id()
    }

    /// Total number of states, death included.
    pub fn num_states(&self) -> usize {
        self.max_id() + 1
    }

    pub fn is_death(&self, id: StateId) -> bool {
        id == self.death_id()
    }

    /// Encode a live state.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::OutOfRange`] if the position lies outside the grid.
    pub fn to_id(&self, state: WorldState) -> Result<StateId, CoreError> {
        if state.position >= self.cells() {
            return Err(CoreError::OutOfRange {
                id: state.position,
                max_id: self.cells() - 1,
            });
        }
        Ok(self.encode(state))
    }

    /// Decode a live state id.
    ///
    /// # Errors
    ///
    /// [`CoreError::TerminalState`] for the death id,
    /// [`CoreError::OutOfRange`] for anything above it.
    pub fn from_id(&self, id: StateId) -> Result<WorldState, CoreError> {
        if id > self.max_id() {
            return Err(CoreError::OutOfRange {
                id,
                max_id: self.max_id(),
            });
        }
        if self.is_death(id) {
            return Err(CoreError::TerminalState { id });
        }
        let cells = self.cells();
        let position = id % cells;
        let stage = (id / cells) % TreasureStage::COUNT;
        let sword = (id / (cells * TreasureStage::COUNT)) % Self::SWORDS;
        Ok(WorldState {
            sword: sword == 1,
            stage: TreasureStage::ALL[stage],
            position,
        })
    }

    /// Encode without the bounds check, for positions already known valid.
    pub(crate) fn encode(&self, state: WorldState) -> StateId {
        let cells = self.cells();
        usize::from(state.sword) * TreasureStage::COUNT * cells + state.stage.index() * cells
            + state.position
    }

    /// First id of the inventory block `(sword, stage)`; the block spans
    /// `cells()` consecutive ids, one per position.
    pub fn block_offset(&self, sword: bool, stage: TreasureStage) -> StateId {
        self.encode(WorldState::new(sword, stage, 0))
    }

    /// Every live state, in id order.
    pub fn live_states(&self) -> impl Iterator<Item = WorldState> + '_ {
        (0..self.max_id()).map(move |id| {
            let cells = self.cells();
            WorldState {
                sword: id / (cells * TreasureStage::COUNT) == 1,
                stage: TreasureStage::ALL[(id / cells) % TreasureStage::COUNT],
                position: id % cells,
            }
        })
    }
}

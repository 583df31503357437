//! One-step outcome of entering an ordinary cell.
//!
//! Row `s` of the chain is the distribution over world states after the
//! adventurer has arrived on the cell encoded in `s` and that cell has
//! acted on them: items picked up, fights won or lost, traps sprung. The
//! rows of portal and moving platform cells are plain self-loops; those
//! cells are flattened by [`crate::RecursiveResolver`] instead.

use dungeon_core::{CellKind, EnemyKind, GridMap, StateCodec, StateId, TreasureStage, WorldState};
use dungeon_prob::{Dist, Kernel};
use tracing::debug;

use crate::config::ChainConfig;
use crate::error::MdpError;

/// The stationary chain over all world states, death included.
#[derive(Debug, Clone)]
pub struct StationaryChain {
    codec: StateCodec,
    config: ChainConfig,
    kernel: Kernel,
}

impl StationaryChain {
    /// Build the chain for `grid`.
    ///
    /// # Errors
    ///
    /// Invalid [`ChainConfig`] values, or a row failing the stochastic check.
    pub fn new(grid: &GridMap, config: ChainConfig) -> Result<Self, MdpError> {
        config.validate()?;
        let codec = StateCodec::new(grid.rows(), grid.cols())?;
        let n = codec.num_states();

        let mut rows = Vec::with_capacity(n);
        for state in codec.live_states() {
            let mut row = vec![0.0; n];
            for (next, p) in outcomes(grid, &codec, &config, state)? {
                row[next] += p;
            }
            rows.push(row);
        }
        rows.push(Dist::point(n, codec.death_id()).p);

        let kernel = Kernel::new(rows)?;
        debug!(states = n, "built stationary chain");
        Ok(Self {
            codec,
            config,
            kernel,
        })
    }

    pub fn codec(&self) -> &StateCodec {
        &self.codec
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    /// Outcome distribution of settling in state `id`.
    pub fn row(&self, id: StateId) -> Result<Dist, MdpError> {
        Ok(self.kernel.apply_to_state(id)?)
    }

    /// Advance a distribution over world states by `steps` steps.
    pub fn iterate(&self, dist: &Dist, steps: usize) -> Result<Dist, MdpError> {
        Ok(self.kernel.iterate(dist, steps)?)
    }
}

/// Successors of a live state with their probabilities. The same id may
/// appear more than once.
pub(crate) fn outcomes(
    grid: &GridMap,
    codec: &StateCodec,
    config: &ChainConfig,
    state: WorldState,
) -> Result<Vec<(StateId, f64)>, MdpError> {
    let here = codec.to_id(state)?;
    let death = codec.death_id();
    let at_start = codec.to_id(state.at(grid.position(grid.start())))?;

    let fight = |dangerous: bool| {
        if dangerous {
            vec![(here, 1.0 - config.p_enemy), (death, config.p_enemy)]
        } else {
            vec![(here, 1.0)]
        }
    };

    let result = match grid.cell(state.position) {
        CellKind::Empty | CellKind::Start | CellKind::Portal | CellKind::MovingPlatform => {
            vec![(here, 1.0)]
        }
        CellKind::Wall => vec![(at_start, 1.0)],
        CellKind::Crack => vec![(death, 1.0)],
        CellKind::Enemy(EnemyKind::Normal) => fight(!state.sword),
        CellKind::Enemy(EnemyKind::Special) => fight(state.sword),
        CellKind::Sword => {
            let armed = WorldState { sword: true, ..state };
            vec![(codec.to_id(armed)?, 1.0)]
        }
        CellKind::Key => {
            let stage = state.stage.max(TreasureStage::HasKey);
            vec![(codec.to_id(WorldState { stage, ..state })?, 1.0)]
        }
        CellKind::Treasure => {
            if state.stage >= TreasureStage::HasKey {
                let looted = WorldState {
                    stage: TreasureStage::HasTreasure,
                    ..state
                };
                vec![(codec.to_id(looted)?, 1.0)]
            } else {
                vec![(here, 1.0)]
            }
        }
        CellKind::Trap => vec![
            (here, config.trap.nothing),
            (at_start, config.trap.teleport),
            (death, config.trap.death),
        ],
    };
    Ok(result)
}

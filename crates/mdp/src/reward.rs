//! The state-action reward tensor.
//!
//! Only certain transitions carry reward. A move whose outcome is a gamble
//! (a fight, a trap, a portal) earns nothing even when it may pay off.

use dungeon_core::{Direction, GridMap, StateCodec, StateId, TreasureStage};
use tracing::debug;

use crate::error::MdpError;
use crate::transition::TransitionTensor;

/// A transition is certain when its most likely successor is at least this
/// close to probability 1.
pub const CERTAINTY_TOLERANCE: f64 = 1e-9;

/// Reward for acquiring the key.
pub const KEY_REWARD: f64 = 0.5;
/// Reward for acquiring the treasure.
pub const TREASURE_REWARD: f64 = 0.5;
/// Reward for standing on the start cell with the treasure.
pub const WIN_REWARD: f64 = 1.0;
/// Reward of the death self-loop.
pub const DEATH_REWARD: f64 = -1.0;

/// `R[s][a]`, stored flat.
#[derive(Debug, Clone, PartialEq)]
pub struct RewardTensor {
    num_states: usize,
    data: Vec<f64>,
}

impl RewardTensor {
    pub fn num_states(&self) -> usize {
        self.num_states
    }

    /// # Panics
    ///
    /// Panics if `state >= num_states()` or `action >= 4`.
    pub fn get(&self, state: StateId, action: usize) -> f64 {
        self.data[state * Direction::COUNT + action]
    }

    /// The four action rewards of `state`.
    pub fn row(&self, state: StateId) -> &[f64] {
        let start = state * Direction::COUNT;
        &self.data[start..start + Direction::COUNT]
    }
}

/// Derive rewards from the certain transitions of `transitions`.
pub fn build_rewards(
    grid: &GridMap,
    codec: &StateCodec,
    transitions: &TransitionTensor,
) -> Result<RewardTensor, MdpError> {
    let n = codec.num_states();
    if transitions.num_states() != n {
        return Err(MdpError::ShapeMismatch {
            expected: n,
            got: transitions.num_states(),
        });
    }

    let start = grid.position(grid.start());
    let death = codec.death_id();
    let mut data = vec![0.0; n * Direction::COUNT];
    let mut certain = 0;

    for state in 0..n {
        for action in 0..Direction::COUNT {
            let (next, p) = transitions.most_likely(state, action);
            if p < 1.0 - CERTAINTY_TOLERANCE {
                continue;
            }
            certain += 1;
            data[state * Direction::COUNT + action] = if state == death {
                DEATH_REWARD
            } else if next == death {
                0.0
            } else {
                let from = codec.from_id(state)?;
                let to = codec.from_id(next)?;
                match (from.stage, to.stage) {
                    (TreasureStage::Nothing, TreasureStage::HasKey) => KEY_REWARD,
                    (TreasureStage::HasKey, TreasureStage::HasTreasure) => TREASURE_REWARD,
                    (TreasureStage::HasTreasure, TreasureStage::HasTreasure)
                        if state == next && from.position == start =>
                    {
                        WIN_REWARD
                    }
                    _ => 0.0,
                }
            };
        }
    }

    debug!(certain, total = n * Direction::COUNT, "built reward tensor");
    Ok(RewardTensor {
        num_states: n,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChainConfig, ResolverConfig};
    use crate::transition::TransitionBuilder;
    use dungeon_core::WorldState;

    fn build(text: &str) -> (GridMap, StateCodec, RewardTensor) {
        let grid = GridMap::parse(text).unwrap();
        let mut builder =
            TransitionBuilder::new(&grid, ChainConfig::default(), ResolverConfig::default())
                .unwrap();
        let codec = *builder.codec();
        let t = builder.build().unwrap();
        let r = build_rewards(&grid, &codec, &t).unwrap();
        (grid, codec, r)
    }

    fn id(codec: &StateCodec, sword: bool, stage: TreasureStage, pos: usize) -> StateId {
        codec.to_id(WorldState::new(sword, stage, pos)).unwrap()
    }

    #[test]
    fn test_two_by_two_rewards() {
        // treasure key
        // sword    start
        let (_, codec, r) = build("2,2\ngihb");
        use TreasureStage::*;
        let north = Direction::North.index();
        let west = Direction::West.index();
        let east = Direction::East.index();

        assert_eq!(r.get(id(&codec, false, Nothing, 3), north), KEY_REWARD);
        assert_eq!(r.get(id(&codec, true, HasKey, 1), west), TREASURE_REWARD);
        // already holding the key: nothing new
        assert_eq!(r.get(id(&codec, false, HasKey, 3), north), 0.0);
        // staying on the start with the treasure
        assert_eq!(r.get(id(&codec, true, HasTreasure, 3), east), WIN_REWARD);
        // arriving on the start is not itself rewarded
        assert_eq!(r.get(id(&codec, true, HasTreasure, 1), Direction::South.index()), 0.0);
        assert_eq!(r.row(codec.death_id()), &[DEATH_REWARD; 4]);
    }

    #[test]
    fn test_gambles_are_not_rewarded() {
        // g e
        // i b
        // h a
        // the trap sits between the start and the treasure; stepping onto
        // the key is certain, stepping onto the trap is not
        let (_, codec, r) = build("3,2\ngeibha");
        use TreasureStage::*;
        let start = 3;
        assert_eq!(r.get(id(&codec, false, Nothing, start), Direction::West.index()), KEY_REWARD);
        assert_eq!(r.get(id(&codec, false, HasKey, start), Direction::North.index()), 0.0);
    }

    #[test]
    fn test_shape_mismatch() {
        let grid = GridMap::parse("2,2\ngihb").unwrap();
        let other = GridMap::parse("3,2\ngiahab").unwrap();
        let mut builder =
            TransitionBuilder::new(&other, ChainConfig::default(), ResolverConfig::default())
                .unwrap();
        let t = builder.build().unwrap();
        let codec = StateCodec::new(2, 2).unwrap();
        assert!(matches!(
            build_rewards(&grid, &codec, &t),
            Err(MdpError::ShapeMismatch { .. })
        ));
    }
}

//! The state-action transition tensor.

use dungeon_core::{Direction, GridMap, StateCodec, StateId, TreasureStage, WorldState};
use dungeon_prob::Dist;
use tracing::{debug, info};

use crate::config::{ChainConfig, ResolverConfig};
use crate::error::MdpError;
use crate::resolver::RecursiveResolver;
use crate::stationary::StationaryChain;

/// Rows closer to 1 than this count as normalized.
pub const ROW_TOLERANCE: f64 = 1e-6;

/// `T[s][a][s']`, stored flat. Every row `T[s][a]` is a distribution.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionTensor {
    num_states: usize,
    data: Vec<f64>,
}

impl TransitionTensor {
    /// A tensor of zeros; rows must be filled before use.
    fn zeros(num_states: usize) -> Self {
        Self {
            num_states,
            data: vec![0.0; num_states * Direction::COUNT * num_states],
        }
    }

    pub fn num_states(&self) -> usize {
        self.num_states
    }

    fn offset(&self, state: StateId, action: usize) -> usize {
        (state * Direction::COUNT + action) * self.num_states
    }

    /// Row `T[state][action]`.
    ///
    /// # Panics
    ///
    /// Panics if `state >= num_states()` or `action >= 4`.
    pub fn row(&self, state: StateId, action: usize) -> &[f64] {
        let start = self.offset(state, action);
        &self.data[start..start + self.num_states]
    }

    fn set_row(&mut self, state: StateId, action: usize, row: &[f64]) {
        let start = self.offset(state, action);
        self.data[start..start + self.num_states].copy_from_slice(row);
    }

    /// `P(next | state, action)`.
    pub fn get(&self, state: StateId, action: usize, next: StateId) -> f64 {
        self.row(state, action)[next]
    }

    /// Most likely successor of `(state, action)` and its probability.
    /// Ties go to the lowest id.
    pub fn most_likely(&self, state: StateId, action: usize) -> (StateId, f64) {
        let row = self.row(state, action);
        let mut best = 0;
        for (next, &p) in row.iter().enumerate() {
            if p > row[best] {
                best = next;
            }
        }
        (best, row[best])
    }

    /// `Σ_s' T[state][action][s'] · values[s']`.
    pub fn expectation(&self, state: StateId, action: usize, values: &[f64]) -> f64 {
        self.row(state, action)
            .iter()
            .zip(values)
            .map(|(p, v)| p * v)
            .sum()
    }

    /// Check that every row sums to 1.
    ///
    /// # Errors
    ///
    /// [`MdpError::RowNotNormalized`] for the first offending row.
    pub fn validate(&self) -> Result<(), MdpError> {
        for state in 0..self.num_states {
            for action in 0..Direction::COUNT {
                let sum: f64 = self.row(state, action).iter().sum();
                if (sum - 1.0).abs() > ROW_TOLERANCE {
                    return Err(MdpError::RowNotNormalized { state, action, sum });
                }
            }
        }
        Ok(())
    }
}

/// Builds [`TransitionTensor`]s for one grid.
///
/// Outcomes are computed once per destination cell and scattered back to
/// every `(state, action)` whose move lands there: if `q` is the neighbour
/// of `p` in direction `d`, then moving `d.reverse()` from `q` reaches `p`.
/// Moves that go nowhere (pushing against the border) settle in place
/// through the stationary chain.
#[derive(Debug)]
pub struct TransitionBuilder<'a> {
    grid: &'a GridMap,
    codec: StateCodec,
    stationary: StationaryChain,
    resolver: RecursiveResolver,
}

impl<'a> TransitionBuilder<'a> {
    pub fn new(
        grid: &'a GridMap,
        chain: ChainConfig,
        resolver: ResolverConfig,
    ) -> Result<Self, MdpError> {
        Ok(Self {
            grid,
            codec: StateCodec::new(grid.rows(), grid.cols())?,
            stationary: StationaryChain::new(grid, chain)?,
            resolver: RecursiveResolver::new(grid, resolver)?,
        })
    }

    pub fn codec(&self) -> &StateCodec {
        &self.codec
    }

    pub fn stationary(&self) -> &StationaryChain {
        &self.stationary
    }

    pub fn resolver(&self) -> &RecursiveResolver {
        &self.resolver
    }

    /// Outcome of entering `position` while holding `(sword, stage)`.
    pub fn entering(
        &mut self,
        position: usize,
        sword: bool,
        stage: TreasureStage,
    ) -> Result<Dist, MdpError> {
        if self.grid.cell(position).is_recursive() {
            self.resolver
                .resolve(position, sword, stage, &self.stationary)
        } else {
            let id = self.codec.to_id(WorldState::new(sword, stage, position))?;
            self.stationary.row(id)
        }
    }

    /// Assemble and validate the full tensor.
    pub fn build(&mut self) -> Result<TransitionTensor, MdpError> {
        let n = self.codec.num_states();
        let mut tensor = TransitionTensor::zeros(n);
        let mut touched = vec![false; n * Direction::COUNT];

        for destination in 0..self.grid.len() {
            let coord = self.grid.coord(destination);
            let neighbors = self.grid.neighbors(coord);
            for sword in [false, true] {
                for stage in TreasureStage::ALL {
                    let outcome = self.entering(destination, sword, stage)?;
                    for &(origin, direction) in &neighbors {
                        let action = direction.reverse().index();
                        let source = self.codec.to_id(WorldState::new(
                            sword,
                            stage,
                            self.grid.position(origin),
                        ))?;
                        tensor.set_row(source, action, &outcome.p);
                        touched[source * Direction::COUNT + action] = true;
                    }
                }
            }
        }

        let mut stayed = 0;
        for state in 0..n {
            for action in 0..Direction::COUNT {
                if !touched[state * Direction::COUNT + action] {
                    let settle = self.stationary.row(state)?;
                    tensor.set_row(state, action, &settle.p);
                    stayed += 1;
                }
            }
        }
        debug!(
            stayed,
            resolved = self.resolver.cached(),
            "filled unreachable moves from the stationary chain"
        );

        tensor.validate()?;
        info!(states = n, "built transition tensor");
        Ok(tensor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dungeon_core::Coord;

    fn id(codec: &StateCodec, sword: bool, stage: TreasureStage, pos: usize) -> StateId {
        codec.to_id(WorldState::new(sword, stage, pos)).unwrap()
    }

    #[test]
    fn test_two_by_two_moves() {
        // treasure key
        // sword    start
        let grid = GridMap::parse("2,2\ngihb").unwrap();
        let mut builder =
            TransitionBuilder::new(&grid, ChainConfig::default(), ResolverConfig::default())
                .unwrap();
        let codec = *builder.codec();
        let t = builder.build().unwrap();
        use TreasureStage::*;

        let start = id(&codec, false, Nothing, 3);
        let north = Direction::North.index();
        let (next, p) = t.most_likely(start, north);
        assert_eq!(next, id(&codec, false, HasKey, 1));
        assert_eq!(p, 1.0);

        // pushing against the border from the start stays put
        let (next, p) = t.most_likely(start, Direction::East.index());
        assert_eq!((next, p), (start, 1.0));

        // sword at (1, 0)
        let (next, _) = t.most_likely(start, Direction::West.index());
        assert_eq!(next, id(&codec, true, Nothing, 2));

        // treasure needs the key
        let key = id(&codec, false, HasKey, 1);
        let (next, _) = t.most_likely(key, Direction::West.index());
        assert_eq!(next, id(&codec, false, HasTreasure, 0));
        let bare = id(&codec, false, Nothing, 1);
        let (next, _) = t.most_likely(bare, Direction::West.index());
        assert_eq!(next, id(&codec, false, Nothing, 0));
    }

    #[test]
    fn test_death_is_absorbing() {
        let grid = GridMap::parse("2,2\ngihb").unwrap();
        let mut builder =
            TransitionBuilder::new(&grid, ChainConfig::default(), ResolverConfig::default())
                .unwrap();
        let death = builder.codec().death_id();
        let t = builder.build().unwrap();
        for action in 0..Direction::COUNT {
            assert_eq!(t.get(death, action, death), 1.0);
        }
    }

    #[test]
    fn test_wall_sends_back_to_start() {
        // g i
        // c a
        // h b
        let grid = GridMap::parse("3,2\ngicahb").unwrap();
        let mut builder =
            TransitionBuilder::new(&grid, ChainConfig::default(), ResolverConfig::default())
                .unwrap();
        let codec = *builder.codec();
        let t = builder.build().unwrap();

        let sword = grid.position(Coord::new(2, 0));
        let from = id(&codec, true, TreasureStage::HasKey, sword);
        let start = grid.position(grid.start());
        assert_eq!(
            t.most_likely(from, Direction::North.index()),
            (id(&codec, true, TreasureStage::HasKey, start), 1.0)
        );
    }

    #[test]
    fn test_portal_row_spreads() {
        // g j
        // i a
        // h b
        let grid = GridMap::parse("3,2\ngjiahb").unwrap();
        let mut builder =
            TransitionBuilder::new(&grid, ChainConfig::default(), ResolverConfig::default())
                .unwrap();
        let codec = *builder.codec();
        let t = builder.build().unwrap();

        let below = id(&codec, false, TreasureStage::Nothing, 3);
        let (_, p) = t.most_likely(below, Direction::North.index());
        assert!(p < 1.0);
        let row = t.row(below, Direction::North.index());
        // landing on the key cell picks the key up
        let on_key = id(&codec, false, TreasureStage::HasKey, 2);
        assert!((row[on_key] - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_validate_rejects_bad_row() {
        let mut t = TransitionTensor::zeros(2);
        t.set_row(0, 0, &[1.0, 0.0]);
        assert!(matches!(
            t.validate(),
            Err(MdpError::RowNotNormalized { state: 0, action: 1, .. })
        ));
    }
}

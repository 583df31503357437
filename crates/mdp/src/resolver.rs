//! Flattening portal and moving platform chains.
//!
//! A portal drops the adventurer on any non-wall cell of the map, a moving
//! platform on any non-wall cell next to it. The landing cell may itself
//! be a portal or a platform, so the effective landing spot is the fixed
//! point of a Markov chain over grid positions in which every ordinary
//! cell is absorbing.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use dungeon_core::{CellKind, CoreError, GridMap, TreasureStage};
use dungeon_prob::{Dist, FixedPoint, Kernel};
use tracing::{debug, warn};

use crate::config::ResolverConfig;
use crate::error::MdpError;
use crate::stationary::StationaryChain;

/// Position-only chain for recursive cells, plus a per-position cache of
/// resolved landing distributions.
#[derive(Debug, Clone)]
pub struct RecursiveResolver {
    config: ResolverConfig,
    chain: Kernel,
    cache: HashMap<usize, FixedPoint>,
}

impl RecursiveResolver {
    pub fn new(grid: &GridMap, config: ResolverConfig) -> Result<Self, MdpError> {
        let n = grid.len();
        let mut rows = Vec::with_capacity(n);
        for pos in 0..n {
            rows.push(redirect(grid, pos)?);
        }
        Ok(Self {
            config,
            chain: Kernel::from_rows(rows)?,
            cache: HashMap::new(),
        })
    }

    /// The reduced chain over positions.
    pub fn chain(&self) -> &Kernel {
        &self.chain
    }

    /// Number of positions resolved so far.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Where the adventurer ends up, as a distribution over positions,
    /// after stepping on `position`.
    ///
    /// Iterates `μ ← μM` from a point mass until nothing moves. Hitting the
    /// iteration cap is not an error: the last iterate is returned with
    /// `converged == false`.
    pub fn landing(&mut self, position: usize) -> Result<&FixedPoint, MdpError> {
        let n = self.chain.n_inputs;
        if position >= n {
            return Err(CoreError::OutOfRange {
                id: position,
                max_id: n - 1,
            }
            .into());
        }

        let fixed = match self.cache.entry(position) {
            Entry::Occupied(hit) => hit.into_mut(),
            Entry::Vacant(slot) => {
                let fixed = self.chain.converge(
                    &Dist::point(n, position),
                    self.config.max_iterations,
                    self.config.tolerance,
                )?;
                if fixed.converged {
                    debug!(position, iterations = fixed.iterations, "resolved landing");
                } else {
                    warn!(
                        position,
                        iterations = fixed.iterations,
                        "landing did not converge, using last iterate"
                    );
                }
                slot.insert(fixed)
            }
        };
        Ok(fixed)
    }

    /// Full world-state outcome of stepping on `position` while holding
    /// `(sword, stage)`.
    ///
    /// The landing distribution is placed in that inventory block, since
    /// teleports never touch the inventory, then pushed one step through
    /// the stationary chain so the landing cell acts on the adventurer.
    pub fn resolve(
        &mut self,
        position: usize,
        sword: bool,
        stage: TreasureStage,
        stationary: &StationaryChain,
    ) -> Result<Dist, MdpError> {
        let codec = *stationary.codec();
        let offset = codec.block_offset(sword, stage);
        let landing = self.landing(position)?;
        let placed = landing.dist.embed(codec.num_states(), offset)?;
        stationary.iterate(&placed, 1)
    }
}

/// Row of the reduced chain for one position.
fn redirect(grid: &GridMap, pos: usize) -> Result<Dist, MdpError> {
    let n = grid.len();
    let radius = match grid.cell(pos) {
        CellKind::Portal => -1,
        CellKind::MovingPlatform => 1,
        _ => return Ok(Dist::point(n, pos)),
    };

    match grid.cells_within(grid.coord(pos), radius) {
        Ok(candidates) => {
            let support: Vec<usize> = candidates.iter().map(|&c| grid.position(c)).collect();
            Ok(Dist::uniform_over(n, &support)?)
        }
        // Boxed in by walls: the platform goes nowhere.
        Err(CoreError::NoCandidateCell { .. }) => Ok(Dist::point(n, pos)),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChainConfig;
    use dungeon_core::{Coord, StateCodec, WorldState};

    #[test]
    fn test_absorbing_grid_resolves_in_one_iteration() {
        let grid = GridMap::parse("2,2\ngihb").unwrap();
        let stationary = StationaryChain::new(&grid, ChainConfig::default()).unwrap();
        let mut resolver = RecursiveResolver::new(&grid, ResolverConfig::default()).unwrap();

        for pos in 0..grid.len() {
            let fixed = resolver.landing(pos).unwrap();
            assert!(fixed.converged);
            assert_eq!(fixed.iterations, 1);
            assert_eq!(fixed.dist, Dist::point(4, pos));
        }

        // stepping on the key while empty-handed: point mass at "has key"
        let codec = StateCodec::new(2, 2).unwrap();
        let out = resolver
            .resolve(1, false, TreasureStage::Nothing, &stationary)
            .unwrap();
        let expected = codec
            .to_id(WorldState::new(false, TreasureStage::HasKey, 1))
            .unwrap();
        assert_eq!(out.p[expected], 1.0);
    }

    #[test]
    fn test_portal_spreads_over_non_wall_cells() {
        // g j
        // c i
        // h b
        let grid = GridMap::parse("3,2\ngjcihb").unwrap();
        let mut resolver = RecursiveResolver::new(&grid, ResolverConfig::default()).unwrap();
        let fixed = resolver.landing(1).unwrap().clone();
        assert!(fixed.converged);
        // the portal may land on itself; that mass is redistributed again
        for pos in [0, 3, 4, 5] {
            assert!((fixed.dist.p[pos] - 0.25).abs() < 1e-9);
        }
        assert!(fixed.dist.p[1] < 1e-9);
        assert_eq!(fixed.dist.p[2], 0.0);
    }

    #[test]
    fn test_platform_chain() {
        // g k k
        // i h b
        let grid = GridMap::parse("2,3\ngkkihb").unwrap();
        let mut resolver = RecursiveResolver::new(&grid, ResolverConfig::default()).unwrap();
        let fixed = resolver.landing(2).unwrap();
        assert!(fixed.converged);
        assert!((fixed.dist.p.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(fixed.dist.p[1] < 1e-9 && fixed.dist.p[2] < 1e-9);
        assert!(fixed.dist.p[5] > fixed.dist.p[0]);
    }

    #[test]
    fn test_landing_is_cached() {
        let grid = GridMap::parse("2,3\ngkkihb").unwrap();
        let mut resolver = RecursiveResolver::new(&grid, ResolverConfig::default()).unwrap();
        resolver.landing(1).unwrap();
        resolver.landing(1).unwrap();
        resolver.landing(4).unwrap();
        assert_eq!(resolver.cached(), 2);
    }

    #[test]
    fn test_cycle_reports_cap() {
        // two platforms walled in with each other
        // k k c g
        // c c c i
        // h a a b
        let grid = GridMap::parse("3,4\nkkcgcccihaab").unwrap();
        let config = ResolverConfig::default().with_max_iterations(50);
        let mut resolver = RecursiveResolver::new(&grid, config).unwrap();
        let fixed = resolver.landing(0).unwrap();
        assert!(!fixed.converged);
        assert_eq!(fixed.iterations, 50);
        assert!((fixed.dist.p.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert_eq!(grid.get(Coord::new(0, 1)), Some(CellKind::MovingPlatform));
    }

    #[test]
    fn test_walled_in_platform_stays_put() {
        // k c g
        // c i h
        // a a b
        let grid = GridMap::parse("3,3\nkcgcihaab").unwrap();
        let mut resolver = RecursiveResolver::new(&grid, ResolverConfig::default()).unwrap();
        let fixed = resolver.landing(0).unwrap();
        assert!(fixed.converged);
        assert_eq!(fixed.dist, Dist::point(9, 0));
    }

    #[test]
    fn test_landing_out_of_range() {
        let grid = GridMap::parse("2,2\ngihb").unwrap();
        let mut resolver = RecursiveResolver::new(&grid, ResolverConfig::default()).unwrap();
        assert!(matches!(
            resolver.landing(4),
            Err(MdpError::Core(CoreError::OutOfRange { id: 4, max_id: 3 }))
        ));
    }
}

//! A planning agent: owns one map's tensors and its solved policy.

use dungeon_core::{Direction, GridMap, StateCodec, StateId, WorldState};
use tracing::info;

use crate::config::PlannerConfig;
use crate::error::MdpError;
use crate::reward::{build_rewards, RewardTensor};
use crate::solver::{MdpSolver, Method, Solution};
use crate::transition::{TransitionBuilder, TransitionTensor};

/// Model-based agent for one dungeon.
///
/// Construction builds `T` and `R`; [`Planner::solve`] computes a policy.
/// Until then the planner is not [`ready`](Planner::ready) and refuses to
/// answer policy queries.
///
/// # Example
///
/// ```rust
/// use dungeon_core::{GridMap, TreasureStage, WorldState};
/// use dungeon_mdp::{Method, Planner, PlannerConfig};
///
/// let grid = GridMap::parse("2,2\ngihb").unwrap();
/// let mut planner = Planner::new(grid, PlannerConfig::default()).unwrap();
/// assert!(!planner.ready());
///
/// planner.solve(Method::ValueIteration).unwrap();
/// let here = WorldState::new(false, TreasureStage::Nothing, 3);
/// let action = planner.policy(here).unwrap();
/// println!("from the start, go {}", action);
/// ```
#[derive(Debug, Clone)]
pub struct Planner {
    grid: GridMap,
    codec: StateCodec,
    config: PlannerConfig,
    solver: MdpSolver,
    transitions: TransitionTensor,
    rewards: RewardTensor,
    solution: Option<Solution>,
}

impl Planner {
    pub fn new(grid: GridMap, config: PlannerConfig) -> Result<Self, MdpError> {
        let solver = MdpSolver::new(config.solver)?;
        let (codec, transitions, rewards) = build_tensors(&grid, &config)?;
        Ok(Self {
            grid,
            codec,
            config,
            solver,
            transitions,
            rewards,
            solution: None,
        })
    }

    /// Swap in a new map, rebuilding the tensors and dropping the old policy.
    pub fn reset(&mut self, grid: GridMap) -> Result<(), MdpError> {
        let (codec, transitions, rewards) = build_tensors(&grid, &self.config)?;
        self.grid = grid;
        self.codec = codec;
        self.transitions = transitions;
        self.rewards = rewards;
        self.solution = None;
        Ok(())
    }

    pub fn solve(&mut self, method: Method) -> Result<&Solution, MdpError> {
        let solution = self
            .solver
            .solve(method, &self.transitions, &self.rewards)?;
        Ok(&*self.solution.insert(solution))
    }

    /// A policy has been computed for the current map.
    pub fn ready(&self) -> bool {
        self.solution.is_some()
    }

    pub fn grid(&self) -> &GridMap {
        &self.grid
    }

    pub fn codec(&self) -> &StateCodec {
        &self.codec
    }

    pub fn transition_tensor(&self) -> &TransitionTensor {
        &self.transitions
    }

    pub fn reward_tensor(&self) -> &RewardTensor {
        &self.rewards
    }

    pub fn solution(&self) -> Option<&Solution> {
        self.solution.as_ref()
    }

    /// Action to take in a live state.
    ///
    /// # Errors
    ///
    /// [`MdpError::NotReady`] before [`Planner::solve`], or a codec error
    /// for a state that does not fit the map.
    pub fn policy(&self, state: WorldState) -> Result<Direction, MdpError> {
        let id = self.codec.to_id(state)?;
        self.policy_by_id(id)
    }

    pub fn policy_by_id(&self, id: StateId) -> Result<Direction, MdpError> {
        let solution = self.solution.as_ref().ok_or(MdpError::NotReady)?;
        self.check_id(id)?;
        Ok(solution.policy[id])
    }

    /// Estimated discounted return of a state.
    pub fn value(&self, id: StateId) -> Result<f64, MdpError> {
        let solution = self.solution.as_ref().ok_or(MdpError::NotReady)?;
        self.check_id(id)?;
        Ok(solution.values[id])
    }

    fn check_id(&self, id: StateId) -> Result<(), MdpError> {
        if id > self.codec.max_id() {
            return Err(dungeon_core::CoreError::OutOfRange {
                id,
                max_id: self.codec.max_id(),
            }
            .into());
        }
        Ok(())
    }
}

fn build_tensors(
    grid: &GridMap,
    config: &PlannerConfig,
) -> Result<(StateCodec, TransitionTensor, RewardTensor), MdpError> {
    let mut builder = TransitionBuilder::new(grid, config.chain, config.resolver)?;
    let codec = *builder.codec();
    let transitions = builder.build()?;
    let rewards = build_rewards(grid, &codec, &transitions)?;
    info!(
        rows = grid.rows(),
        cols = grid.cols(),
        states = codec.num_states(),
        "planner tensors ready"
    );
    Ok((codec, transitions, rewards))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dungeon_core::{CoreError, TreasureStage};

    #[test]
    fn test_not_ready_before_solve() {
        let grid = GridMap::parse("2,2\ngihb").unwrap();
        let planner = Planner::new(grid, PlannerConfig::default()).unwrap();
        assert!(!planner.ready());
        let here = WorldState::new(false, TreasureStage::Nothing, 3);
        assert!(matches!(planner.policy(here), Err(MdpError::NotReady)));
        assert!(matches!(planner.value(0), Err(MdpError::NotReady)));
    }

    #[test]
    fn test_solve_then_query() {
        let grid = GridMap::parse("2,2\ngihb").unwrap();
        let mut planner = Planner::new(grid, PlannerConfig::default()).unwrap();
        planner.solve(Method::PolicyIteration).unwrap();
        assert!(planner.ready());
        let death = planner.codec().death_id();
        assert!(planner.policy_by_id(death).is_ok());
        assert!(matches!(
            planner.policy_by_id(death + 1),
            Err(MdpError::Core(CoreError::OutOfRange { .. }))
        ));
    }

    #[test]
    fn test_reset_drops_solution() {
        let grid = GridMap::parse("2,2\ngihb").unwrap();
        let mut planner = Planner::new(grid, PlannerConfig::default()).unwrap();
        planner.solve(Method::ValueIteration).unwrap();

        let bigger = GridMap::parse("3,2\ngiahab").unwrap();
        planner.reset(bigger).unwrap();
        assert!(!planner.ready());
        assert_eq!(planner.codec().max_id(), 36);
        assert_eq!(planner.transition_tensor().num_states(), 37);
    }
}

//! Environments: world dynamics and state transitions.
//!
//! An environment defines how the world evolves in response to actions.
//! Policies and environments only meet through the [`Env`] trait, so the
//! same rollout code drives a planner, a learner or a random walker.
//!
//! ```text
//!        ┌──────────┐
//!  Act ─▶│   Env    │─▶ (State', Obs, Reward)
//!        │          │
//! State ─▶│          │
//!        └──────────┘
//! ```

use std::cell::RefCell;
use std::fmt;

use dungeon_core::{
    CellKind, Coord, CoreError, Direction, EnemyKind, GridMap, StateCodec, StateId, TreasureStage,
    WorldState,
};
use dungeon_mdp::{ChainConfig, DEATH_REWARD, KEY_REWARD, TREASURE_REWARD, WIN_REWARD};
use dungeon_prob::Dist;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::GameError;

/// Environment transition result.
#[derive(Debug, Clone)]
pub struct Transition<State, Obs> {
    /// New state after action
    pub next_state: State,
    /// Observation from the new state
    pub observation: Obs,
    /// Reward received
    pub reward: f64,
    /// Whether the episode has ended
    pub done: bool,
}

/// An environment defines world dynamics.
pub trait Env {
    /// State type
    type State: Clone;
    /// Observation type (what the agent sees)
    type Obs;
    /// Action type
    type Act;

    /// Get the initial state.
    fn initial_state(&self) -> Self::State;

    /// Get observation from a state.
    fn observe(&self, state: &Self::State) -> Self::Obs;

    /// Take a step: (state, action) → (next_state, obs, reward, done)
    fn step(
        &self,
        state: &Self::State,
        action: &Self::Act,
    ) -> Result<Transition<Self::State, Self::Obs>, GameError>;

    /// Check if state is terminal.
    fn is_terminal(&self, state: &Self::State) -> bool;

    /// Terminal and successful.
    fn is_win(&self, _state: &Self::State) -> bool {
        false
    }

    /// Get available actions in a state (optional).
    fn available_actions(&self, _state: &Self::State) -> Option<Vec<Self::Act>> {
        None
    }

    /// Reset to initial state and return observation.
    fn reset(&self) -> (Self::State, Self::Obs) {
        let state = self.initial_state();
        let obs = self.observe(&state);
        (state, obs)
    }
}

// ============================================================================
// Dungeon
// ============================================================================

/// Where an episode stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Playing,
    /// Back on the start cell with the treasure.
    Won,
    Dead,
}

/// Live state of one adventurer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GameState {
    pub sword: bool,
    pub stage: TreasureStage,
    pub position: usize,
    pub status: Status,
}

impl GameState {
    /// The MDP view of this state, recomputed on every call.
    pub fn world_state(&self) -> WorldState {
        WorldState::new(self.sword, self.stage, self.position)
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{:?}]", self.world_state(), self.status)
    }
}

/// Settings of the live dungeon.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DungeonConfig {
    /// Enemy and trap odds, shared with the MDP model.
    pub chain: ChainConfig,
    /// Portal/platform hops followed in one move before giving up and
    /// leaving the adventurer where the last hop put them.
    pub max_hops: usize,
    pub seed: u64,
}

impl Default for DungeonConfig {
    fn default() -> Self {
        Self {
            chain: ChainConfig::default(),
            max_hops: 100,
            seed: 0,
        }
    }
}

impl DungeonConfig {
    pub fn with_chain(mut self, chain: ChainConfig) -> Self {
        self.chain = chain;
        self
    }

    pub fn with_max_hops(mut self, max_hops: usize) -> Self {
        self.max_hops = max_hops;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// The dungeon as a sampled simulator.
///
/// Dynamics match the MDP model: clamp the move to the grid, follow
/// portal and platform hops, then let the cell act. Observations are the
/// dense state ids of [`StateCodec`], death mapping to the death id.
#[derive(Debug)]
pub struct DungeonEnv {
    grid: GridMap,
    codec: StateCodec,
    config: DungeonConfig,
    /// Trap outcomes in order: nothing, back to start, death.
    trap: Dist,
    rng: RefCell<StdRng>,
}

impl DungeonEnv {
    pub fn new(grid: GridMap, config: DungeonConfig) -> Result<Self, GameError> {
        config.chain.validate()?;
        let codec = StateCodec::new(grid.rows(), grid.cols())?;
        let odds = config.chain.trap;
        let trap = Dist::new(vec![odds.nothing, odds.teleport, odds.death])?;
        Ok(Self {
            grid,
            codec,
            config,
            trap,
            rng: RefCell::new(StdRng::seed_from_u64(config.seed)),
        })
    }

    pub fn grid(&self) -> &GridMap {
        &self.grid
    }

    pub fn codec(&self) -> &StateCodec {
        &self.codec
    }

    pub fn config(&self) -> &DungeonConfig {
        &self.config
    }

    /// Dense id of a state.
    pub fn state_id(&self, state: &GameState) -> Result<StateId, GameError> {
        match state.status {
            Status::Dead => Ok(self.codec.death_id()),
            _ => Ok(self.codec.to_id(state.world_state())?),
        }
    }

    fn start(&self) -> usize {
        self.grid.position(self.grid.start())
    }

    /// Follow portals and platforms from `position` until an ordinary cell.
    fn land(&self, position: usize, rng: &mut StdRng) -> Result<usize, GameError> {
        let mut position = position;
        for hop in 0..self.config.max_hops {
            let radius = match self.grid.cell(position) {
                CellKind::Portal => -1,
                CellKind::MovingPlatform => 1,
                _ => return Ok(position),
            };
            let here = self.grid.coord(position);
            let next = match self.grid.random_cell_within(here, radius, rng) {
                Ok(coord) => coord,
                Err(CoreError::NoCandidateCell { .. }) => return Ok(position),
                Err(e) => return Err(e.into()),
            };
            trace!(hop, from = %here, to = %next, "teleported");
            position = self.grid.position(next);
        }
        Ok(position)
    }

    /// Apply the effect of the ordinary cell under the adventurer.
    fn settle(&self, state: &mut GameState, rng: &mut StdRng) {
        let chain = &self.config.chain;
        match self.grid.cell(state.position) {
            CellKind::Empty | CellKind::Start | CellKind::Portal | CellKind::MovingPlatform => {}
            CellKind::Wall => state.position = self.start(),
            CellKind::Crack => state.status = Status::Dead,
            CellKind::Enemy(kind) => {
                let dangerous = match kind {
                    EnemyKind::Normal => !state.sword,
                    EnemyKind::Special => state.sword,
                };
                if dangerous && rng.gen_bool(chain.p_enemy) {
                    state.status = Status::Dead;
                }
            }
            CellKind::Sword => state.sword = true,
            CellKind::Key => state.stage = state.stage.max(TreasureStage::HasKey),
            CellKind::Treasure => {
                if state.stage >= TreasureStage::HasKey {
                    state.stage = TreasureStage::HasTreasure;
                }
            }
            CellKind::Trap => match self.trap.sample(rng.gen()) {
                0 => {}
                1 => state.position = self.start(),
                _ => state.status = Status::Dead,
            },
        }
    }
}

impl Env for DungeonEnv {
    type State = GameState;
    type Obs = StateId;
    type Act = Direction;

    fn initial_state(&self) -> GameState {
        GameState {
            sword: false,
            stage: TreasureStage::Nothing,
            position: self.start(),
            status: Status::Playing,
        }
    }

    fn observe(&self, state: &GameState) -> StateId {
        match state.status {
            Status::Dead => self.codec.death_id(),
            _ => self.codec.to_id(state.world_state()).unwrap_or(self.codec.death_id()),
        }
    }

    fn step(
        &self,
        state: &GameState,
        action: &Direction,
    ) -> Result<Transition<GameState, StateId>, GameError> {
        if self.is_terminal(state) {
            return Err(GameError::TerminalState);
        }
        if state.position >= self.grid.len() {
            return Err(CoreError::PositionOutOfBounds {
                row: state.position / self.grid.cols(),
                col: state.position % self.grid.cols(),
                rows: self.grid.rows(),
                cols: self.grid.cols(),
            }
            .into());
        }

        let mut rng = self.rng.borrow_mut();
        let target: Coord = self.grid.move_coord(self.grid.coord(state.position), *action);
        let mut next = GameState {
            position: self.land(self.grid.position(target), &mut rng)?,
            ..*state
        };
        self.settle(&mut next, &mut rng);

        let mut reward = 0.0;
        if next.status == Status::Dead {
            reward = DEATH_REWARD;
        } else {
            if state.stage == TreasureStage::Nothing && next.stage == TreasureStage::HasKey {
                reward += KEY_REWARD;
            }
            if state.stage == TreasureStage::HasKey && next.stage == TreasureStage::HasTreasure {
                reward += TREASURE_REWARD;
            }
            if next.stage == TreasureStage::HasTreasure && next.position == self.start() {
                next.status = Status::Won;
                reward += WIN_REWARD;
            }
        }

        Ok(Transition {
            next_state: next,
            observation: self.observe(&next),
            reward,
            done: next.status != Status::Playing,
        })
    }

    fn is_terminal(&self, state: &GameState) -> bool {
        state.status != Status::Playing
    }

    fn is_win(&self, state: &GameState) -> bool {
        state.status == Status::Won
    }

    fn available_actions(&self, _state: &GameState) -> Option<Vec<Direction>> {
        Some(Direction::ALL.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(text: &str) -> DungeonEnv {
        DungeonEnv::new(GridMap::parse(text).unwrap(), DungeonConfig::default()).unwrap()
    }

    fn walk(env: &DungeonEnv, moves: &[Direction]) -> (GameState, f64) {
        let mut state = env.initial_state();
        let mut total = 0.0;
        for d in moves {
            let t = env.step(&state, d).unwrap();
            total += t.reward;
            state = t.next_state;
        }
        (state, total)
    }

    #[test]
    fn test_two_by_two_win() {
        // treasure key
        // sword    start
        use Direction::*;
        let env = env("2,2\ngihb");
        let (state, total) = walk(&env, &[North, West, South, East]);
        assert_eq!(state.status, Status::Won);
        assert!(state.sword);
        assert!((total - 2.0).abs() < 1e-12);
        assert!(env.is_win(&state));
        assert!(matches!(
            env.step(&state, &North),
            Err(GameError::TerminalState)
        ));
    }

    #[test]
    fn test_treasure_needs_key() {
        // T S
        // K ◦
        use Direction::*;
        let env = env("2,2\nghib");
        let (state, total) = walk(&env, &[North, West]);
        assert_eq!(state.stage, TreasureStage::Nothing);
        assert!(state.sword);
        assert_eq!(total, 0.0);
    }

    #[test]
    fn test_wall_bounces_to_start() {
        // g i
        // c a
        // h b
        use Direction::*;
        let env = env("3,2\ngicahb");
        let (state, _) = walk(&env, &[West, North]);
        assert_eq!(state.position, env.grid().position(env.grid().start()));
        assert!(state.sword);
    }

    #[test]
    fn test_crack_kills() {
        // g i
        // h f
        // a b
        let env = env("3,2\ngihfab");
        let (state, total) = walk(&env, &[Direction::North]);
        assert_eq!(state.status, Status::Dead);
        assert_eq!(total, DEATH_REWARD);
        assert_eq!(env.observe(&state), env.codec().death_id());
    }

    #[test]
    fn test_trap_outcomes_follow_odds() {
        // g i
        // h e
        // a b
        let grid = GridMap::parse("3,2\ngiheab").unwrap();
        let trap = |nothing, teleport, death| {
            let chain = ChainConfig::default().with_trap(dungeon_mdp::TrapOdds {
                nothing,
                teleport,
                death,
            });
            DungeonEnv::new(grid.clone(), DungeonConfig::default().with_chain(chain)).unwrap()
        };

        let (state, _) = walk(&trap(0.0, 1.0, 0.0), &[Direction::North]);
        assert_eq!(state.status, Status::Playing);
        assert_eq!(state.position, 5);

        let (state, _) = walk(&trap(0.0, 0.0, 1.0), &[Direction::North]);
        assert_eq!(state.status, Status::Dead);

        let env = trap(0.6, 0.3, 0.1);
        let mut counts = [0usize; 3];
        for _ in 0..4000 {
            let (state, _) = walk(&env, &[Direction::North]);
            let outcome = match (state.status, state.position) {
                (Status::Dead, _) => 2,
                (_, 5) => 1,
                _ => 0,
            };
            counts[outcome] += 1;
        }
        for (count, expected) in counts.iter().zip([0.6, 0.3, 0.1]) {
            assert!((*count as f64 / 4000.0 - expected).abs() < 0.05);
        }
    }

    #[test]
    fn test_border_push_stays() {
        let env = env("2,2\ngihb");
        let (state, total) = walk(&env, &[Direction::East, Direction::South]);
        assert_eq!(state, env.initial_state());
        assert_eq!(total, 0.0);
    }

    #[test]
    fn test_portal_never_lands_on_recursive_cell() {
        // g j
        // i a
        // h b
        let env = env("3,2\ngjiahb");
        for _ in 0..50 {
            let mut state = env.initial_state();
            state.position = 3;
            let t = env.step(&state, &Direction::North).unwrap();
            assert!(!env.grid().cell(t.next_state.position).is_recursive());
        }
    }

    #[test]
    fn test_observation_matches_codec() {
        let env = env("2,2\ngihb");
        let (state, obs) = env.reset();
        let expected = env
            .codec()
            .to_id(WorldState::new(false, TreasureStage::Nothing, 3))
            .unwrap();
        assert_eq!(obs, expected);
        assert_eq!(env.state_id(&state).unwrap(), expected);
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let config = DungeonConfig::default().with_max_hops(7).with_seed(11);
        let json = serde_json::to_string(&config).unwrap();
        let back: DungeonConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}

//! Policies: Observation → Action mappings.
//!
//! A policy decides what action to take given an observation. In the
//! dungeon the observation is a dense state id and the action a
//! [`Direction`].
//!
//! ```text
//!        ┌──────────┐
//!  Obs ─▶│  Policy  │─▶ Act
//!        └──────────┘
//! ```

use std::cell::RefCell;

use dungeon_core::{Direction, StateId};
use dungeon_mdp::{MdpError, Planner, Solution};
use dungeon_prob::Dist;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::qlearning::{sample_softmax, softmax, QTable};

/// A policy maps observations to actions.
pub trait Policy<Obs, Act> {
    /// Select an action given an observation.
    fn act(&self, obs: &Obs) -> Act;

    /// Optional: get action probabilities (for stochastic policies).
    fn action_probs(&self, _obs: &Obs) -> Option<Vec<f64>> {
        None
    }
}

// ============================================================================
// Random Policy
// ============================================================================

/// Uniformly random direction. A baseline for everything else.
#[derive(Debug)]
pub struct RandomPolicy {
    moves: Dist,
    rng: RefCell<StdRng>,
}

impl RandomPolicy {
    pub fn new(seed: u64) -> Self {
        Self {
            moves: Dist::uniform(Direction::COUNT),
            rng: RefCell::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl<Obs> Policy<Obs, Direction> for RandomPolicy {
    fn act(&self, _obs: &Obs) -> Direction {
        let index = self.moves.sample(self.rng.borrow_mut().gen());
        Direction::ALL[index]
    }

    fn action_probs(&self, _obs: &Obs) -> Option<Vec<f64>> {
        Some(self.moves.p.clone())
    }
}

// ============================================================================
// Tabular Policy
// ============================================================================

/// A fixed action per state id, as produced by the exact solvers.
#[derive(Debug, Clone, PartialEq)]
pub struct TabularPolicy {
    actions: Vec<Direction>,
}

impl TabularPolicy {
    pub fn new(actions: Vec<Direction>) -> Self {
        Self { actions }
    }

    pub fn from_solution(solution: &Solution) -> Self {
        Self::new(solution.policy.clone())
    }

    /// Snapshot of a solved planner's policy.
    ///
    /// # Errors
    ///
    /// [`MdpError::NotReady`] if the planner has not been solved.
    pub fn from_planner(planner: &Planner) -> Result<Self, MdpError> {
        planner
            .solution()
            .map(Self::from_solution)
            .ok_or(MdpError::NotReady)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl Policy<StateId, Direction> for TabularPolicy {
    /// Unknown ids fall back to north.
    fn act(&self, obs: &StateId) -> Direction {
        self.actions.get(*obs).copied().unwrap_or(Direction::North)
    }
}

// ============================================================================
// Q-table Policies
// ============================================================================

/// Always the best action of the Q-table.
#[derive(Debug, Clone, Copy)]
pub struct GreedyPolicy<'a> {
    table: &'a QTable,
}

impl<'a> GreedyPolicy<'a> {
    pub fn new(table: &'a QTable) -> Self {
        Self { table }
    }
}

impl Policy<StateId, Direction> for GreedyPolicy<'_> {
    fn act(&self, obs: &StateId) -> Direction {
        self.table.best_action(*obs).unwrap_or(Direction::North)
    }
}

/// Boltzmann exploration over a Q-table, `p[a] ∝ exp(β · Q[s,a])`.
#[derive(Debug)]
pub struct SoftmaxPolicy<'a> {
    table: &'a QTable,
    beta: f64,
    rng: RefCell<StdRng>,
}

impl<'a> SoftmaxPolicy<'a> {
    pub fn new(table: &'a QTable, beta: f64, seed: u64) -> Self {
        Self {
            table,
            beta,
            rng: RefCell::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Policy<StateId, Direction> for SoftmaxPolicy<'_> {
    fn act(&self, obs: &StateId) -> Direction {
        match self.table.row(*obs) {
            Ok(row) => sample_softmax(row, self.beta, &mut *self.rng.borrow_mut()),
            Err(_) => Direction::North,
        }
    }

    fn action_probs(&self, obs: &StateId) -> Option<Vec<f64>> {
        let row = self.table.row(*obs).ok()?;
        Some(softmax(row, self.beta).to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_policy_covers_all_directions() {
        let policy = RandomPolicy::new(1);
        let mut seen = [false; 4];
        for _ in 0..100 {
            seen[Policy::<StateId, Direction>::act(&policy, &0).index()] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_tabular_policy() {
        let policy = TabularPolicy::new(vec![Direction::East, Direction::South]);
        assert_eq!(policy.act(&1), Direction::South);
        assert_eq!(policy.act(&5), Direction::North);
        assert_eq!(policy.len(), 2);
    }

    #[test]
    fn test_greedy_policy() {
        let mut table = QTable::new(2);
        table.set(0, Direction::West, 0.3).unwrap();
        assert_eq!(GreedyPolicy::new(&table).act(&0), Direction::West);
        assert_eq!(GreedyPolicy::new(&table).act(&1), Direction::North);
    }

    #[test]
    fn test_softmax_policy_prefers_best() {
        let mut table = QTable::new(1);
        table.set(0, Direction::South, 1.0).unwrap();
        let policy = SoftmaxPolicy::new(&table, 8.0, 0);
        let probs = policy.action_probs(&0).unwrap();
        assert!(probs[Direction::South.index()] > 0.99);
        let south = (0..200)
            .filter(|_| policy.act(&0) == Direction::South)
            .count();
        assert!(south > 190);
    }
}

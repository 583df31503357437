//! Exact solvers: value iteration and policy iteration.

use std::fmt;

use dungeon_core::Direction;
use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::SolverConfig;
use crate::error::MdpError;
use crate::reward::RewardTensor;
use crate::transition::TransitionTensor;

/// Q-values closer than this are treated as tied.
const TIE_TOLERANCE: f64 = 1e-9;

/// Which exact solver to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Method {
    ValueIteration,
    PolicyIteration,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::ValueIteration => write!(f, "value iteration"),
            Method::PolicyIteration => write!(f, "policy iteration"),
        }
    }
}

/// Why a solver stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Termination {
    /// The stopping criterion was met.
    Converged,
    /// The iteration cap was reached first; the result is the best estimate.
    IterationCap,
}

/// Values and greedy policy for every state, death included.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub values: Vec<f64>,
    pub policy: Vec<Direction>,
    pub iterations: usize,
    pub termination: Termination,
}

impl Solution {
    pub fn converged(&self) -> bool {
        self.termination == Termination::Converged
    }
}

/// Solves a dungeon MDP given its tensors.
#[derive(Debug, Clone)]
pub struct MdpSolver {
    config: SolverConfig,
}

impl MdpSolver {
    pub fn new(config: SolverConfig) -> Result<Self, MdpError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn solve(
        &self,
        method: Method,
        t: &TransitionTensor,
        r: &RewardTensor,
    ) -> Result<Solution, MdpError> {
        match method {
            Method::ValueIteration => self.value_iteration(t, r),
            Method::PolicyIteration => self.policy_iteration(t, r),
        }
    }

    /// `Q[s][a] = R[s][a] + γ Σ_s' T[s][a][s'] V[s']`.
    pub fn q_values(&self, t: &TransitionTensor, r: &RewardTensor, values: &[f64]) -> Vec<[f64; 4]> {
        (0..t.num_states())
            .map(|s| {
                let mut q = [0.0; 4];
                for (a, slot) in q.iter_mut().enumerate() {
                    *slot = r.get(s, a) + self.config.gamma * t.expectation(s, a, values);
                }
                q
            })
            .collect()
    }

    /// Iterate the Bellman optimality operator from `V = 0`.
    ///
    /// Stops when `max |V - V_prev| < epsilon` or at the iteration cap. The
    /// policy is the greedy one, ties going to the lowest direction index.
    pub fn value_iteration(
        &self,
        t: &TransitionTensor,
        r: &RewardTensor,
    ) -> Result<Solution, MdpError> {
        check_shapes(t, r)?;
        let n = t.num_states();
        let mut values = vec![0.0; n];
        let mut q = vec![[0.0; 4]; n];
        let mut termination = Termination::IterationCap;
        let mut iterations = 0;

        while iterations < self.config.max_iterations {
            iterations += 1;
            q = self.q_values(t, r, &values);
            let next: Vec<f64> = q.iter().map(|row| max(row)).collect();
            let delta = next
                .iter()
                .zip(&values)
                .map(|(a, b)| (a - b).abs())
                .fold(0.0, f64::max);
            values = next;
            if delta < self.config.epsilon {
                termination = Termination::Converged;
                break;
            }
        }

        let policy = q.iter().map(|row| first_argmax(row)).collect();
        report(Method::ValueIteration, iterations, termination);
        Ok(Solution {
            values,
            policy,
            iterations,
            termination,
        })
    }

    /// Policy iteration from a uniformly random policy.
    ///
    /// Each round evaluates the current policy exactly by solving
    /// `(γ T_P - I) V = -R_P`, then acts greedily on the resulting Q-values,
    /// breaking ties uniformly at random. Stops once the policy is stable or
    /// no state's best Q-value improved, or at the iteration cap.
    pub fn policy_iteration(
        &self,
        t: &TransitionTensor,
        r: &RewardTensor,
    ) -> Result<Solution, MdpError> {
        check_shapes(t, r)?;
        let n = t.num_states();
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut policy: Vec<usize> = (0..n).map(|_| rng.gen_range(0..Direction::COUNT)).collect();
        let mut values = vec![0.0; n];
        let mut best_q: Option<Vec<f64>> = None;
        let mut termination = Termination::IterationCap;
        let mut iterations = 0;

        while iterations < self.config.max_iterations {
            iterations += 1;
            values = self.evaluate(t, r, &policy, iterations)?;
            let q = self.q_values(t, r, &values);
            let next: Vec<usize> = q.iter().map(|row| random_argmax(row, &mut rng)).collect();
            let best: Vec<f64> = q.iter().map(|row| max(row)).collect();

            let stable = next == policy;
            let improved = match &best_q {
                None => true,
                Some(prev) => best.iter().zip(prev).any(|(b, p)| *b > p + TIE_TOLERANCE),
            };
            debug!(iterations, stable, improved, "policy iteration round");

            policy = next;
            best_q = Some(best);
            if stable || !improved {
                termination = Termination::Converged;
                break;
            }
        }

        report(Method::PolicyIteration, iterations, termination);
        Ok(Solution {
            values,
            policy: policy.into_iter().map(direction).collect(),
            iterations,
            termination,
        })
    }

    /// Exact value of a fixed policy.
    fn evaluate(
        &self,
        t: &TransitionTensor,
        r: &RewardTensor,
        policy: &[usize],
        iteration: usize,
    ) -> Result<Vec<f64>, MdpError> {
        let n = t.num_states();
        let gamma = self.config.gamma;
        let a = DMatrix::from_fn(n, n, |i, j| {
            let identity = if i == j { 1.0 } else { 0.0 };
            gamma * t.get(i, policy[i], j) - identity
        });
        let b = DVector::from_fn(n, |i, _| -r.get(i, policy[i]));
        let v = a
            .lu()
            .solve(&b)
            .ok_or(MdpError::SingularSystem { iteration })?;
        Ok(v.iter().copied().collect())
    }
}

fn check_shapes(t: &TransitionTensor, r: &RewardTensor) -> Result<(), MdpError> {
    if t.num_states() != r.num_states() {
        return Err(MdpError::ShapeMismatch {
            expected: t.num_states(),
            got: r.num_states(),
        });
    }
    Ok(())
}

fn report(method: Method, iterations: usize, termination: Termination) {
    match termination {
        Termination::Converged => info!(%method, iterations, "solver converged"),
        Termination::IterationCap => warn!(%method, iterations, "solver hit the iteration cap"),
    }
}

fn max(row: &[f64; 4]) -> f64 {
    row.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

fn first_argmax(row: &[f64; 4]) -> Direction {
    let mut best = 0;
    for (a, &q) in row.iter().enumerate() {
        if q > row[best] {
            best = a;
        }
    }
    direction(best)
}

fn random_argmax<R: Rng>(row: &[f64; 4], rng: &mut R) -> usize {
    let top = max(row);
    let ties: Vec<usize> = (0..row.len())
        .filter(|&a| row[a] >= top - TIE_TOLERANCE)
        .collect();
    *ties.choose(rng).unwrap_or(&0)
}

fn direction(index: usize) -> Direction {
    Direction::from_index(index).unwrap_or(Direction::North)
}

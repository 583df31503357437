//! Configuration for the chain, the resolver and the solvers.
//!
//! Every struct has the documented defaults and `with_*` setters, and
//! round-trips through serde so a run can be stored next to its map.

use serde::{Deserialize, Serialize};

use crate::error::MdpError;

/// Outcome split when entering a trap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrapOdds {
    /// Nothing happens.
    pub nothing: f64,
    /// Thrown back to the start cell.
    pub teleport: f64,
    /// Instant death.
    pub death: f64,
}

impl Default for TrapOdds {
    fn default() -> Self {
        Self {
            nothing: 0.6,
            teleport: 0.3,
            death: 0.1,
        }
    }
}

impl TrapOdds {
    pub fn validate(&self) -> Result<(), MdpError> {
        let parts = [self.nothing, self.teleport, self.death];
        if parts.iter().any(|&p| !(0.0..=1.0).contains(&p)) {
            return Err(MdpError::InvalidConfig {
                reason: format!("trap odds out of [0, 1]: {:?}", self),
            });
        }
        let sum: f64 = parts.iter().sum();
        if (sum - 1.0).abs() > 1e-9 {
            return Err(MdpError::InvalidConfig {
                reason: format!("trap odds sum to {}", sum),
            });
        }
        Ok(())
    }
}

/// Constants of the one-step stationary chain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Probability that a dangerous enemy wins the fight.
    pub p_enemy: f64,
    pub trap: TrapOdds,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            p_enemy: 0.7,
            trap: TrapOdds::default(),
        }
    }
}

impl ChainConfig {
    pub fn with_p_enemy(mut self, p_enemy: f64) -> Self {
        self.p_enemy = p_enemy;
        self
    }

    pub fn with_trap(mut self, trap: TrapOdds) -> Self {
        self.trap = trap;
        self
    }

    pub fn validate(&self) -> Result<(), MdpError> {
        if !(0.0..=1.0).contains(&self.p_enemy) {
            return Err(MdpError::InvalidConfig {
                reason: format!("p_enemy = {} is not a probability", self.p_enemy),
            });
        }
        self.trap.validate()
    }
}

/// Bounds on the portal/platform fixed-point iteration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolverConfig {
    pub max_iterations: usize,
    /// Successive iterates closer than this (max-norm) count as equal.
    pub tolerance: f64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10_000,
            tolerance: 1e-12,
        }
    }
}

impl ResolverConfig {
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }
}

/// Value and policy iteration settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Discount factor.
    pub gamma: f64,
    /// Value iteration stops once `max |V - V_prev| < epsilon`.
    pub epsilon: f64,
    pub max_iterations: usize,
    /// Seeds the initial random policy and the tie-breaking of policy iteration.
    pub seed: u64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            gamma: 0.9,
            epsilon: 1e-5,
            max_iterations: 10_000,
            seed: 0,
        }
    }
}

impl SolverConfig {
    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<(), MdpError> {
        if !(0.0..1.0).contains(&self.gamma) {
            return Err(MdpError::InvalidConfig {
                reason: format!("gamma = {} must lie in [0, 1)", self.gamma),
            });
        }
        if self.epsilon <= 0.0 {
            return Err(MdpError::InvalidConfig {
                reason: format!("epsilon = {} must be positive", self.epsilon),
            });
        }
        Ok(())
    }
}

/// Everything a [`crate::Planner`] needs besides the grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PlannerConfig {
    pub chain: ChainConfig,
    pub resolver: ResolverConfig,
    pub solver: SolverConfig,
}

impl PlannerConfig {
    pub fn with_chain(mut self, chain: ChainConfig) -> Self {
        self.chain = chain;
        self
    }

    pub fn with_resolver(mut self, resolver: ResolverConfig) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_solver(mut self, solver: SolverConfig) -> Self {
        self.solver = solver;
        self
    }
}

//! Tabular Q-learning with softmax exploration.
//!
//! One-step updates, applied online as the adventurer moves:
//!
//! `Q[s,a] += α · (r + γ · max_a' Q[s',a'] − Q[s,a])`
//!
//! Each updated entry is rounded to a fixed number of decimals so runs are
//! reproducible across platforms and the persisted table stays readable.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use dungeon_core::{CoreError, Direction, StateId};
use dungeon_prob::Dist;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::env::{DungeonEnv, Env, Status};
use crate::GameError;

/// Learning settings.
/// Most decimals a Q-value can keep; `f64` holds about 15 significant digits.
pub const MAX_PRECISION: u32 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QLearningConfig {
    /// Learning rate.
    pub alpha: f64,
    /// Discount factor.
    pub gamma: f64,
    /// Inverse temperature of the softmax.
    pub beta: f64,
    /// Decimals kept after each update.
    pub precision: u32,
    pub seed: u64,
}

impl Default for QLearningConfig {
    fn default() -> Self {
        Self {
            alpha: 0.4,
            gamma: 0.9,
            beta: 8.0,
            precision: 6,
            seed: 0,
        }
    }
}

impl QLearningConfig {
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma;
        self
    }

    pub fn with_beta(mut self, beta: f64) -> Self {
        self.beta = beta;
        self
    }

    pub fn with_precision(mut self, precision: u32) -> Self {
        self.precision = precision;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<(), GameError> {
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err(GameError::InvalidConfig {
                reason: format!("alpha = {} must lie in (0, 1]", self.alpha),
            });
        }
        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(GameError::InvalidConfig {
                reason: format!("gamma = {} must lie in [0, 1]", self.gamma),
            });
        }
        if self.beta < 0.0 {
            return Err(GameError::InvalidConfig {
                reason: format!("beta = {} must be non-negative", self.beta),
            });
        }
        if self.precision > MAX_PRECISION {
            return Err(GameError::InvalidConfig {
                reason: format!(
                    "precision = {} exceeds {} decimals",
                    self.precision, MAX_PRECISION
                ),
            });
        }
        Ok(())
    }
}

/// Boltzmann distribution over a Q-row: `p[a] ∝ exp(β · q[a])`.
pub fn softmax(row: &[f64; 4], beta: f64) -> [f64; 4] {
    let top = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut p = [0.0; 4];
    for (out, &q) in p.iter_mut().zip(row) {
        *out = (beta * (q - top)).exp();
    }
    let sum: f64 = p.iter().sum();
    for out in &mut p {
        *out /= sum;
    }
    p
}

/// Draw a direction from a softmax over `row`.
pub(crate) fn sample_softmax<R: rand::Rng>(row: &[f64; 4], beta: f64, rng: &mut R) -> Direction {
    let index = match Dist::from_weights(softmax(row, beta).to_vec()) {
        Ok(dist) => dist.sample(rng.gen()),
        Err(_) => 0,
    };
    Direction::from_index(index).unwrap_or(Direction::North)
}

/// `num_states × 4` table of action values, row `i` for state id `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct QTable {
    rows: Vec<[f64; 4]>,
}

impl QTable {
    /// All zeros.
    pub fn new(num_states: usize) -> Self {
        Self {
            rows: vec![[0.0; 4]; num_states],
        }
    }

    pub fn num_states(&self) -> usize {
        self.rows.len()
    }

    pub fn row(&self, state: StateId) -> Result<&[f64; 4], GameError> {
        self.rows.get(state).ok_or_else(|| self.out_of_range(state))
    }

    pub fn get(&self, state: StateId, action: Direction) -> Result<f64, GameError> {
        Ok(self.row(state)?[action.index()])
    }

    pub fn set(&mut self, state: StateId, action: Direction, value: f64) -> Result<(), GameError> {
        let err = self.out_of_range(state);
        let row = self.rows.get_mut(state).ok_or(err)?;
        row[action.index()] = value;
        Ok(())
    }

    /// `max_a Q[state, a]`.
    pub fn best_value(&self, state: StateId) -> Result<f64, GameError> {
        Ok(self
            .row(state)?
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max))
    }

    /// Greedy action, ties going to the lowest direction index.
    pub fn best_action(&self, state: StateId) -> Result<Direction, GameError> {
        let row = self.row(state)?;
        let mut best = 0;
        for (a, &q) in row.iter().enumerate() {
            if q > row[best] {
                best = a;
            }
        }
        Ok(Direction::from_index(best).unwrap_or(Direction::North))
    }

    fn out_of_range(&self, state: StateId) -> GameError {
        CoreError::OutOfRange {
            id: state,
            max_id: self.rows.len().saturating_sub(1),
        }
        .into()
    }

    /// One line per state, four comma-separated values per line.
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        for row in &self.rows {
            let line: Vec<String> = row.iter().map(|q| q.to_string()).collect();
            out.push_str(&line.join(","));
            out.push('\n');
        }
        out
    }

    /// Parse [`QTable::to_csv`] output for a map with `num_states` states.
    ///
    /// # Errors
    ///
    /// [`GameError::Parse`] for a malformed line, [`GameError::QTableShape`]
    /// when the row count is not `num_states`.
    pub fn from_csv(text: &str, num_states: usize) -> Result<Self, GameError> {
        let mut rows = Vec::with_capacity(num_states);
        for (i, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            if fields.len() != 4 {
                return Err(GameError::Parse {
                    line: i + 1,
                    reason: format!("expected 4 values, found {}", fields.len()),
                });
            }
            let mut row = [0.0; 4];
            for (slot, field) in row.iter_mut().zip(&fields) {
                *slot = field.parse().map_err(|e| GameError::Parse {
                    line: i + 1,
                    reason: format!("{:?}: {}", field, e),
                })?;
            }
            rows.push(row);
        }

        if rows.len() != num_states {
            return Err(GameError::QTableShape {
                expected: num_states,
                got: rows.len(),
            });
        }
        Ok(Self { rows })
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), GameError> {
        fs::write(path.as_ref(), self.to_csv())?;
        debug!(path = %path.as_ref().display(), states = self.num_states(), "saved Q-table");
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>, num_states: usize) -> Result<Self, GameError> {
        let text = fs::read_to_string(path.as_ref())?;
        let table = Self::from_csv(&text, num_states)?;
        info!(path = %path.as_ref().display(), states = num_states, "loaded Q-table");
        Ok(table)
    }

    /// [`QTable::load`], or a zero table when the file does not exist.
    /// Any other failure is still an error.
    pub fn load_or_default(path: impl AsRef<Path>, num_states: usize) -> Result<Self, GameError> {
        match Self::load(path.as_ref(), num_states) {
            Err(GameError::Io(e)) if e.kind() == ErrorKind::NotFound => {
                warn!(path = %path.as_ref().display(), "no Q-table found, starting from zeros");
                Ok(Self::new(num_states))
            }
            other => other,
        }
    }
}

/// Summary of one training episode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpisodeReport {
    pub steps: usize,
    pub total_reward: f64,
    pub status: Status,
}

/// Online tabular learner.
#[derive(Debug, Clone)]
pub struct QLearner {
    config: QLearningConfig,
    table: QTable,
    rng: StdRng,
}

impl QLearner {
    pub fn new(num_states: usize, config: QLearningConfig) -> Result<Self, GameError> {
        Self::with_table(QTable::new(num_states), config)
    }

    /// Continue learning from an existing table.
    pub fn with_table(table: QTable, config: QLearningConfig) -> Result<Self, GameError> {
        config.validate()?;
        Ok(Self {
            config,
            table,
            rng: StdRng::seed_from_u64(config.seed),
        })
    }

    pub fn config(&self) -> &QLearningConfig {
        &self.config
    }

    pub fn table(&self) -> &QTable {
        &self.table
    }

    pub fn into_table(self) -> QTable {
        self.table
    }

    /// Sample an action from the softmax over `state`'s row.
    pub fn choose(&mut self, state: StateId) -> Result<Direction, GameError> {
        let row = *self.table.row(state)?;
        Ok(sample_softmax(&row, self.config.beta, &mut self.rng))
    }

    /// Apply one update for the observed `(state, action, reward, next)` and
    /// return the new `Q[state, action]`.
    pub fn q_step(
        &mut self,
        state: StateId,
        action: Direction,
        reward: f64,
        next: StateId,
    ) -> Result<f64, GameError> {
        let current = self.table.get(state, action)?;
        let target = reward + self.config.gamma * self.table.best_value(next)?;
        let updated = round_to(
            current + self.config.alpha * (target - current),
            self.config.precision,
        );
        self.table.set(state, action, updated)?;
        Ok(updated)
    }

    /// Play one episode against `env`, learning from every move.
    pub fn train_episode(
        &mut self,
        env: &DungeonEnv,
        max_steps: usize,
    ) -> Result<EpisodeReport, GameError> {
        let (mut state, mut obs) = env.reset();
        let mut total_reward = 0.0;
        let mut steps = 0;

        while steps < max_steps && !env.is_terminal(&state) {
            let action = self.choose(obs)?;
            let t = env.step(&state, &action)?;
            self.q_step(obs, action, t.reward, t.observation)?;
            total_reward += t.reward;
            steps += 1;
            state = t.next_state;
            obs = t.observation;
        }

        Ok(EpisodeReport {
            steps,
            total_reward,
            status: state.status,
        })
    }

    /// Run `episodes` training episodes and return their reports.
    pub fn train(
        &mut self,
        env: &DungeonEnv,
        episodes: usize,
        max_steps: usize,
    ) -> Result<Vec<EpisodeReport>, GameError> {
        let mut reports = Vec::with_capacity(episodes);
        for episode in 0..episodes {
            let report = self.train_episode(env, max_steps)?;
            debug!(episode, steps = report.steps, status = ?report.status, "episode done");
            reports.push(report);
        }
        let wins = reports.iter().filter(|r| r.status == Status::Won).count();
        info!(episodes, wins, "training finished");
        Ok(reports)
    }
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (value * scale).round() / scale
}

//! Rollout: execute a policy in an environment.
//!
//! ```text
//!    ┌──────────┐     ┌──────────┐
//!    │  Policy  │────▶│   Env    │
//!    └──────────┘     └──────────┘
//!         │                │
//!         ▼                ▼
//!    ┌─────────────────────────────┐
//!    │        Trajectory           │
//!    │  [(s₀,a₀,r₀), (s₁,a₁,r₁),...]│
//!    └─────────────────────────────┘
//! ```

use std::fmt;

use tracing::{debug, info};

use crate::env::{Env, Transition};
use crate::policy::Policy;
use crate::GameError;

/// A single step in a trajectory.
#[derive(Debug, Clone)]
pub struct Step<State, Obs, Act> {
    pub state: State,
    pub observation: Obs,
    pub action: Act,
    pub reward: f64,
    pub next_state: State,
    /// Whether this step ended the episode
    pub done: bool,
}

/// The steps of one episode.
#[derive(Debug, Clone)]
pub struct Trajectory<State, Obs, Act> {
    pub steps: Vec<Step<State, Obs, Act>>,
}

impl<State, Obs, Act> Trajectory<State, Obs, Act> {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn push(&mut self, step: Step<State, Obs, Act>) {
        self.steps.push(step);
    }

    pub fn total_reward(&self) -> f64 {
        self.steps.iter().map(|s| s.reward).sum()
    }

    /// `Σ γ^t r_t`.
    pub fn discounted_reward(&self, gamma: f64) -> f64 {
        self.steps
            .iter()
            .rev()
            .fold(0.0, |acc, step| step.reward + gamma * acc)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The episode ended on its own rather than by running out of steps.
    pub fn is_terminal(&self) -> bool {
        self.steps.last().map_or(false, |s| s.done)
    }

    /// State after the last step.
    pub fn final_state(&self) -> Option<&State> {
        self.steps.last().map(|s| &s.next_state)
    }

    pub fn actions(&self) -> Vec<Act>
    where
        Act: Clone,
    {
        self.steps.iter().map(|s| s.action.clone()).collect()
    }
}

impl<State, Obs, Act> Default for Trajectory<State, Obs, Act> {
    fn default() -> Self {
        Self::new()
    }
}

/// Run `policy` in `env` from a fresh reset for at most `max_steps` steps.
///
/// # Errors
///
/// Any error raised by [`Env::step`].
///
/// # Example
///
/// ```rust
/// use dungeon_core::GridMap;
/// use dungeon_games::env::{DungeonConfig, DungeonEnv};
/// use dungeon_games::policy::RandomPolicy;
/// use dungeon_games::rollout;
///
/// let env = DungeonEnv::new(GridMap::parse("2,2\ngihb").unwrap(), DungeonConfig::default()).unwrap();
/// let trajectory = rollout(&RandomPolicy::new(7), &env, 50).unwrap();
/// assert!(trajectory.len() <= 50);
/// ```
pub fn rollout<P, E>(
    policy: &P,
    env: &E,
    max_steps: usize,
) -> Result<Trajectory<E::State, E::Obs, E::Act>, GameError>
where
    E: Env,
    E::Obs: Clone,
    P: Policy<E::Obs, E::Act>,
{
    let mut trajectory = Trajectory::new();
    let (mut state, mut obs) = env.reset();

    while trajectory.len() < max_steps && !env.is_terminal(&state) {
        let action = policy.act(&obs);
        let Transition {
            next_state,
            observation,
            reward,
            done,
        } = env.step(&state, &action)?;

        trajectory.push(Step {
            state,
            observation: obs,
            action,
            reward,
            next_state: next_state.clone(),
            done,
        });
        state = next_state;
        obs = observation;
    }

    Ok(trajectory)
}

/// Run several independent episodes.
pub fn rollout_batch<P, E>(
    policy: &P,
    env: &E,
    num_episodes: usize,
    max_steps: usize,
) -> Result<Vec<Trajectory<E::State, E::Obs, E::Act>>, GameError>
where
    E: Env,
    E::Obs: Clone,
    P: Policy<E::Obs, E::Act>,
{
    (0..num_episodes)
        .map(|_| rollout(policy, env, max_steps))
        .collect()
}

/// Statistics over a batch of episodes.
#[derive(Debug, Clone, PartialEq)]
pub struct RolloutStats {
    pub num_episodes: usize,
    pub mean_reward: f64,
    pub std_reward: f64,
    pub mean_length: f64,
    /// Episodes ending in a win.
    pub wins: usize,
    /// Episodes ending in any other terminal state.
    pub losses: usize,
}

impl RolloutStats {
    pub fn win_rate(&self) -> f64 {
        if self.num_episodes == 0 {
            0.0
        } else {
            self.wins as f64 / self.num_episodes as f64
        }
    }
}

impl fmt::Display for RolloutStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Rollout Statistics ({} episodes):", self.num_episodes)?;
        writeln!(
            f,
            "  Mean reward: {:.4} ± {:.4}",
            self.mean_reward, self.std_reward
        )?;
        writeln!(f, "  Mean length: {:.2}", self.mean_length)?;
        writeln!(
            f,
            "  Won: {}/{} ({:.1}%)  Lost: {}",
            self.wins,
            self.num_episodes,
            100.0 * self.win_rate(),
            self.losses
        )
    }
}

/// Roll out `num_episodes` episodes and summarize them.
pub fn evaluate<P, E>(
    policy: &P,
    env: &E,
    num_episodes: usize,
    max_steps: usize,
) -> Result<RolloutStats, GameError>
where
    E: Env,
    E::Obs: Clone,
    P: Policy<E::Obs, E::Act>,
{
    let trajectories = rollout_batch(policy, env, num_episodes, max_steps)?;

    let rewards: Vec<f64> = trajectories.iter().map(|t| t.total_reward()).collect();
    let n = num_episodes.max(1) as f64;
    let mean_reward = rewards.iter().sum::<f64>() / n;
    let mean_length = trajectories.iter().map(|t| t.len() as f64).sum::<f64>() / n;
    let std_reward = (rewards
        .iter()
        .map(|r| (r - mean_reward).powi(2))
        .sum::<f64>()
        / n)
        .sqrt();

    let mut wins = 0;
    let mut losses = 0;
    for trajectory in &trajectories {
        match trajectory.final_state() {
            Some(last) if env.is_win(last) => wins += 1,
            Some(last) if env.is_terminal(last) => losses += 1,
            _ => {}
        }
    }
    debug!(num_episodes, wins, losses, "evaluated policy");

    let stats = RolloutStats {
        num_episodes,
        mean_reward,
        std_reward,
        mean_length,
        wins,
        losses,
    };
    info!(win_rate = stats.win_rate(), mean_reward, "evaluation done");
    Ok(stats)
}

//! Planning vs Learning on One Dungeon
//!
//! Run with: cargo run -p dungeon-games --example learn_dungeon
//!
//! Set `RUST_LOG=info` for solver and training progress.
//!
//! This example puts three adventurers in the same generated dungeon:
//! - A random walker, as the baseline
//! - The planner's policy, computed from the full model
//! - A Q-learner that only ever sees live moves and rewards
//!
//! The learned table is saved to `qtable.csv` in the temp directory and
//! picked up again on the next run.

use dungeon_core::{GeneratorConfig, MapGenerator};
use dungeon_games::{
    evaluate, DungeonConfig, DungeonEnv, GreedyPolicy, QLearner, QLearningConfig, QTable,
    RandomPolicy, TabularPolicy,
};
use dungeon_mdp::{Method, Planner, PlannerConfig};
use tracing_subscriber::EnvFilter;

const EPISODES: usize = 2_000;
const MAX_STEPS: usize = 200;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Planning vs Learning ===\n");

    let grid = MapGenerator::new(GeneratorConfig::default(), 7)?.generate(4, 6)?;
    println!("{}", grid);

    let env = DungeonEnv::new(grid.clone(), DungeonConfig::default().with_seed(1))?;

    // -------------------------------------------------------------------------
    // 1. Baseline
    // -------------------------------------------------------------------------
    println!("1. Random walker");
    println!("----------------\n");
    let random = evaluate(&RandomPolicy::new(3), &env, 500, MAX_STEPS)?;
    println!("{}", random);

    // -------------------------------------------------------------------------
    // 2. Planner
    // -------------------------------------------------------------------------
    println!("2. Planner (policy iteration)");
    println!("-----------------------------\n");
    let mut planner = Planner::new(grid, PlannerConfig::default())?;
    planner.solve(Method::PolicyIteration)?;
    let planned = evaluate(&TabularPolicy::from_planner(&planner)?, &env, 500, MAX_STEPS)?;
    println!("{}", planned);

    // -------------------------------------------------------------------------
    // 3. Q-learning
    // -------------------------------------------------------------------------
    println!("3. Q-learning ({} episodes)", EPISODES);
    println!("-------------------------------\n");
    let path = std::env::temp_dir().join("qtable.csv");
    let num_states = env.codec().num_states();
    let table = QTable::load_or_default(&path, num_states)?;
    let mut learner = QLearner::with_table(table, QLearningConfig::default().with_seed(2))?;

    let reports = learner.train(&env, EPISODES, MAX_STEPS)?;
    let tail = &reports[reports.len().saturating_sub(200)..];
    let mean_tail: f64 = tail.iter().map(|r| r.total_reward).sum::<f64>() / tail.len() as f64;
    println!("mean reward over the last {} episodes: {:.3}\n", tail.len(), mean_tail);

    let learned = evaluate(&GreedyPolicy::new(learner.table()), &env, 500, MAX_STEPS)?;
    println!("{}", learned);

    learner.table().save(&path)?;
    println!("Q-table saved to {}", path.display());

    Ok(())
}

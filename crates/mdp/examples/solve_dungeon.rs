//! Solving a Generated Dungeon
//!
//! Run with: cargo run -p dungeon-mdp --example solve_dungeon
//!
//! Set `RUST_LOG=debug` to watch the tensors being built and the solvers
//! converge.
//!
//! This example walks the whole planning pipeline:
//! - Generate a winnable map and print it
//! - Build the transition and reward tensors
//! - Solve with value iteration and with policy iteration
//! - Print the policy for the empty-handed adventurer as arrows

use dungeon_core::{GeneratorConfig, MapGenerator, TreasureStage, WorldState};
use dungeon_mdp::{Method, Planner, PlannerConfig};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Solving a Generated Dungeon ===\n");

    // -------------------------------------------------------------------------
    // 1. A winnable map
    // -------------------------------------------------------------------------
    let grid = MapGenerator::new(GeneratorConfig::default(), 2024)?.generate(5, 8)?;
    println!("{}", grid);
    println!("save format:\n{}\n", grid.to_save_string());

    // -------------------------------------------------------------------------
    // 2. Tensors
    // -------------------------------------------------------------------------
    let mut planner = Planner::new(grid.clone(), PlannerConfig::default())?;
    println!(
        "{} states × 4 actions (death id = {})\n",
        planner.codec().num_states(),
        planner.codec().death_id()
    );

    // -------------------------------------------------------------------------
    // 3. Both solvers
    // -------------------------------------------------------------------------
    let start = grid.position(grid.start());
    let origin = planner
        .codec()
        .to_id(WorldState::new(false, TreasureStage::Nothing, start))?;

    for method in [Method::ValueIteration, Method::PolicyIteration] {
        let solution = planner.solve(method)?;
        println!(
            "{:<17} {:>5} iterations  {:?}  V(start) = {:.4}",
            method.to_string(),
            solution.iterations,
            solution.termination,
            solution.values[origin]
        );
    }
    println!();

    // -------------------------------------------------------------------------
    // 4. Policy without sword or key
    // -------------------------------------------------------------------------
    println!("Policy, nothing in hand:");
    for row in 0..grid.rows() {
        let mut line = String::new();
        for col in 0..grid.cols() {
            let pos = row * grid.cols() + col;
            let action = planner.policy(WorldState::new(false, TreasureStage::Nothing, pos))?;
            line.push_str(&format!(" {}", action));
        }
        println!("{}", line);
    }

    Ok(())
}

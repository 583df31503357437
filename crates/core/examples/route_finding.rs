//! Maps and Routes
//!
//! Run with: cargo run -p dungeon-core --example route_finding
//!
//! Loads a hand-written map from its save format, finds the cheapest
//! portal-free winning route, then generates a few random maps and checks
//! each one is winnable.

use dungeon_core::{is_winnable, winning_route, Coord, GeneratorConfig, GridMap, MapGenerator};

fn show(path: &[Coord]) -> String {
    path.iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(" → ")
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Maps and Routes ===\n");

    // treasure .      key
    // wall     portal .
    // sword    .      start
    let grid = GridMap::parse("3,3\ngaicjahab")?;
    println!("{}", grid);

    match winning_route(&grid)? {
        Some(route) => {
            println!("to key:      {}", show(&route.to_key));
            println!("to treasure: {}", show(&route.to_treasure));
            println!("back:        {}", show(&route.back));
            println!("cost:        {}\n", route.cost());
        }
        None => println!("no portal-free route\n"),
    }

    let mut generator = MapGenerator::new(GeneratorConfig::default(), 42)?;
    for i in 0..3 {
        let map = generator.generate(4, 5)?;
        println!("map {} (winnable: {})", i, is_winnable(&map)?);
        println!("{}", map);
    }

    Ok(())
}

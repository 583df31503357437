//! Property tests for the state codec and the path finder.

use dungeon_core::{
    shortest_path, CellKind, Coord, GridMap, PathFinder, StateCodec, TreasureStage, WorldState,
};
use proptest::prelude::*;

/// Obstacle-free grid: treasure, key and sword in the first row, start in
/// the last cell, everything else empty.
fn open_grid(rows: usize, cols: usize) -> GridMap {
    let mut cells = vec![CellKind::Empty; rows * cols];
    cells[0] = CellKind::Treasure;
    cells[1] = CellKind::Key;
    cells[2] = CellKind::Sword;
    cells[rows * cols - 1] = CellKind::Start;
    GridMap::new(rows, cols, cells).unwrap()
}

fn arb_dims() -> impl Strategy<Value = (usize, usize)> {
    (2..8usize, 3..8usize)
}

proptest! {
    #[test]
    fn test_codec_roundtrip(
        (rows, cols) in arb_dims(),
        sword in any::<bool>(),
        stage in 0..3usize,
        seed in any::<usize>(),
    ) {
        let codec = StateCodec::new(rows, cols).unwrap();
        let state = WorldState::new(
            sword,
            TreasureStage::from_index(stage).unwrap(),
            seed % (rows * cols),
        );
        let id = codec.to_id(state).unwrap();
        prop_assert!(id < codec.max_id());
        prop_assert_eq!(codec.from_id(id).unwrap(), state);
    }

    #[test]
    fn test_codec_ids_are_dense(
        (rows, cols) in arb_dims(),
    ) {
        let codec = StateCodec::new(rows, cols).unwrap();
        let mut seen = vec![false; codec.max_id()];
        for state in codec.live_states() {
            let id = codec.to_id(state).unwrap();
            prop_assert!(!seen[id]);
            seen[id] = true;
        }
        prop_assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_astar_cost_is_manhattan_on_open_grid(
        (rows, cols) in arb_dims(),
        a in any::<usize>(),
        b in any::<usize>(),
    ) {
        let grid = open_grid(rows, cols);
        let from = grid.coord(a % grid.len());
        let to = grid.coord(b % grid.len());
        let path = shortest_path(&grid, from, to).unwrap().unwrap();
        prop_assert_eq!(PathFinder::path_cost(&path), 10 * GridMap::distance(from, to));
        for pair in path.windows(2) {
            prop_assert_eq!(GridMap::distance(pair[0], pair[1]), 1);
        }
    }
}

#[test]
fn test_open_grid_is_winnable() {
    let grid = open_grid(4, 4);
    assert!(dungeon_core::is_winnable(&grid).unwrap());
    assert_eq!(grid.start(), Coord::new(3, 3));
}

//! Random dungeon layouts, rejected until winnable.

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::astar::is_winnable;
use crate::cell::{CellKind, EnemyKind};
use crate::error::CoreError;
use crate::grid::GridMap;

/// Relative weights of the filler cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellWeights {
    pub empty: f64,
    pub wall: f64,
    pub enemy: f64,
    pub portal: f64,
    pub crack: f64,
    pub moving_platform: f64,
    pub trap: f64,
}

impl Default for CellWeights {
    fn default() -> Self {
        Self {
            empty: 0.5,
            wall: 0.2,
            enemy: 0.1,
            portal: 0.05,
            crack: 0.05,
            moving_platform: 0.05,
            trap: 0.05,
        }
    }
}

/// Generator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    pub weights: CellWeights,
    /// Fraction of enemies drawn as the special variant.
    pub special_enemy_fraction: f64,
    /// Maps tried before giving up on a winnable one.
    pub max_attempts: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            weights: CellWeights::default(),
            special_enemy_fraction: 0.0,
            max_attempts: 1000,
        }
    }
}

impl GeneratorConfig {
    pub fn with_weights(mut self, weights: CellWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_special_enemies(mut self, fraction: f64) -> Self {
        self.special_enemy_fraction = fraction.clamp(0.0, 1.0);
        self
    }

    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Check values that may have bypassed the builders, e.g. through serde.
    pub fn validate(&self) -> Result<(), CoreError> {
        let w = &self.weights;
        let weights = [
            w.empty,
            w.wall,
            w.enemy,
            w.portal,
            w.crack,
            w.moving_platform,
            w.trap,
        ];
        if weights.iter().any(|&x| !x.is_finite() || x < 0.0) {
            return Err(CoreError::InvalidConfig {
                reason: format!("cell weights must be finite and non-negative: {:?}", w),
            });
        }
        if weights.iter().sum::<f64>() <= 0.0 {
            return Err(CoreError::InvalidConfig {
                reason: "cell weights are all zero".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.special_enemy_fraction) {
            return Err(CoreError::InvalidConfig {
                reason: format!(
                    "special_enemy_fraction = {} must lie in [0, 1]",
                    self.special_enemy_fraction
                ),
            });
        }
        if self.max_attempts == 0 {
            return Err(CoreError::InvalidConfig {
                reason: "max_attempts must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Draws random layouts: treasure in the top-left corner, start in the
/// bottom-right corner, one key and one sword somewhere in between, and
/// weighted filler everywhere else.
#[derive(Debug)]
pub struct MapGenerator {
    config: GeneratorConfig,
    rng: StdRng,
}

impl MapGenerator {
    pub fn new(config: GeneratorConfig, seed: u64) -> Result<Self, CoreError> {
        config.validate()?;
        Ok(Self {
            config,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// One random layout; may be unwinnable.
    ///
    /// Needs at least four cells to fit treasure, start, key and sword.
    pub fn draw(&mut self, rows: usize, cols: usize) -> Result<GridMap, CoreError> {
        let size = rows * cols;
        if rows == 0 || cols == 0 || size < 4 {
            return Err(CoreError::InvalidDimensions { rows, cols });
        }

        let mut cells: Vec<Option<CellKind>> = vec![None; size];
        cells[0] = Some(CellKind::Treasure);
        cells[size - 1] = Some(CellKind::Start);

        let mut required = vec![CellKind::Sword, CellKind::Key];
        while let Some(item) = required.last().copied() {
            let pos = self.rng.gen_range(1..size - 1);
            if cells[pos].is_none() {
                cells[pos] = Some(item);
                required.pop();
            }
        }

        let w = &self.config.weights;
        let filler = [
            (CellKind::Empty, w.empty),
            (CellKind::Wall, w.wall),
            (CellKind::Enemy(EnemyKind::Normal), w.enemy),
            (CellKind::Portal, w.portal),
            (CellKind::Crack, w.crack),
            (CellKind::MovingPlatform, w.moving_platform),
            (CellKind::Trap, w.trap),
        ];
        let index = WeightedIndex::new(filler.iter().map(|(_, p)| *p)).map_err(|e| {
            CoreError::InvalidMap {
                reason: format!("bad cell weights: {}", e),
            }
        })?;

        let special = self.config.special_enemy_fraction;
        let cells: Vec<CellKind> = cells
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| match filler[index.sample(&mut self.rng)].0 {
                    CellKind::Enemy(_) if self.rng.gen_bool(special) => {
                        CellKind::Enemy(EnemyKind::Special)
                    }
                    cell => cell,
                })
            })
            .collect();

        GridMap::new(rows, cols, cells)
    }

    /// Draw layouts until one is winnable.
    ///
    /// # Errors
    ///
    /// [`CoreError::GenerationExhausted`] after `max_attempts` rejections.
    pub fn generate(&mut self, rows: usize, cols: usize) -> Result<GridMap, CoreError> {
        for attempt in 1..=self.config.max_attempts {
            let grid = self.draw(rows, cols)?;
            if is_winnable(&grid)? {
                info!(rows, cols, attempt, "generated winnable map");
                return Ok(grid);
            }
            debug!(attempt, "rejected unwinnable map");
        }
        warn!(rows, cols, attempts = self.config.max_attempts, "map generation exhausted");
        Err(CoreError::GenerationExhausted {
            attempts: self.config.max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Coord;

    #[test]
    fn test_draw_respects_invariant() {
        let mut generator = MapGenerator::new(GeneratorConfig::default(), 1).unwrap();
        for _ in 0..20 {
            let grid = generator.draw(4, 5).unwrap();
            assert_eq!(grid.treasure(), Coord::new(0, 0));
            assert_eq!(grid.start(), Coord::new(3, 4));
            assert_eq!(grid.keys().len(), 1);
            assert_eq!(grid.coords_of(CellKind::Sword).len(), 1);
        }
    }

    #[test]
    fn test_generate_is_winnable() {
        let mut generator = MapGenerator::new(GeneratorConfig::default(), 42).unwrap();
        let grid = generator.generate(5, 6).unwrap();
        assert!(is_winnable(&grid).unwrap());
    }

    #[test]
    fn test_same_seed_same_map() {
        let a = MapGenerator::new(GeneratorConfig::default(), 9)
            .unwrap()
            .generate(4, 4)
            .unwrap();
        let b = MapGenerator::new(GeneratorConfig::default(), 9)
            .unwrap()
            .generate(4, 4)
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_too_small_rejected() {
        let mut generator = MapGenerator::new(GeneratorConfig::default(), 0).unwrap();
        assert!(matches!(
            generator.draw(1, 3),
            Err(CoreError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn test_all_walls_exhausts() {
        let weights = CellWeights {
            empty: 0.0,
            wall: 1.0,
            enemy: 0.0,
            portal: 0.0,
            crack: 0.0,
            moving_platform: 0.0,
            trap: 0.0,
        };
        let config = GeneratorConfig::default()
            .with_weights(weights)
            .with_max_attempts(5);
        let mut generator = MapGenerator::new(config, 3).unwrap();
        assert!(matches!(
            generator.generate(4, 4),
            Err(CoreError::GenerationExhausted { attempts: 5 })
        ));
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let config = GeneratorConfig::default().with_special_enemies(0.25);
        let json = serde_json::to_string(&config).unwrap();
        let back: GeneratorConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
    #[test]
    fn test_deserialized_config_is_validated() {
        let json = r#"{
            "weights": {"empty": 0.5, "wall": 0.2, "enemy": 0.1, "portal": 0.05,
                        "crack": 0.05, "moving_platform": 0.05, "trap": 0.05},
            "special_enemy_fraction": 1.5,
            "max_attempts": 10
        }"#;
        let config: GeneratorConfig = serde_json::from_str(json).unwrap();
        assert!(matches!(
            MapGenerator::new(config, 0),
            Err(CoreError::InvalidConfig { .. })
        ));

        let mut weights = CellWeights::default();
        weights.wall = -1.0;
        let config = GeneratorConfig::default().with_weights(weights);
        assert!(matches!(
            MapGenerator::new(config, 0),
            Err(CoreError::InvalidConfig { .. })
        ));
    }
}

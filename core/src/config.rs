use crate::grid::MAX_GRID_SIZE;
use serde::{Deserialize, Serialize};

/// Camera and isometric projection parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ViewConfig {
    /// Full diamond width of one tile in pixels.
    pub iso_tile_width: f64,
    /// Full diamond height of one tile in pixels.
    pub iso_tile_height: f64,
    /// Pixel offset of tile (0, 0) relative to the grid origin.
    pub offset_x: f64,
    pub offset_y: f64,
    /// Canvas point the grid origin is drawn at before panning.
    pub origin_x: f64,
    pub origin_y: f64,
    pub min_scale: f64,
    pub max_scale: f64,
    /// Scale multiplier for one wheel notch away from the player.
    pub zoom_out_ratio: f64,
    /// Scale multiplier for one wheel notch towards the player.
    pub zoom_in_ratio: f64,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            iso_tile_width:  64.0,
            iso_tile_height: 32.0,
            offset_x:        0.0,
            offset_y:        0.0,
            origin_x:        480.0,
            origin_y:        64.0,
            min_scale:       0.5,
            max_scale:       2.5,
            zoom_out_ratio:  0.9,
            zoom_in_ratio:   1.0 / 0.9,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// Edge length of a fresh grid. Expansions grow it in steps of two.
    pub base_grid_size: usize,
    /// Balance of a city that has never been saved.
    pub initial_balance: i64,
    /// Trailing debounce window for remote saves.
    pub save_debounce_ms: i64,
    /// Lifetime of a denial notice.
    pub notice_ttl_ms: i64,
    pub view: ViewConfig,
}

impl EngineConfig {
    /// Load from `<data_dir>/engine.json`.
    /// In tests, use EngineConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/engine.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: EngineConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Config with hardcoded defaults for use in unit tests.
    pub fn default_test() -> Self {
        Self {
            base_grid_size:   16,
            initial_balance:  20_000,
            save_debounce_ms: 1_000,
            notice_ttl_ms:    2_500,
            view:             ViewConfig::default(),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.base_grid_size >= 2 && self.base_grid_size % 2 == 0,
            "base_grid_size must be an even number >= 2, got {}",
            self.base_grid_size
        );
        anyhow::ensure!(
            self.base_grid_size <= MAX_GRID_SIZE,
            "base_grid_size must be <= {MAX_GRID_SIZE}, got {}",
            self.base_grid_size
        );
        anyhow::ensure!(self.initial_balance >= 0, "initial_balance must be >= 0");
        anyhow::ensure!(self.save_debounce_ms >= 0, "save_debounce_ms must be >= 0");
        anyhow::ensure!(self.notice_ttl_ms > 0, "notice_ttl_ms must be > 0");

        let v = &self.view;
        anyhow::ensure!(
            v.iso_tile_width > 0.0 && v.iso_tile_height > 0.0,
            "iso tile dimensions must be positive"
        );
        anyhow::ensure!(
            v.min_scale > 0.0 && v.min_scale <= v.max_scale,
            "scale range [{}, {}] is invalid",
            v.min_scale,
            v.max_scale
        );
        anyhow::ensure!(
            v.zoom_out_ratio > 0.0 && v.zoom_out_ratio < 1.0 && v.zoom_in_ratio > 1.0,
            "zoom ratios must shrink on zoom-out and grow on zoom-in"
        );
        Ok(())
    }
}

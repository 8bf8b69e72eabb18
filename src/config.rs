//! Generator configuration.
//!
//! Handles loading, validating, and merging `config.toml`. The file lives in
//! the data directory next to the content tree and is entirely optional:
//! stock defaults are the base layer and a user file only overrides the keys
//! it names.
//!
//! ## Config File Location
//!
//! ```text
//! data/
//! ├── config.toml      # Optional, overrides stock defaults
//! ├── games/           # Content tree (see `content`)
//! └── result/          # Generated bundle, wiped on every run
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! games_dir = "games"       # Content tree, relative to the data directory
//! result_dir = "result"     # Bundle output, relative to the data directory
//!
//! [grid]
//! min_width = 2             # Page grid bounds, in cards
//! min_height = 2
//! max_width = 10
//! max_height = 7
//!
//! [backside]
//! brightness = -30          # Percent brightness shift of the deck backside
//!
//! [bundle]
//! sort = "name"             # name | name-desc | created | created-desc
//! stamp_created_at = false  # Put "Created at: ..." in the bag description
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::content::SortOrder;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Card codes are `page * 100 + slot`, so a page may never hold more slots
/// than the two low decimal digits can address.
pub const MAX_PAGE_CELLS: u32 = 100;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Generator configuration loaded from `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Content tree location, relative to the data directory.
    pub games_dir: String,
    /// Bundle output location, relative to the data directory.
    pub result_dir: String,
    /// Page grid bounds.
    pub grid: GridConfig,
    /// Backside rendering.
    pub backside: BacksideConfig,
    /// Bundle document settings.
    pub bundle: BundleConfig,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            games_dir: "games".to_string(),
            result_dir: "result".to_string(),
            grid: GridConfig::default(),
            backside: BacksideConfig::default(),
            bundle: BundleConfig::default(),
        }
    }
}

impl GeneratorConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.grid.validate()?;
        if !(-100..=100).contains(&self.backside.brightness) {
            return Err(ConfigError::Validation(
                "backside.brightness must be -100..=100".into(),
            ));
        }
        if self.games_dir.trim().is_empty() || self.result_dir.trim().is_empty() {
            return Err(ConfigError::Validation(
                "games_dir and result_dir must not be empty".into(),
            ));
        }
        Ok(())
    }

    pub fn games_path(&self, data_root: &Path) -> PathBuf {
        data_root.join(&self.games_dir)
    }

    pub fn result_path(&self, data_root: &Path) -> PathBuf {
        data_root.join(&self.result_dir)
    }
}

/// Page grid bounds, measured in cards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GridConfig {
    pub min_width: u32,
    pub min_height: u32,
    pub max_width: u32,
    pub max_height: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            min_width: 2,
            min_height: 2,
            max_width: 10,
            max_height: 7,
        }
    }
}

impl GridConfig {
    /// Cards that fit on one page; the last cell always holds the backside.
    pub fn page_capacity(&self) -> usize {
        (self.max_width * self.max_height - 1) as usize
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_width == 0 || self.min_height == 0 {
            return Err(ConfigError::Validation(
                "grid bounds must be at least 1".into(),
            ));
        }
        if self.min_width > self.max_width || self.min_height > self.max_height {
            return Err(ConfigError::Validation(
                "grid minimums must not exceed maximums".into(),
            ));
        }
        let cells = self.max_width.saturating_mul(self.max_height);
        if cells < 2 {
            return Err(ConfigError::Validation(
                "grid must hold at least one card and the backside".into(),
            ));
        }
        if cells > MAX_PAGE_CELLS {
            return Err(ConfigError::Validation(format!(
                "grid max_width * max_height must be at most {MAX_PAGE_CELLS}"
            )));
        }
        Ok(())
    }
}

/// Backside rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BacksideConfig {
    /// Brightness shift in percent; negative darkens.
    pub brightness: i32,
}

impl Default for BacksideConfig {
    fn default() -> Self {
        Self { brightness: -30 }
    }
}

/// Bundle document settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BundleConfig {
    /// Order in which collections, decks and cards are laid out.
    pub sort: SortOrder,
    /// Stamp the generation time into the bag description. Off by default so
    /// reruns over unchanged content produce identical documents.
    pub stamp_created_at: bool,
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(GeneratorConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if no `config.toml` exists in the directory.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = path.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Load config from `config.toml` in the given data directory.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(root: &Path) -> Result<GeneratorConfig, ConfigError> {
    let merged = match load_raw_config(root)? {
        Some(overlay) => merge_toml(stock_defaults_value(), overlay),
        None => stock_defaults_value(),
    };
    let config: GeneratorConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `config.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Deck Builder Configuration
# ==========================
# All settings are optional. Values shown below are the defaults.
# Place this file at <data>/config.toml. Unknown keys cause an error.

# Content tree, relative to the data directory.
games_dir = "games"

# Bundle output, relative to the data directory.
# WARNING: this directory is deleted and recreated on every generation run.
result_dir = "result"

# ---------------------------------------------------------------------------
# Page grid
# ---------------------------------------------------------------------------
[grid]
# Bounds, in cards, of each generated page image. The bottom-right cell of
# every page holds the deck backside, so a page carries at most
# max_width * max_height - 1 cards. The product may not exceed 100.
min_width = 2
min_height = 2
max_width = 10
max_height = 7

# ---------------------------------------------------------------------------
# Backside
# ---------------------------------------------------------------------------
[backside]
# Brightness shift in percent (-100..=100). Negative values darken.
brightness = -30

# ---------------------------------------------------------------------------
# Bundle document
# ---------------------------------------------------------------------------
[bundle]
# Layout order for collections, decks and cards:
# "name", "name-desc", "created" or "created-desc".
sort = "name"

# Add "Created at: <timestamp>" to the bag description.
stamp_created_at = false
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_matches_stock_grid() {
        let config = GeneratorConfig::default();
        assert_eq!(config.grid.min_width, 2);
        assert_eq!(config.grid.min_height, 2);
        assert_eq!(config.grid.max_width, 10);
        assert_eq!(config.grid.max_height, 7);
        assert_eq!(config.grid.page_capacity(), 69);
        assert_eq!(config.backside.brightness, -30);
        assert_eq!(config.bundle.sort, SortOrder::Name);
        assert!(!config.bundle.stamp_created_at);
    }

    #[test]
    fn stock_config_toml_parses_to_defaults() {
        let config: GeneratorConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(config.grid, GridConfig::default());
        assert_eq!(config.games_dir, "games");
        assert_eq!(config.result_dir, "result");
        config.validate().unwrap();
    }

    #[test]
    fn parse_partial_config() {
        let config: GeneratorConfig = toml::from_str(
            r#"
[grid]
max_width = 8
"#,
        )
        .unwrap();
        assert_eq!(config.grid.max_width, 8);
        assert_eq!(config.grid.max_height, 7);
        assert_eq!(config.backside.brightness, -30);
    }

    #[test]
    fn parse_sort_order() {
        let config: GeneratorConfig = toml::from_str(
            r#"
[bundle]
sort = "created-desc"
"#,
        )
        .unwrap();
        assert_eq!(config.bundle.sort, SortOrder::CreatedDesc);
    }

    #[test]
    fn unknown_key_rejected() {
        let result: Result<GeneratorConfig, _> = toml::from_str(
            r#"
[grid]
max_widht = 8
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.grid, GridConfig::default());
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("config.toml"),
            r#"
result_dir = "out"

[backside]
brightness = -50
"#,
        )
        .unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.result_dir, "out");
        assert_eq!(config.backside.brightness, -50);
        assert_eq!(config.games_dir, "games");
        assert_eq!(config.result_path(tmp.path()), tmp.path().join("out"));
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("config.toml"), "not valid toml [[[").unwrap();
        assert!(matches!(load_config(tmp.path()), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn load_config_rejects_invalid_values() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("config.toml"),
            r#"
[grid]
min_width = 5
max_width = 4
"#,
        )
        .unwrap();
        assert!(matches!(
            load_config(tmp.path()),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn grid_validation_rules() {
        let zero = GridConfig {
            min_width: 0,
            ..GridConfig::default()
        };
        assert!(zero.validate().is_err());

        let single_cell = GridConfig {
            min_width: 1,
            min_height: 1,
            max_width: 1,
            max_height: 1,
        };
        assert!(single_cell.validate().is_err());

        let too_large = GridConfig {
            max_width: 11,
            max_height: 10,
            ..GridConfig::default()
        };
        assert!(too_large.validate().is_err());

        let exactly_hundred = GridConfig {
            max_width: 10,
            max_height: 10,
            ..GridConfig::default()
        };
        assert!(exactly_hundred.validate().is_ok());
    }

    #[test]
    fn brightness_out_of_range_rejected() {
        let mut config = GeneratorConfig::default();
        config.backside.brightness = -101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn merge_toml_preserves_base_keys() {
        let base: toml::Value = toml::from_str(
            r#"
[grid]
max_width = 10
max_height = 7
"#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
[grid]
max_width = 6
"#,
        )
        .unwrap();
        let merged = merge_toml(base, overlay);
        let grid = merged.get("grid").unwrap();
        assert_eq!(grid.get("max_width").unwrap().as_integer(), Some(6));
        assert_eq!(grid.get("max_height").unwrap().as_integer(), Some(7));
    }
}

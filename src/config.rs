//! Batch configuration module.
//!
//! Handles loading, validating, and merging `pixbatch.toml`. Stock defaults
//! are overridden by whatever the user file sets; command-line flags then
//! override the merged result.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [resize]
//! target = "3500x3500"      # Used when --resize is given without --size
//! presets = ["1000x1000", "1500x1500", "2000x2000", "2500x2500", "3000x3000", "3500x3500"]
//!
//! [output]
//! format = "JPEG"           # JPEG | JPEG2000 | PNG
//! quality = 90              # JPEG quality (1-100)
//!
//! [background]
//! model = "models/u2net.onnx"
//! input_size = 320          # Square side the model expects
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse. Override just the values you want:
//!
//! ```toml
//! [output]
//! format = "PNG"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::types::{OutputFormat, ResizeTarget};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_FILE: &str = "pixbatch.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `pixbatch.toml`.
///
/// All fields have defaults. User config files need only specify the values
/// they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatchConfig {
    /// Resize target and the preset list offered to users.
    pub resize: ResizeConfig,
    /// Output encoding.
    pub output: OutputConfig,
    /// Segmentation model settings.
    pub background: BackgroundConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl BatchConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.output.quality) {
            return Err(ConfigError::Validation(
                "output.quality must be 1-100".into(),
            ));
        }
        if self.background.input_size == 0 {
            return Err(ConfigError::Validation(
                "background.input_size must be non-zero".into(),
            ));
        }
        if self.resize.presets.is_empty() {
            return Err(ConfigError::Validation(
                "resize.presets must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel image processing workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// Resize settings. Sizes are `WxH` strings, parsed on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResizeConfig {
    pub target: ResizeTarget,
    pub presets: Vec<ResizeTarget>,
}

impl Default for ResizeConfig {
    fn default() -> Self {
        let presets: Vec<ResizeTarget> = (1000..=3500)
            .step_by(500)
            .map(|side| ResizeTarget {
                width: side,
                height: side,
            })
            .collect();
        Self {
            target: ResizeTarget {
                width: 3500,
                height: 3500,
            },
            presets,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub format: OutputFormat,
    /// JPEG quality (1 = worst, 100 = best).
    pub quality: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Jpeg,
            quality: 90,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackgroundConfig {
    /// Path to the U²-Net ONNX model. Relative paths resolve against the
    /// working directory.
    pub model: PathBuf,
    pub input_size: u32,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            model: PathBuf::from("models/u2net.onnx"),
            input_size: 320,
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged onto.
pub fn stock_defaults_value() -> toml::Value {
    match toml::Value::try_from(BatchConfig::default()) {
        Ok(value) => value,
        Err(_) => toml::Value::Table(toml::map::Map::new()),
    }
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

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto the stock defaults, then deserialize and validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<BatchConfig, ConfigError> {
    let base = stock_defaults_value();
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: BatchConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`, falling back to stock defaults when it is missing.
pub fn load_config(path: &Path) -> Result<BatchConfig, ConfigError> {
    let overlay = load_raw_config(path)?;
    if overlay.is_some() {
        log::debug!("Loaded config from {}", path.display());
    }
    resolve_config(overlay)
}

/// Returns a fully-commented stock `pixbatch.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# pixbatch Configuration
# ======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Resize
# ---------------------------------------------------------------------------
[resize]
# Exact output size for --resize when no --size is given. Downscale only:
# the resize happens only when both sides are smaller than the image.
target = "3500x3500"

# Sizes listed by `pixbatch presets`.
presets = ["1000x1000", "1500x1500", "2000x2000", "2500x2500", "3000x3000", "3500x3500"]

# ---------------------------------------------------------------------------
# Output
# ---------------------------------------------------------------------------
[output]
# JPEG     -> .jpg, RGB
# JPEG2000 -> .jpg, RGBA, lossless JP2
# PNG      -> .png, color mode unchanged
format = "JPEG"

# JPEG encoding quality (1 = worst, 100 = best).
quality = 90

# ---------------------------------------------------------------------------
# Background removal
# ---------------------------------------------------------------------------
[background]
# U2-Net ONNX model, loaded once on first use.
model = "models/u2net.onnx"

# Square side of the model input tensor.
input_size = 320

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel image-processing workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}

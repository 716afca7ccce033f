//! Loader configuration module.
//!
//! Handles loading, validating, and layering the loader configuration. Values
//! come from three layers, each overriding the previous one:
//!
//! ```text
//! stock defaults  →  planar-load.toml  →  command-line flags
//! ```
//!
//! The resolved [`LoaderConfig`] is an immutable value handed by reference to
//! both the [`FileSelector`](crate::select::FileSelector) and the
//! [`ImageCorrector`](crate::correct::ImageCorrector). Nothing reads it through
//! a global.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! source_dir = "."              # Directory holding the detector images
//! # background_file = "dark.tif"  # Dark/background frame (omit to disable)
//!
//! [selection]
//! include = ["*.tif"]           # A file must match ANY of these
//! exclude = ["*.dark.tif", "*.raw.tif"]  # A file matching ANY of these is dropped
//! filenames = []                # Optional allow-list, applied last
//!
//! [orientation]
//! flip_horizontal = false       # Reverse column order
//! flip_vertical = false         # Reverse row order
//!
//! [detector]
//! # xdimension = 2048           # Columns; set together with ydimension
//! # ydimension = 2048           # Rows
//!
//! [processing]
//! # max_processes = 4           # Parallel loaders (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the config file picked up from the working directory when no
/// explicit path is given.
pub const CONFIG_FILE_NAME: &str = "planar-load.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Loader configuration.
///
/// All fields have defaults. User config files need only specify the values
/// they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoaderConfig {
    /// Directory that relative image names are resolved against, and the
    /// default directory for file selection.
    pub source_dir: PathBuf,
    /// Background (dark) frame subtracted from every loaded image.
    /// An absent, empty, or nonexistent path disables background correction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_file: Option<PathBuf>,
    /// Default include/exclude/allow-list patterns.
    pub selection: SelectionConfig,
    /// Detector mounting orientation.
    pub orientation: Orientation,
    /// Expected detector frame size.
    pub detector: DetectorConfig,
    /// Parallel loading settings.
    pub processing: ProcessingConfig,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("."),
            background_file: None,
            selection: SelectionConfig::default(),
            orientation: Orientation::default(),
            detector: DetectorConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl LoaderConfig {
    /// The configured background path, treating an empty string as unset.
    pub fn background_path(&self) -> Option<&Path> {
        self.background_file
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
    }

    /// Validate patterns compile and detector dimensions are coherent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let lists = [
            ("selection.include", &self.selection.include),
            ("selection.exclude", &self.selection.exclude),
            ("selection.filenames", &self.selection.filenames),
        ];
        for (key, patterns) in lists {
            for pattern in patterns {
                crate::select::name_pattern(pattern).map_err(|e| {
                    ConfigError::Validation(format!("{key}: invalid pattern {pattern:?}: {e}"))
                })?;
            }
        }

        match (self.detector.xdimension, self.detector.ydimension) {
            (Some(0), _) | (_, Some(0)) => Err(ConfigError::Validation(
                "detector dimensions must be non-zero".into(),
            )),
            (Some(_), None) | (None, Some(_)) => Err(ConfigError::Validation(
                "detector.xdimension and detector.ydimension must be set together".into(),
            )),
            _ => Ok(()),
        }
    }
}

/// Filename selection rules.
///
/// All three lists are shell-glob patterns matched case-sensitively against
/// bare file names (no directory part).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SelectionConfig {
    /// A file qualifies if it matches any of these.
    pub include: Vec<String>,
    /// A qualifying file is dropped if it matches any of these.
    pub exclude: Vec<String>,
    /// Optional allow-list applied after include/exclude. Empty means no
    /// further filtering.
    pub filenames: Vec<String>,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            include: vec!["*.tif".to_string()],
            exclude: vec!["*.dark.tif".to_string(), "*.raw.tif".to_string()],
            filenames: Vec::new(),
        }
    }
}

/// Orientation flips applied to every loaded image and to the background.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Orientation {
    /// Reverse column order.
    pub flip_horizontal: bool,
    /// Reverse row order.
    pub flip_vertical: bool,
}

/// Expected detector frame size. Both unset means "accept any shape".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DetectorConfig {
    /// Number of columns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xdimension: Option<usize>,
    /// Number of rows.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ydimension: Option<usize>,
}

impl DetectorConfig {
    /// Expected `(rows, cols)` shape, when configured.
    pub fn shape(&self) -> Option<(usize, usize)> {
        Some((self.ydimension?, self.xdimension?))
    }
}

/// Parallel loading settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel loaders.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    #[serde(skip_serializing_if = "Option::is_none")]
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

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// Base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(LoaderConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely, so a pattern
///   list in the overlay replaces the default list rather than extending it.
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

/// Read a config file as a raw TOML value.
///
/// Unlike the stock defaults, a file that was asked for must exist.
pub fn load_raw_config(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(value)
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<LoaderConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: LoaderConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the configuration.
///
/// Layers the optional config file over the stock defaults, then the
/// optional `overrides` (typically built from command-line flags) over that.
/// Rejects unknown keys and validates the result.
pub fn load_config(
    path: Option<&Path>,
    overrides: Option<toml::Value>,
) -> Result<LoaderConfig, ConfigError> {
    let mut base = stock_defaults_value();
    if let Some(path) = path {
        base = merge_toml(base, load_raw_config(path)?);
    }
    resolve_config(base, overrides)
}

/// Returns a fully-commented stock config file with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# planar-load configuration
# =========================
#
# Every key is optional; the values below are the built-in defaults.
# Command-line flags override whatever is set here.

# Directory holding the detector images. Relative image names passed to the
# loader are resolved against it, and file selection lists it by default.
source_dir = "."

# Background (dark) frame. It is oriented like every other image and then
# subtracted element-wise from each loaded frame. When the file does not
# exist, background correction is disabled and a warning is logged.
# background_file = "dark.tif"

[selection]
# Shell-glob patterns (*, ?, [abc], [!abc]) matched case-sensitively against
# file names in source_dir.
#
# A file is selected if it matches ANY include pattern...
include = ["*.tif"]
# ...and is dropped again if it matches ANY exclude pattern.
exclude = ["*.dark.tif", "*.raw.tif"]
# Optional allow-list applied last: when non-empty, only selected files that
# match ANY of these survive.
filenames = []

[orientation]
# Normalize detector mounting. Horizontal flips are applied before
# vertical ones.
flip_horizontal = false
flip_vertical = false

[detector]
# Expected frame size in pixels. When both are set, frames of any other
# shape are rejected.
# xdimension = 2048
# ydimension = 2048

[processing]
# Maximum parallel loaders. Omit to use every CPU core; larger values are
# clamped to the core count.
# max_processes = 4
"##
}

//! User configuration – reads/writes `~/.trcbridge/config.toml`.
//!
//! Effective settings are layered: built-in defaults, then the config file,
//! then `TRCBRIDGE_*` environment variables, then command-line flags (applied
//! by `main`).

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use trcbridge_ingest::ExportLayout;
use trcbridge_transform::{AxisRemap, ConventionGraph, LengthUnit, RemapError};
use trcbridge_transform::convention::{OPENSIM, VISUAL3D};
use trcbridge_writer::{AxisLabelStyle, EmptyMarkerPolicy, PresenceRule, TrcOptions};

/// Configuration problems.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config at {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("failed to write config at {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config already exists at {} (use --force to overwrite)", .0.display())]
    AlreadyExists(PathBuf),

    #[error(transparent)]
    Remap(#[from] RemapError),

    #[error("no axis remap known from {from:?} to {to:?} (known conventions: {known})")]
    UnknownConvention {
        from: String,
        to: String,
        known: String,
    },
}

/// Persisted settings stored in `~/.trcbridge/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding `{subject}_landmarks.tsv` and `{subject}_targets.tsv`.
    #[serde(default = "default_dir")]
    pub data_dir: PathBuf,

    /// Directory receiving the `.trc` file.
    #[serde(default = "default_dir")]
    pub output_dir: PathBuf,

    /// Appended to the output stem as `{subject}_{suffix}.trc`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_suffix: Option<String>,

    #[serde(default = "default_frame_rate")]
    pub frame_rate: f64,

    /// Header convention of the exports.
    #[serde(default)]
    pub layout: ExportLayout,

    /// Origin tag to keep when the tagged export holds several recordings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,

    #[serde(default)]
    pub axis_labels: AxisLabelStyle,

    /// Output length unit.
    #[serde(default = "default_units")]
    pub units: LengthUnit,

    /// Explicit remap such as `"x,z,-y"`; wins over the convention pair.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remap: Option<String>,

    #[serde(default = "default_source_convention")]
    pub source_convention: String,

    #[serde(default = "default_target_convention")]
    pub target_convention: String,

    #[serde(default)]
    pub empty_markers: EmptyMarkerPolicy,

    #[serde(default)]
    pub presence: PresenceRule,

    #[serde(default = "default_time_precision")]
    pub time_precision: usize,

    #[serde(default = "default_coordinate_precision")]
    pub coordinate_precision: usize,
}

fn default_dir() -> PathBuf {
    PathBuf::from(".")
}
fn default_frame_rate() -> f64 {
    100.0
}
fn default_units() -> LengthUnit {
    LengthUnit::Millimeters
}
fn default_source_convention() -> String {
    VISUAL3D.to_string()
}
fn default_target_convention() -> String {
    OPENSIM.to_string()
}
fn default_time_precision() -> usize {
    4
}
fn default_coordinate_precision() -> usize {
    6
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_dir(),
            output_dir: default_dir(),
            output_suffix: None,
            frame_rate: default_frame_rate(),
            layout: ExportLayout::default(),
            origin: None,
            axis_labels: AxisLabelStyle::default(),
            units: default_units(),
            remap: None,
            source_convention: default_source_convention(),
            target_convention: default_target_convention(),
            empty_markers: EmptyMarkerPolicy::default(),
            presence: PresenceRule::default(),
            time_precision: default_time_precision(),
            coordinate_precision: default_coordinate_precision(),
        }
    }
}

impl Config {
    /// The remap to apply: the explicit `remap` string if set, otherwise the
    /// composed remap between the two named conventions.
    pub fn axis_remap(&self) -> Result<AxisRemap, ConfigError> {
        if let Some(raw) = &self.remap {
            return Ok(raw.parse::<AxisRemap>()?);
        }
        let graph = ConventionGraph::builtin();
        graph
            .lookup(&self.source_convention, &self.target_convention)
            .ok_or_else(|| ConfigError::UnknownConvention {
                from: self.source_convention.clone(),
                to: self.target_convention.clone(),
                known: graph.conventions().join(", "),
            })
    }

    /// Writer options for these settings.  Exports are always in meters.
    pub fn trc_options(&self) -> Result<TrcOptions, ConfigError> {
        Ok(TrcOptions {
            frame_rate: self.frame_rate,
            source_unit: LengthUnit::Meters,
            output_unit: self.units,
            remap: self.axis_remap()?,
            axis_labels: self.axis_labels,
            presence: self.presence,
            empty_markers: self.empty_markers,
            time_precision: self.time_precision,
            coordinate_precision: self.coordinate_precision,
        })
    }
}

/// Return the path to `~/.trcbridge/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".trcbridge").join("config.toml")
}

/// Load the config file at `path`.  Returns `None` if it does not exist.
pub fn load_from(path: &Path) -> Result<Option<Config>, ConfigError> {
    if !path.exists() {
        debug!(path = %path.display(), "no config file");
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let cfg = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(cfg))
}

/// File (or defaults) plus environment overrides.
pub fn load_effective(path: &Path) -> Result<Config, ConfigError> {
    let mut cfg = load_from(path)?.unwrap_or_default();
    apply_env_overrides(&mut cfg);
    Ok(cfg)
}

/// Apply `TRCBRIDGE_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `TRCBRIDGE_DATA_DIR` | `data_dir` |
/// | `TRCBRIDGE_OUTPUT_DIR` | `output_dir` |
/// | `TRCBRIDGE_FRAME_RATE` | `frame_rate` |
/// | `TRCBRIDGE_UNITS` | `units` |
/// | `TRCBRIDGE_LAYOUT` | `layout` |
///
/// Unparsable numeric or enum values are ignored with a warning.
pub fn apply_env_overrides(cfg: &mut Config) {
    apply_overrides(cfg, |key| std::env::var(key).ok());
}

fn apply_overrides(cfg: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("TRCBRIDGE_DATA_DIR") {
        cfg.data_dir = PathBuf::from(v);
    }
    if let Some(v) = var("TRCBRIDGE_OUTPUT_DIR") {
        cfg.output_dir = PathBuf::from(v);
    }
    if let Some(v) = var("TRCBRIDGE_FRAME_RATE") {
        match v.parse::<f64>() {
            Ok(rate) => cfg.frame_rate = rate,
            Err(_) => warn!(value = %v, "ignoring unparsable TRCBRIDGE_FRAME_RATE"),
        }
    }
    if let Some(v) = var("TRCBRIDGE_UNITS") {
        match v.parse() {
            Ok(units) => cfg.units = units,
            Err(e) => warn!(error = %e, "ignoring TRCBRIDGE_UNITS"),
        }
    }
    if let Some(v) = var("TRCBRIDGE_LAYOUT") {
        match v.parse() {
            Ok(layout) => cfg.layout = layout,
            Err(e) => warn!(error = %e, "ignoring TRCBRIDGE_LAYOUT"),
        }
    }
}

/// Write `cfg` to `path`, creating the parent directory.  Refuses to
/// replace an existing file unless `force` is set.
pub fn save_to(cfg: &Config, path: &Path, force: bool) -> Result<(), ConfigError> {
    if path.exists() && !force {
        return Err(ConfigError::AlreadyExists(path.to_path_buf()));
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let raw = to_toml(cfg)?;
    fs::write(path, raw).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}

pub fn to_toml(cfg: &Config) -> Result<String, ConfigError> {
    Ok(toml::to_string_pretty(cfg)?)
}

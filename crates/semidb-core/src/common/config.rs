//! Dataset locations and query defaults.
//!
//! Loaded from a camelCase JSON file; every field is optional and falls back
//! to the layout the database has always shipped with.

use crate::domain::DEFAULT_FUNCTIONAL;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_COMPOSITION_TOLERANCE: f64 = 1.0e-6;
pub const DEFAULT_CURVE_SAMPLES: usize = 200;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatabaseConfig {
    pub convergence_path: PathBuf,
    pub ev_points_path: PathBuf,
    pub vinet_fit_path: PathBuf,
    pub alloy_path: PathBuf,
    pub composition_tolerance: f64,
    pub default_functional: String,
    pub curve_samples: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            convergence_path: PathBuf::from("convergence"),
            ev_points_path: PathBuf::from("e_v_data.csv"),
            vinet_fit_path: PathBuf::from("vinet_fit_summary.csv"),
            alloy_path: PathBuf::from("alloy"),
            composition_tolerance: DEFAULT_COMPOSITION_TOLERANCE,
            default_functional: DEFAULT_FUNCTIONAL.to_string(),
            curve_samples: DEFAULT_CURVE_SAMPLES,
        }
    }
}

impl DatabaseConfig {
    /// Rebases relative dataset paths onto `base`.
    pub fn resolve_against(mut self, base: &Path) -> Self {
        for path in [
            &mut self.convergence_path,
            &mut self.ev_points_path,
            &mut self.vinet_fit_path,
            &mut self.alloy_path,
        ] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read database config '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse database config '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid database config '{}': {message}", path.display())]
    Invalid { path: PathBuf, message: String },
}

pub fn load_database_config(config_path: impl AsRef<Path>) -> Result<DatabaseConfig, ConfigError> {
    let config_path = config_path.as_ref();
    let source = fs::read_to_string(config_path).map_err(|source| ConfigError::Read {
        path: config_path.to_path_buf(),
        source,
    })?;
    let config: DatabaseConfig =
        serde_json::from_str(&source).map_err(|source| ConfigError::Parse {
            path: config_path.to_path_buf(),
            source,
        })?;

    if !(config.composition_tolerance.is_finite() && config.composition_tolerance >= 0.0) {
        return Err(ConfigError::Invalid {
            path: config_path.to_path_buf(),
            message: format!(
                "compositionTolerance must be a non-negative number, got {}",
                config.composition_tolerance
            ),
        });
    }

    Ok(config)
}

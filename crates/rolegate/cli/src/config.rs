//! CLI configuration

use crate::error::{CliError, CliResult};
use rolegate_enforcer::EnforcerConfig;
use rolegate_store::StoreConfig;
use rolegate_types::MarkerAttributes;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration, read from TOML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RolegateConfig {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub enforcer: EnforcerConfig,

    /// Attribute names of marker declarations
    #[serde(default)]
    pub markers: MarkerAttributes,

    #[serde(default)]
    pub scan: ScanConfig,
}

/// Which files `scan` reads when given a directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
        }
    }
}

fn default_extensions() -> Vec<String> {
    ["html", "htm", "vue", "jsx", "tsx"]
        .iter()
        .map(|e| e.to_string())
        .collect()
}

impl RolegateConfig {
    /// Load configuration from `path`, or from the user config directory.
    /// A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> CliResult<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_config_path() {
                Some(p) => p,
                None => return Ok(Self::default()),
            },
        };

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;
        toml::from_str(&contents)
            .map_err(|e| CliError::Config(format!("{}: {}", config_path.display(), e)))
    }

    fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("rolegate").join("config.toml"))
    }
}

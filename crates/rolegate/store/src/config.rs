//! Store configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where and how the access configuration is persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path of the JSON record
    #[serde(default = "default_path")]
    pub path: PathBuf,

    /// Write the default skeleton when the record is missing or empty
    #[serde(default = "default_true")]
    pub persist_defaults: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            persist_defaults: true,
        }
    }
}

fn default_path() -> PathBuf {
    PathBuf::from("access-config.json")
}

fn default_true() -> bool {
    true
}

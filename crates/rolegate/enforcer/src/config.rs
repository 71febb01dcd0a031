//! Enforcer configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Decision when no access configuration has been loaded
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingConfigPolicy {
    /// Deny every marker
    #[default]
    FailClosed,
    /// Allow every marker
    FailOpen,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnforcerConfig {
    /// Quiet period before newly observed markers are persisted
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    #[serde(default)]
    pub missing_config: MissingConfigPolicy,
}

impl EnforcerConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for EnforcerConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            missing_config: MissingConfigPolicy::default(),
        }
    }
}

fn default_debounce_ms() -> u64 {
    100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_fail_closed() {
        let config = EnforcerConfig::default();
        assert_eq!(config.debounce(), Duration::from_millis(100));
        assert_eq!(config.missing_config, MissingConfigPolicy::FailClosed);
    }
}

//! Explicit authorization state owned by the composition root

use std::collections::BTreeSet;
use std::sync::RwLock;

use rolegate_types::{AccessConfig, MarkerForest, MarkerId, Principal, RoleId};
use serde::{Deserialize, Serialize};

use crate::config::MissingConfigPolicy;
use crate::error::{EnforcerError, EnforcerResult};

/// Observable state of the enforcer
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "role", rename_all = "snake_case")]
pub enum EnforcerState {
    Uninitialized,
    LoadedNoSession,
    LoadedSession(RoleId),
}

/// A frozen access decision for one sweep
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccessDecider {
    AllowAll,
    DenyAll,
    AllowList(BTreeSet<MarkerId>),
}

impl AccessDecider {
    pub fn allows(&self, marker: &str) -> bool {
        match self {
            AccessDecider::AllowAll => true,
            AccessDecider::DenyAll => false,
            AccessDecider::AllowList(markers) => markers.contains(marker),
        }
    }
}

/// Loaded configuration plus the active principal
pub struct AuthorizationContext {
    config: RwLock<Option<AccessConfig>>,
    principal: RwLock<Option<Principal>>,
    policy: MissingConfigPolicy,
}

impl AuthorizationContext {
    pub fn new(policy: MissingConfigPolicy) -> Self {
        Self {
            config: RwLock::new(None),
            principal: RwLock::new(None),
            policy,
        }
    }

    pub fn policy(&self) -> MissingConfigPolicy {
        self.policy
    }

    pub fn install_config(&self, config: AccessConfig) -> EnforcerResult<()> {
        let mut slot = self.config.write().map_err(|_| EnforcerError::LockError)?;
        *slot = Some(config);
        Ok(())
    }

    pub fn config_snapshot(&self) -> EnforcerResult<Option<AccessConfig>> {
        let slot = self.config.read().map_err(|_| EnforcerError::LockError)?;
        Ok(slot.clone())
    }

    /// Swap in a rescanned marker forest, leaving roles and access alone.
    /// Returns false when no configuration is loaded.
    pub fn replace_markers(&self, markers: MarkerForest) -> EnforcerResult<bool> {
        let mut slot = self.config.write().map_err(|_| EnforcerError::LockError)?;
        match slot.as_mut() {
            Some(config) => {
                config.markers = markers;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn set_principal(&self, principal: Option<Principal>) -> EnforcerResult<()> {
        let mut slot = self.principal.write().map_err(|_| EnforcerError::LockError)?;
        *slot = principal;
        Ok(())
    }

    pub fn principal(&self) -> EnforcerResult<Option<Principal>> {
        let slot = self.principal.read().map_err(|_| EnforcerError::LockError)?;
        Ok(slot.clone())
    }

    /// Decision for a single marker.
    ///
    /// No configuration: the missing-config policy. Configuration but no
    /// principal: deny. Otherwise the principal's role allow-list.
    pub fn check_access(&self, marker: &str) -> bool {
        self.decider().map(|d| d.allows(marker)).unwrap_or(false)
    }

    pub fn decider(&self) -> EnforcerResult<AccessDecider> {
        let config = self.config.read().map_err(|_| EnforcerError::LockError)?;
        let Some(config) = config.as_ref() else {
            return Ok(match self.policy {
                MissingConfigPolicy::FailOpen => AccessDecider::AllowAll,
                MissingConfigPolicy::FailClosed => AccessDecider::DenyAll,
            });
        };

        let principal = self.principal.read().map_err(|_| EnforcerError::LockError)?;
        let Some(principal) = principal.as_ref() else {
            return Ok(AccessDecider::DenyAll);
        };

        Ok(match config.allowed_markers(principal.role.as_str()) {
            Some(markers) => AccessDecider::AllowList(markers.clone()),
            None => AccessDecider::DenyAll,
        })
    }

    /// Decider for a full sweep: without a principal every fragment goes
    pub fn sweep_decider(&self) -> EnforcerResult<AccessDecider> {
        if self.principal()?.is_none() {
            return Ok(AccessDecider::DenyAll);
        }
        self.decider()
    }

    pub fn state(&self) -> EnforcerState {
        let loaded = self.config.read().map(|c| c.is_some()).unwrap_or(false);
        if !loaded {
            return EnforcerState::Uninitialized;
        }
        match self.principal() {
            Ok(Some(principal)) => EnforcerState::LoadedSession(principal.role),
            _ => EnforcerState::LoadedNoSession,
        }
    }

    /// Drop the configuration and the principal
    pub fn clear(&self) -> EnforcerResult<()> {
        *self.config.write().map_err(|_| EnforcerError::LockError)? = None;
        *self.principal.write().map_err(|_| EnforcerError::LockError)? = None;
        Ok(())
    }
}

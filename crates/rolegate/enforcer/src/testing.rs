//! Scripted config client for unit tests

use std::sync::Mutex;

use async_trait::async_trait;
use rolegate_service::{has_any_role, has_role, ConfigClient, ServiceError, ServiceResult};
use rolegate_types::{AccessConfig, AccessMap, MarkerForest, Principal, RoleId};

pub(crate) struct ScriptedClient {
    config: Mutex<AccessConfig>,
    fail_load: bool,
    pub updates: Mutex<Vec<MarkerForest>>,
}

impl ScriptedClient {
    pub fn new(access: AccessMap) -> Self {
        let mut config = AccessConfig::skeleton();
        for (role, markers) in access {
            config.roles.entry(role.clone()).or_default();
            config.access.set(role, markers);
        }
        Self {
            config: Mutex::new(config),
            fail_load: false,
            updates: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_load: true,
            ..Self::new(AccessMap::new())
        }
    }

    pub fn update_count(&self) -> usize {
        self.updates.lock().unwrap().len()
    }

    pub fn last_update(&self) -> Option<MarkerForest> {
        self.updates.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ConfigClient for ScriptedClient {
    async fn load_config(&self) -> ServiceResult<AccessConfig> {
        if self.fail_load {
            return Err(ServiceError::Closed);
        }
        Ok(self.config.lock().unwrap().clone())
    }

    async fn update_access(&self, access: AccessMap) -> ServiceResult<Vec<String>> {
        let mut config = self.config.lock().unwrap();
        for (role, markers) in access {
            config.access.set(role, markers);
        }
        Ok(Vec::new())
    }

    async fn update_markers(&self, markers: MarkerForest) -> ServiceResult<AccessConfig> {
        self.updates.lock().unwrap().push(markers.clone());
        let mut config = self.config.lock().unwrap();
        config.markers = markers;
        Ok(config.clone())
    }

    async fn has_role(&self, principal: Option<&Principal>, role: &RoleId) -> ServiceResult<bool> {
        Ok(has_role(principal, role.as_str()))
    }

    async fn has_any_role(
        &self,
        principal: Option<&Principal>,
        roles: &[RoleId],
    ) -> ServiceResult<bool> {
        Ok(has_any_role(principal, roles))
    }
}

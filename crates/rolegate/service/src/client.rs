//! Caller side of the config service

use async_trait::async_trait;
use rolegate_types::{AccessConfig, AccessMap, MarkerForest, Principal, RoleId};
use tokio::sync::{mpsc, oneshot};

use crate::error::{ServiceError, ServiceResult};
use crate::protocol::{ConfigRequest, ServiceReply};
use crate::service::Envelope;

/// Operations a view process may ask of the config service
#[async_trait]
pub trait ConfigClient: Send + Sync {
    async fn load_config(&self) -> ServiceResult<AccessConfig>;

    /// Merge-only permission edit; returns the per-role log
    async fn update_access(&self, access: AccessMap) -> ServiceResult<Vec<String>>;

    async fn update_markers(&self, markers: MarkerForest) -> ServiceResult<AccessConfig>;

    async fn has_role(&self, principal: Option<&Principal>, role: &RoleId) -> ServiceResult<bool>;

    async fn has_any_role(
        &self,
        principal: Option<&Principal>,
        roles: &[RoleId],
    ) -> ServiceResult<bool>;
}

/// Channel handle to a spawned [`ConfigService`](crate::ConfigService)
#[derive(Clone)]
pub struct ServiceHandle {
    tx: mpsc::Sender<Envelope>,
}

impl ServiceHandle {
    pub(crate) fn new(tx: mpsc::Sender<Envelope>) -> Self {
        Self { tx }
    }

    /// Send one request and wait for its reply.
    ///
    /// `ok: false` replies become [`ServiceError::Remote`].
    pub async fn call(&self, request: &ConfigRequest) -> ServiceResult<ServiceReply> {
        let frame = serde_json::to_string(request)?;
        let (reply_tx, reply_rx) = oneshot::channel();

        self.tx
            .send(Envelope {
                frame,
                reply: reply_tx,
            })
            .await
            .map_err(|_| ServiceError::Closed)?;

        let frame = reply_rx.await.map_err(|_| ServiceError::Closed)?;
        let reply: ServiceReply = serde_json::from_str(&frame)?;

        if !reply.ok {
            return Err(ServiceError::Remote(
                reply.error.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }
        Ok(reply)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[async_trait]
impl ConfigClient for ServiceHandle {
    async fn load_config(&self) -> ServiceResult<AccessConfig> {
        self.call(&ConfigRequest::LoadConfig)
            .await?
            .config
            .ok_or(ServiceError::MissingField("config"))
    }

    async fn update_access(&self, access: AccessMap) -> ServiceResult<Vec<String>> {
        let reply = self.call(&ConfigRequest::UpdateAccess { access }).await?;
        Ok(reply.log.unwrap_or_default())
    }

    async fn update_markers(&self, markers: MarkerForest) -> ServiceResult<AccessConfig> {
        self.call(&ConfigRequest::UpdateMarkers { markers })
            .await?
            .config
            .ok_or(ServiceError::MissingField("config"))
    }

    async fn has_role(&self, principal: Option<&Principal>, role: &RoleId) -> ServiceResult<bool> {
        let request = ConfigRequest::HasRole {
            principal: principal.cloned(),
            role: role.clone(),
        };
        self.call(&request)
            .await?
            .result
            .ok_or(ServiceError::MissingField("result"))
    }

    async fn has_any_role(
        &self,
        principal: Option<&Principal>,
        roles: &[RoleId],
    ) -> ServiceResult<bool> {
        let request = ConfigRequest::HasAnyRole {
            principal: principal.cloned(),
            roles: roles.to_vec(),
        };
        self.call(&request)
            .await?
            .result
            .ok_or(ServiceError::MissingField("result"))
    }
}

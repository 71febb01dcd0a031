//! Request loop in front of the store

use std::sync::Arc;

use rolegate_store::AccessConfigStore;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::client::ServiceHandle;
use crate::protocol::{ConfigRequest, ServiceReply};
use crate::roles::{has_any_role, has_role};

/// A request frame and the slot its reply frame goes to
pub(crate) struct Envelope {
    pub frame: String,
    pub reply: oneshot::Sender<String>,
}

/// The privileged side: owns the store and answers requests
pub struct ConfigService {
    store: Arc<AccessConfigStore>,
}

impl ConfigService {
    pub fn new(store: Arc<AccessConfigStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<AccessConfigStore> {
        &self.store
    }

    /// Answer one request. Failures are folded into the reply envelope.
    pub fn handle(&self, request: ConfigRequest) -> ServiceReply {
        let op = request.name();
        debug!(op, "Handling config request");

        match request {
            ConfigRequest::LoadConfig => ServiceReply::with_config(self.store.load()),
            ConfigRequest::UpdateAccess { access } => match self.store.update_access(access) {
                Ok(outcome) => ServiceReply::with_log(outcome.log),
                Err(e) => {
                    error!(op, error = %e, "Access update failed");
                    ServiceReply::failure(e.to_string())
                }
            },
            ConfigRequest::UpdateMarkers { markers } => {
                if markers.is_empty() {
                    warn!(op, "Refusing to persist an empty marker forest");
                    return ServiceReply::failure("marker forest is empty");
                }
                match self.store.update_markers(markers) {
                    Ok(config) => ServiceReply::with_config(config),
                    Err(e) => {
                        error!(op, error = %e, "Marker update failed");
                        ServiceReply::failure(e.to_string())
                    }
                }
            }
            ConfigRequest::HasRole { principal, role } => {
                ServiceReply::with_result(has_role(principal.as_ref(), role.as_str()))
            }
            ConfigRequest::HasAnyRole { principal, roles } => {
                ServiceReply::with_result(has_any_role(principal.as_ref(), &roles))
            }
        }
    }

    /// Decode a request frame, answer it and encode the reply frame
    pub fn handle_frame(&self, frame: &str) -> String {
        let reply = match serde_json::from_str::<ConfigRequest>(frame) {
            Ok(request) => self.handle(request),
            Err(e) => {
                warn!(error = %e, "Malformed config request");
                ServiceReply::failure(format!("malformed request: {}", e))
            }
        };

        serde_json::to_string(&reply).unwrap_or_else(|e| {
            error!(error = %e, "Failed to encode config reply");
            r#"{"ok":false,"error":"failed to encode reply"}"#.to_string()
        })
    }

    /// Run the service on its own task.
    ///
    /// Requests are answered one at a time, in arrival order; store I/O runs
    /// on the blocking pool. The task ends when every handle is dropped.
    pub fn spawn(self, buffer: usize) -> (ServiceHandle, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<Envelope>(buffer.max(1));
        let service = Arc::new(self);

        let task = tokio::spawn(async move {
            info!(location = %service.store.location(), "Config service started");

            while let Some(envelope) = rx.recv().await {
                let worker = service.clone();
                let frame = envelope.frame;
                let reply = match tokio::task::spawn_blocking(move || worker.handle_frame(&frame))
                    .await
                {
                    Ok(reply) => reply,
                    Err(e) => {
                        error!(error = %e, "Config request handler panicked");
                        r#"{"ok":false,"error":"request handler failed"}"#.to_string()
                    }
                };

                if envelope.reply.send(reply).is_err() {
                    debug!("Config caller went away before the reply");
                }
            }

            info!("Config service stopped");
        });

        (ServiceHandle::new(tx), task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rolegate_store::InMemoryConfig;
    use rolegate_types::{AccessMap, MarkerForest, Principal, RoleId};

    fn service() -> ConfigService {
        let store = AccessConfigStore::with_persistence(InMemoryConfig::new(), true);
        ConfigService::new(Arc::new(store))
    }

    #[test]
    fn load_config_returns_skeleton() {
        let reply = service().handle(ConfigRequest::LoadConfig);
        assert!(reply.ok);
        assert!(reply.config.unwrap().declares_role("SuperAdmin"));
    }

    #[test]
    fn update_access_returns_log() {
        let reply = service().handle(ConfigRequest::UpdateAccess {
            access: AccessMap::new()
                .with_grants("User", ["view-x"])
                .with_grants("Ghost", ["view-x"]),
        });
        assert!(reply.ok);
        assert_eq!(reply.log.unwrap().len(), 2);
    }

    #[test]
    fn empty_forest_is_refused() {
        let reply = service().handle(ConfigRequest::UpdateMarkers {
            markers: MarkerForest::new(),
        });
        assert!(!reply.ok);
        assert!(reply.error.unwrap().contains("empty"));
    }

    #[test]
    fn has_role_requests() {
        let service = service();
        let reply = service.handle(ConfigRequest::HasRole {
            principal: Some(Principal::new("Admin")),
            role: RoleId::new("Admin"),
        });
        assert_eq!(reply.result, Some(true));

        let reply = service.handle(ConfigRequest::HasAnyRole {
            principal: None,
            roles: vec![RoleId::new("Admin")],
        });
        assert_eq!(reply.result, Some(false));
    }

    #[test]
    fn malformed_frame_is_answered() {
        let reply: ServiceReply =
            serde_json::from_str(&service().handle_frame(r#"{"op":"dropTables"}"#)).unwrap();
        assert!(!reply.ok);
        assert!(reply.error.unwrap().starts_with("malformed request"));
    }
}

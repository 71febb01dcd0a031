//! Wire format of the config service

use rolegate_types::{AccessConfig, AccessMap, MarkerForest, Principal, RoleId};
use serde::{Deserialize, Serialize};

/// A request frame, tagged by `op`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum ConfigRequest {
    LoadConfig,
    /// Merge-only permission edit
    UpdateAccess { access: AccessMap },
    /// Full marker forest replacement from a complete rescan
    UpdateMarkers { markers: MarkerForest },
    HasRole {
        principal: Option<Principal>,
        role: RoleId,
    },
    HasAnyRole {
        principal: Option<Principal>,
        roles: Vec<RoleId>,
    },
}

impl ConfigRequest {
    pub fn name(&self) -> &'static str {
        match self {
            ConfigRequest::LoadConfig => "loadConfig",
            ConfigRequest::UpdateAccess { .. } => "updateAccess",
            ConfigRequest::UpdateMarkers { .. } => "updateMarkers",
            ConfigRequest::HasRole { .. } => "hasRole",
            ConfigRequest::HasAnyRole { .. } => "hasAnyRole",
        }
    }
}

/// Reply envelope: `{ok, config?, result?, log?, error?}`
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceReply {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<AccessConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ServiceReply {
    pub fn with_config(config: AccessConfig) -> Self {
        Self {
            ok: true,
            config: Some(config),
            ..Default::default()
        }
    }

    pub fn with_result(result: bool) -> Self {
        Self {
            ok: true,
            result: Some(result),
            ..Default::default()
        }
    }

    pub fn with_log(log: Vec<String>) -> Self {
        Self {
            ok: true,
            log: Some(log),
            ..Default::default()
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_frames_are_tagged_by_op() {
        let json = serde_json::to_value(ConfigRequest::LoadConfig).unwrap();
        assert_eq!(json, serde_json::json!({ "op": "loadConfig" }));

        let frame = r#"{"op":"hasAnyRole","principal":{"role":"User"},"roles":["Admin","User"]}"#;
        let request: ConfigRequest = serde_json::from_str(frame).unwrap();
        assert_eq!(request.name(), "hasAnyRole");
        match request {
            ConfigRequest::HasAnyRole { principal, roles } => {
                assert_eq!(principal.unwrap().role.as_str(), "User");
                assert_eq!(roles.len(), 2);
            }
            other => panic!("unexpected request {:?}", other),
        }
    }

    #[test]
    fn failure_reply_omits_payload() {
        let json = serde_json::to_value(ServiceReply::failure("boom")).unwrap();
        assert_eq!(json, serde_json::json!({ "ok": false, "error": "boom" }));
    }
}

//! Reconciliation of a persisted record against the configuration invariants.
//!
//! Persisted records are read leniently into [`RawAccessConfig`]: every field
//! is optional, roles may be a plain list or an object, access lists may be
//! `null`. [`reconcile`] turns that into a canonical [`AccessConfig`].

use chrono::{DateTime, Utc};
use rolegate_types::{
    builtin_roles, AccessConfig, AccessMap, MarkerForest, MarkerId, RoleId, RoleMeta, RoleSet,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Role declarations as they may appear on disk
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RolesRepr {
    /// `["Admin", "User"]`
    List(Vec<RoleId>),
    /// `{"Admin": {"display_name": "..."}, "User": null}`
    Map(BTreeMap<RoleId, Option<RoleMeta>>),
}

/// Lenient view of the persisted record
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawAccessConfig {
    #[serde(default)]
    pub roles: Option<RolesRepr>,
    #[serde(default)]
    pub markers: Option<MarkerForest>,
    #[serde(default)]
    pub access: Option<BTreeMap<RoleId, Option<Vec<MarkerId>>>>,
    #[serde(default)]
    pub generated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub version: u64,
}

impl From<AccessConfig> for RawAccessConfig {
    fn from(config: AccessConfig) -> Self {
        let roles = config
            .roles
            .into_iter()
            .map(|(role, meta)| (role, Some(meta)))
            .collect();
        let access = config
            .access
            .into_iter()
            .map(|(role, markers)| (role, Some(markers.into_iter().collect())))
            .collect();

        Self {
            roles: Some(RolesRepr::Map(roles)),
            markers: Some(config.markers),
            access: Some(access),
            generated_at: Some(config.generated_at),
            version: config.version,
        }
    }
}

/// Canonicalize a record.
///
/// - roles end up in object form, blank ids dropped, built-ins always present
/// - access entries for undeclared roles are pruned
/// - every declared role has an access entry, possibly empty
///
/// `reconcile(reconcile(x)) == reconcile(x)`.
pub fn reconcile(raw: impl Into<RawAccessConfig>) -> AccessConfig {
    let raw = raw.into();

    let mut roles: RoleSet = match raw.roles {
        Some(RolesRepr::List(list)) => list
            .into_iter()
            .map(|role| (role, RoleMeta::default()))
            .collect(),
        Some(RolesRepr::Map(map)) => map
            .into_iter()
            .map(|(role, meta)| (role, meta.unwrap_or_default()))
            .collect(),
        None => RoleSet::new(),
    };
    roles.retain(|role, _| !role.as_str().trim().is_empty());
    for role in builtin_roles() {
        roles.entry(role).or_default();
    }

    let mut access: AccessMap = raw
        .access
        .unwrap_or_default()
        .into_iter()
        .filter(|(role, _)| roles.contains_key(role))
        .map(|(role, markers)| (role, markers.unwrap_or_default().into_iter().collect()))
        .collect();
    for role in roles.keys() {
        access.ensure(role);
    }

    AccessConfig {
        roles,
        markers: raw.markers.unwrap_or_default(),
        access,
        generated_at: raw.generated_at.unwrap_or_else(Utc::now),
        version: raw.version,
    }
}

//! Roles, the per-role access map and the persisted configuration aggregate

use crate::{builtin_roles, MarkerForest, MarkerId, RoleId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Optional metadata attached to a role
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl RoleMeta {
    pub fn named(display_name: impl Into<String>) -> Self {
        Self {
            display_name: Some(display_name.into()),
            description: None,
        }
    }
}

/// Declared roles in canonical object form
pub type RoleSet = BTreeMap<RoleId, RoleMeta>;

/// Role → set of marker ids the role may see.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessMap(BTreeMap<RoleId, BTreeSet<MarkerId>>);

impl AccessMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the allow-list of one role
    pub fn set<I>(&mut self, role: RoleId, markers: I)
    where
        I: IntoIterator<Item = MarkerId>,
    {
        self.0.insert(role, markers.into_iter().collect());
    }

    /// Builder form of [`AccessMap::set`]
    pub fn with_grants<I, M>(mut self, role: impl Into<String>, markers: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<String>,
    {
        self.set(
            RoleId::new(role),
            markers.into_iter().map(MarkerId::new),
        );
        self
    }

    pub fn get(&self, role: &str) -> Option<&BTreeSet<MarkerId>> {
        self.0.get(role)
    }

    /// Add an empty entry for the role if it has none
    pub fn ensure(&mut self, role: &RoleId) {
        self.0.entry(role.clone()).or_default();
    }

    pub fn remove(&mut self, role: &str) -> Option<BTreeSet<MarkerId>> {
        self.0.remove(role)
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&RoleId) -> bool) {
        self.0.retain(|role, _| keep(role));
    }

    pub fn contains_role(&self, role: &str) -> bool {
        self.0.contains_key(role)
    }

    /// Whether `role` may see `marker`
    pub fn allows(&self, role: &str, marker: &str) -> bool {
        self.0
            .get(role)
            .map(|markers| markers.contains(marker))
            .unwrap_or(false)
    }

    pub fn roles(&self) -> impl Iterator<Item = &RoleId> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RoleId, &BTreeSet<MarkerId>)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl IntoIterator for AccessMap {
    type Item = (RoleId, BTreeSet<MarkerId>);
    type IntoIter = std::collections::btree_map::IntoIter<RoleId, BTreeSet<MarkerId>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl FromIterator<(RoleId, BTreeSet<MarkerId>)> for AccessMap {
    fn from_iter<T: IntoIterator<Item = (RoleId, BTreeSet<MarkerId>)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// The persisted aggregate: roles, marker forest and access map.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessConfig {
    pub roles: RoleSet,
    pub markers: MarkerForest,
    pub access: AccessMap,
    pub generated_at: DateTime<Utc>,
    /// Incremented on every successful write; stale writes are rejected
    #[serde(default)]
    pub version: u64,
}

impl AccessConfig {
    /// Minimal default: the built-in roles, each with an empty allow-list
    pub fn skeleton() -> Self {
        let mut roles = RoleSet::new();
        let mut access = AccessMap::new();
        for role in builtin_roles() {
            access.ensure(&role);
            roles.insert(role, RoleMeta::default());
        }

        Self {
            roles,
            markers: MarkerForest::new(),
            access,
            generated_at: Utc::now(),
            version: 0,
        }
    }

    pub fn declares_role(&self, role: &str) -> bool {
        self.roles.contains_key(role)
    }

    /// Allow-list of a role, if the role has an access entry
    pub fn allowed_markers(&self, role: &str) -> Option<&BTreeSet<MarkerId>> {
        self.access.get(role)
    }
}

//! The access configuration store

use std::sync::{Mutex, RwLock};

use chrono::Utc;
use rolegate_types::{AccessConfig, AccessMap, MarkerForest};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::persistence::{ConfigPersistence, JsonFileConfig};
use crate::reconcile::{reconcile, RawAccessConfig};

/// Result of a merge-only permission edit
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UpdateOutcome {
    pub config: AccessConfig,
    /// One line per role touched or ignored
    pub log: Vec<String>,
}

enum StoredRecord {
    Found(AccessConfig),
    /// Missing or blank
    Absent,
    Corrupt(String),
}

/// Authoritative, persisted record of roles, marker forest and access map.
///
/// All writes go through one writer lock, so read-modify-write operations
/// never interleave. The last committed configuration is kept in memory and
/// is not rolled back when the backend rejects a write.
pub struct AccessConfigStore {
    persistence: Box<dyn ConfigPersistence>,
    persist_defaults: bool,
    cache: RwLock<Option<AccessConfig>>,
    writer: Mutex<()>,
}

impl AccessConfigStore {
    /// Store backed by the JSON file named in `config`
    pub fn open(config: &StoreConfig) -> Self {
        Self::with_persistence(JsonFileConfig::new(&config.path), config.persist_defaults)
    }

    pub fn with_persistence(
        persistence: impl ConfigPersistence + 'static,
        persist_defaults: bool,
    ) -> Self {
        Self {
            persistence: Box::new(persistence),
            persist_defaults,
            cache: RwLock::new(None),
            writer: Mutex::new(()),
        }
    }

    pub fn location(&self) -> String {
        self.persistence.describe()
    }

    /// Read the persisted record.
    ///
    /// Never fails: a missing or empty record yields the default skeleton
    /// (persisted when `persist_defaults` is set); unreadable or malformed
    /// content yields the skeleton and is left untouched on disk.
    pub fn load(&self) -> AccessConfig {
        let guard = self.writer.lock();
        if guard.is_err() {
            warn!("Store writer lock poisoned, loading without it");
        }

        let config = match self.read_record() {
            StoredRecord::Found(config) => config,
            StoredRecord::Absent => {
                warn!(
                    location = %self.location(),
                    "No access config found, using default skeleton"
                );
                let skeleton = AccessConfig::skeleton();
                if self.persist_defaults {
                    let mut persisted = skeleton.clone();
                    persisted.version = 1;
                    match self.commit(persisted) {
                        Ok(committed) => committed,
                        // Nothing was stored, so the next save must start
                        // from version 0. The cache is overwritten below.
                        Err(_) => skeleton,
                    }
                } else {
                    skeleton
                }
            }
            StoredRecord::Corrupt(reason) => {
                warn!(
                    location = %self.location(),
                    reason = %reason,
                    "Unreadable access config, using default skeleton"
                );
                AccessConfig::skeleton()
            }
        };

        if let Err(e) = self.set_cache(config.clone()) {
            warn!(error = %e, "Failed to cache loaded access config");
        }
        config
    }

    /// Last configuration loaded or committed by this store, without I/O
    pub fn snapshot(&self) -> StoreResult<Option<AccessConfig>> {
        let cache = self.cache.read().map_err(|_| StoreError::LockError)?;
        Ok(cache.clone())
    }

    /// Whole-record overwrite.
    ///
    /// `config.version` must equal the stored version; the committed record
    /// carries the next version.
    pub fn save(&self, config: &AccessConfig) -> StoreResult<AccessConfig> {
        let _guard = self.writer.lock().map_err(|_| StoreError::LockError)?;

        let found = match self.read_record() {
            StoredRecord::Found(stored) => stored.version,
            StoredRecord::Absent | StoredRecord::Corrupt(_) => 0,
        };
        if config.version != found {
            warn!(
                expected = config.version,
                found,
                "Rejected stale access config write"
            );
            return Err(StoreError::StaleWrite {
                expected: config.version,
                found,
            });
        }

        let mut next = reconcile(config.clone());
        next.version = found + 1;
        self.commit(next)
    }

    /// Merge-only permission edit.
    ///
    /// Only roles present in `partial` are overwritten. Keys naming roles the
    /// configuration does not declare are ignored and reported in the log.
    pub fn update_access(&self, partial: AccessMap) -> StoreResult<UpdateOutcome> {
        let _guard = self.writer.lock().map_err(|_| StoreError::LockError)?;

        let mut next = self.current()?;
        let mut log = Vec::new();
        for (role, markers) in partial {
            if next.declares_role(role.as_str()) {
                log.push(format!("updated {}: {} marker(s)", role, markers.len()));
                next.access.set(role, markers);
            } else {
                log.push(format!("ignored {}: role is not declared", role));
            }
        }

        let version = next.version;
        let mut next = reconcile(next);
        next.version = version + 1;
        let config = self.commit(next)?;

        info!(version = config.version, changes = log.len(), "Access map updated");
        Ok(UpdateOutcome { config, log })
    }

    /// Full replacement of the marker forest, stamping `generated_at`
    pub fn update_markers(&self, markers: MarkerForest) -> StoreResult<AccessConfig> {
        let _guard = self.writer.lock().map_err(|_| StoreError::LockError)?;

        let mut next = self.current()?;
        next.markers = markers;
        next.generated_at = Utc::now();

        let version = next.version;
        let mut next = reconcile(next);
        next.version = version + 1;
        let config = self.commit(next)?;

        info!(
            version = config.version,
            markers = config.markers.marker_count(),
            "Marker forest replaced"
        );
        Ok(config)
    }

    /// Base for a read-modify-write: the stored record, else the cached
    /// configuration, else the skeleton.
    fn current(&self) -> StoreResult<AccessConfig> {
        match self.read_record() {
            StoredRecord::Found(config) => Ok(config),
            StoredRecord::Absent | StoredRecord::Corrupt(_) => {
                Ok(self.snapshot()?.unwrap_or_else(AccessConfig::skeleton))
            }
        }
    }

    fn read_record(&self) -> StoredRecord {
        let contents = match self.persistence.read() {
            Ok(Some(contents)) => contents,
            Ok(None) => return StoredRecord::Absent,
            Err(e) => return StoredRecord::Corrupt(e.to_string()),
        };
        if contents.trim().is_empty() {
            return StoredRecord::Absent;
        }

        match serde_json::from_str::<RawAccessConfig>(&contents) {
            Ok(raw) => StoredRecord::Found(reconcile(raw)),
            Err(e) => StoredRecord::Corrupt(e.to_string()),
        }
    }

    /// Cache first, then write. A failed write leaves the cache as is.
    fn commit(&self, config: AccessConfig) -> StoreResult<AccessConfig> {
        let json = serde_json::to_string_pretty(&config)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        self.set_cache(config.clone())?;

        if let Err(e) = self.persistence.write(&json) {
            error!(
                location = %self.location(),
                version = config.version,
                error = %e,
                "Failed to persist access config"
            );
            return Err(e);
        }

        debug!(location = %self.location(), version = config.version, "Access config persisted");
        Ok(config)
    }

    fn set_cache(&self, config: AccessConfig) -> StoreResult<()> {
        let mut cache = self.cache.write().map_err(|_| StoreError::LockError)?;
        *cache = Some(config);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::InMemoryConfig;
    use proptest::prelude::*;
    use rolegate_types::{MarkerId, MarkerNode, BUILTIN_ROLES};
    use std::collections::BTreeSet;
    use std::sync::Arc;

    fn memory_store(contents: Option<&str>) -> (AccessConfigStore, Arc<InMemoryConfig>) {
        let mem = Arc::new(match contents {
            Some(c) => InMemoryConfig::with_contents(c),
            None => InMemoryConfig::new(),
        });
        (AccessConfigStore::with_persistence(mem.clone(), true), mem)
    }

    fn seeded() -> (AccessConfigStore, Arc<InMemoryConfig>) {
        memory_store(Some(
            r#"{
                "roles": ["SuperAdmin", "Admin", "User"],
                "markers": {},
                "access": {
                    "User": ["view-x"],
                    "Admin": ["view-x", "edit-x"]
                },
                "generated_at": "2024-01-01T00:00:00Z",
                "version": 4
            }"#,
        ))
    }

    fn set(ids: &[&str]) -> BTreeSet<MarkerId> {
        ids.iter().map(|id| MarkerId::new(*id)).collect()
    }

    #[test]
    fn load_missing_persists_skeleton() {
        let (store, mem) = memory_store(None);
        let config = store.load();

        for role in BUILTIN_ROLES {
            assert!(config.declares_role(role));
        }
        assert_eq!(config.version, 1);
        let persisted: AccessConfig = serde_json::from_str(&mem.contents().unwrap()).unwrap();
        assert_eq!(persisted.roles, config.roles);
    }

    #[test]
    fn load_empty_file_is_treated_as_missing() {
        let (store, mem) = memory_store(Some("   \n"));
        let config = store.load();
        assert!(config.markers.is_empty());
        assert!(mem.contents().unwrap().contains("SuperAdmin"));
    }

    #[test]
    fn load_without_persisting_defaults() {
        let mem = Arc::new(InMemoryConfig::new());
        let store = AccessConfigStore::with_persistence(mem.clone(), false);
        let config = store.load();
        assert_eq!(config.version, 0);
        assert!(mem.contents().is_none());
    }

    #[test]
    fn load_malformed_degrades_and_keeps_file() {
        let (store, mem) = memory_store(Some("{ not json"));
        let config = store.load();

        assert_eq!(config.access, AccessConfig::skeleton().access);
        assert_eq!(mem.contents().as_deref(), Some("{ not json"));
    }

    #[test]
    fn load_reconciles_list_form_roles() {
        let (store, _) = memory_store(Some(r#"{"roles": ["Viewer"], "access": {"Ghost": ["a"]}}"#));
        let config = store.load();

        assert!(config.declares_role("Viewer"));
        assert!(config.declares_role("Admin"));
        assert!(config.access.get("Viewer").unwrap().is_empty());
        assert!(!config.access.contains_role("Ghost"));
    }

    #[test]
    fn update_access_leaves_other_roles_alone() {
        let (store, _) = seeded();
        let outcome = store
            .update_access(AccessMap::new().with_grants("User", ["view-x", "view-y"]))
            .unwrap();

        assert_eq!(outcome.config.access.get("User"), Some(&set(&["view-x", "view-y"])));
        assert_eq!(outcome.config.access.get("Admin"), Some(&set(&["view-x", "edit-x"])));
        assert!(outcome.config.access.get("SuperAdmin").unwrap().is_empty());
        assert_eq!(outcome.config.version, 5);
        assert_eq!(outcome.log.len(), 1);
    }

    #[test]
    fn update_access_ignores_undeclared_roles() {
        let (store, _) = seeded();
        let outcome = store
            .update_access(AccessMap::new().with_grants("Ghost", ["view-x"]))
            .unwrap();

        assert!(!outcome.config.access.contains_role("Ghost"));
        assert!(outcome.log[0].contains("Ghost"));
    }

    #[test]
    fn update_markers_replaces_forest() {
        let (store, _) = seeded();
        let mut forest = MarkerForest::new();
        forest.insert_root(
            MarkerId::new("orders"),
            MarkerNode {
                description: "Orders".to_string(),
                children: Vec::new(),
            },
        );

        let config = store.update_markers(forest.clone()).unwrap();
        assert_eq!(config.markers, forest);
        assert_eq!(config.access.get("User"), Some(&set(&["view-x"])));
        assert!(config.generated_at.timestamp() > 1_704_067_200);

        let reloaded = store.load();
        assert_eq!(reloaded.markers, forest);
    }

    #[test]
    fn save_rejects_stale_version() {
        let (store, _) = seeded();
        let first = store.load();
        assert_eq!(first.version, 4);

        let saved = store.save(&first).unwrap();
        assert_eq!(saved.version, 5);

        let err = store.save(&first).unwrap_err();
        assert!(matches!(
            err,
            StoreError::StaleWrite {
                expected: 4,
                found: 5
            }
        ));
    }

    #[test]
    fn save_reconciles_before_writing() {
        let (store, mem) = seeded();
        let mut config = store.load();
        config.roles.remove("Admin");
        config.access.remove("User");

        let saved = store.save(&config).unwrap();
        assert!(saved.declares_role("Admin"));
        assert!(saved.access.get("User").unwrap().is_empty());
        assert!(mem.contents().unwrap().contains("\"version\": 5"));
    }

    #[test]
    fn write_failure_is_reported_without_rollback() {
        let (store, mem) = seeded();
        store.load();
        mem.set_fail_writes(true);

        let result = store.update_access(AccessMap::new().with_grants("User", ["edit-x"]));
        assert!(matches!(result, Err(StoreError::Io(_))));

        let cached = store.snapshot().unwrap().unwrap();
        assert!(cached.access.allows("User", "edit-x"));
        assert!(mem.contents().unwrap().contains("\"version\": 4"));
    }

    #[test]
    fn failed_default_persist_loads_and_caches_version_zero() {
        let (store, mem) = memory_store(None);
        mem.set_fail_writes(true);

        let loaded = store.load();
        assert_eq!(loaded.version, 0);
        assert_eq!(store.snapshot().unwrap().unwrap().version, loaded.version);
        assert!(mem.contents().is_none());

        mem.set_fail_writes(false);
        let saved = store.save(&loaded).unwrap();
        assert_eq!(saved.version, 1);
    }

    #[test]
    fn json_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig {
            path: dir.path().join("access-config.json"),
            persist_defaults: true,
        };

        let store = AccessConfigStore::open(&config);
        store.load();
        store
            .update_access(AccessMap::new().with_grants("Admin", ["edit-x"]))
            .unwrap();

        let reopened = AccessConfigStore::open(&config);
        let loaded = reopened.load();
        assert!(loaded.access.allows("Admin", "edit-x"));
        assert_eq!(loaded.version, 2);
    }

    fn grants() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec("[a-c]-[x-z]", 0..4)
    }

    proptest! {
        #[test]
        fn update_access_is_merge_only(
            user in grants(),
            admin in grants(),
            edit_user in any::<bool>(),
            new_grants in grants(),
        ) {
            let initial = AccessMap::new()
                .with_grants("User", user.clone())
                .with_grants("Admin", admin.clone());
            let raw = serde_json::json!({
                "roles": BUILTIN_ROLES,
                "access": initial,
            });
            let (store, _) = memory_store(Some(raw.to_string().as_str()));

            let (edited, untouched, untouched_grants) = if edit_user {
                ("User", "Admin", admin)
            } else {
                ("Admin", "User", user)
            };

            let outcome = store
                .update_access(AccessMap::new().with_grants(edited, new_grants.clone()))
                .unwrap();

            let expected: BTreeSet<MarkerId> =
                untouched_grants.into_iter().map(MarkerId::new).collect();
            prop_assert_eq!(outcome.config.access.get(untouched), Some(&expected));
            let edited_expected: BTreeSet<MarkerId> =
                new_grants.into_iter().map(MarkerId::new).collect();
            prop_assert_eq!(outcome.config.access.get(edited), Some(&edited_expected));
            prop_assert!(outcome.config.access.get("SuperAdmin").unwrap().is_empty());
        }
    }
}

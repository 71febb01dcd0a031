//! Rolegate Store - the authoritative access configuration
//!
//! The store owns one persisted [`AccessConfig`] record and its
//! load / reconcile / merge / save semantics:
//!
//! - [`AccessConfigStore::load`] never fails. Missing, empty or malformed
//!   records degrade to [`AccessConfig::skeleton`].
//! - [`reconcile`] repairs a record against the invariants: canonical role
//!   objects, built-in roles present, one access entry per declared role.
//! - [`AccessConfigStore::update_access`] merges per role; roles absent from
//!   the partial map keep their grants.
//! - [`AccessConfigStore::update_markers`] replaces the marker forest.
//! - [`AccessConfigStore::save`] overwrites the whole record, guarded by the
//!   record's `version` so that a stale writer is rejected instead of
//!   silently clobbering a newer record.
//!
//! [`AccessConfig`]: rolegate_types::AccessConfig
//! [`AccessConfig::skeleton`]: rolegate_types::AccessConfig::skeleton

#![deny(unsafe_code)]

mod config;
mod error;
mod persistence;
mod reconcile;
mod store;

pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use persistence::{ConfigPersistence, InMemoryConfig, JsonFileConfig};
pub use reconcile::{reconcile, RawAccessConfig, RolesRepr};
pub use store::{AccessConfigStore, UpdateOutcome};

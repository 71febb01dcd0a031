//! Rolegate Types - shared data model for fragment authorization
//!
//! Everything that crosses a crate boundary lives here: role and marker
//! identifiers, the marker forest, the per-role access map and the persisted
//! [`AccessConfig`] aggregate.
//!
//! ```text
//! AccessConfig
//!   ├── roles        RoleId → RoleMeta
//!   ├── markers      MarkerForest (root id → { description, children })
//!   ├── access       RoleId → { MarkerId }
//!   ├── generated_at ISO timestamp of the last marker rescan
//!   └── version      optimistic-concurrency token
//! ```

#![deny(unsafe_code)]

pub mod access;
pub mod attributes;
pub mod ids;
pub mod marker;
pub mod principal;

pub use access::{AccessConfig, AccessMap, RoleMeta, RoleSet};
pub use attributes::MarkerAttributes;
pub use ids::{MarkerId, RoleId};
pub use marker::{MarkerDecl, MarkerEntry, MarkerForest, MarkerNode};
pub use principal::Principal;

/// Description assigned to markers declared without one.
pub const NEEDS_DESCRIPTION: &str = "Needs description";

/// Roles that every reconciled configuration must declare.
pub const BUILTIN_ROLES: [&str; 3] = ["SuperAdmin", "Admin", "User"];

/// Built-in roles as typed identifiers.
pub fn builtin_roles() -> impl Iterator<Item = RoleId> {
    BUILTIN_ROLES.iter().map(|r| RoleId::new(*r))
}

//! Rolegate Enforcer - runtime enforcement of the access map
//!
//! The [`Enforcer`] holds an [`AuthorizationContext`] (the loaded
//! configuration and the active principal) and keeps a view consistent with
//! it:
//!
//! - [`Enforcer::apply_access_rules`] sweeps every marked fragment.
//! - As a [`ViewChangeWatcher`](rolegate_view::ViewChangeWatcher) it decides
//!   newly inserted fragments inside the change notification, before the
//!   next interaction can reach them.
//! - Markers seen on insertion are batched by the [`RescanScheduler`] and
//!   pushed to the store as a full marker forest after a quiet period.
//!
//! ```text
//! Uninitialized ──load ok──▶ LoadedNoSession ◀──principal / none──▶ LoadedSession(role)
//!       ▲  │
//!       └──┘ load failure (logged)
//! ```

#![deny(unsafe_code)]

mod config;
mod context;
mod enforcer;
mod error;
mod rescan;

#[cfg(test)]
mod testing;

pub use config::{EnforcerConfig, MissingConfigPolicy};
pub use context::{AccessDecider, AuthorizationContext, EnforcerState};
pub use enforcer::{EnforcementReport, Enforcer};
pub use error::{EnforcerError, EnforcerResult};
pub use rescan::RescanScheduler;

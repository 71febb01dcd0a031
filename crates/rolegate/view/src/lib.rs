//! Rolegate View - the rendered view as seen by the authorization layer
//!
//! The enforcement engine never talks to a concrete UI toolkit. It works
//! against two seams defined here:
//!
//! - [`ViewTree`]: enumerate marker-declared fragments, detach them and put
//!   them back, or degrade them to a hidden, non-interactive state.
//! - [`ViewChangeWatcher`]: receives [`ViewChange`] notifications for
//!   inserted and removed fragments, with marker diffing already applied.
//!
//! [`InMemoryView`] is a DOM-like reference implementation used by tests and
//! by tooling that works on serialized views.

#![deny(unsafe_code)]

mod change;
mod error;
mod fragment;
mod memory;
mod tree;

pub use change::{ViewChange, ViewChangeWatcher};
pub use error::{ViewError, ViewResult};
pub use fragment::{FragmentId, FragmentSpec, MarkedFragment};
pub use memory::InMemoryView;
pub use tree::ViewTree;

/// Attribute set on fragments that could only be hidden, not removed.
pub const HIDDEN_MARK_ATTRIBUTE: &str = "data-rolegate-hidden";

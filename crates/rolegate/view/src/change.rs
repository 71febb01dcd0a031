//! Structural change notifications

use crate::{MarkedFragment, ViewTree};

/// A structural change restricted to marker-declared fragments.
///
/// Fragments without a marker never appear in a change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewChange {
    /// Fragments that entered the view, in document order
    Inserted(Vec<MarkedFragment>),
    /// Fragments that left the view, in document order
    Removed(Vec<MarkedFragment>),
}

impl ViewChange {
    pub fn fragments(&self) -> &[MarkedFragment] {
        match self {
            ViewChange::Inserted(fragments) | ViewChange::Removed(fragments) => fragments,
        }
    }
}

/// Observer of structural changes.
///
/// Implementations are called synchronously, inside the mutation that caused
/// the change and before control returns to whoever mutated the view. The
/// view is handed back so the watcher can act on it immediately.
pub trait ViewChangeWatcher: Send + Sync {
    fn on_change(&self, view: &mut dyn ViewTree, change: &ViewChange);
}

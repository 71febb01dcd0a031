use crate::{FragmentId, MarkedFragment, ViewResult};

/// Operations the authorization layer needs from a rendered view.
///
/// Detaching is reversible: a detached fragment keeps its place in the tree
/// and can be reattached there, but until then it is unreachable for
/// enumeration and interaction.
pub trait ViewTree {
    /// Every marker-declared fragment currently attached, in document order
    fn marked_fragments(&self) -> Vec<MarkedFragment>;

    /// Whether the fragment exists and is attached
    fn contains(&self, fragment: FragmentId) -> bool;

    /// Take the fragment and its subtree out of the view, keeping its slot
    fn detach(&mut self, fragment: FragmentId) -> ViewResult<()>;

    /// Put a detached fragment back where it was
    fn reattach(&mut self, fragment: FragmentId) -> ViewResult<()>;

    /// Leave the fragment attached but hidden, inert and marked
    fn disable_and_hide(&mut self, fragment: FragmentId) -> ViewResult<()>;

    /// Undo [`ViewTree::disable_and_hide`]
    fn restore(&mut self, fragment: FragmentId) -> ViewResult<()>;

    /// Whether user interaction can currently reach the fragment
    fn is_interactive(&self, fragment: FragmentId) -> bool;
}

//! DOM-like in-memory view

use crate::{
    FragmentId, FragmentSpec, MarkedFragment, ViewChange, ViewChangeWatcher, ViewError,
    ViewResult, ViewTree, HIDDEN_MARK_ATTRIBUTE,
};
use rolegate_types::{MarkerAttributes, MarkerDecl};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::trace;

struct Node {
    tag: String,
    attributes: BTreeMap<String, String>,
    parent: Option<FragmentId>,
    children: Vec<FragmentId>,
    hidden: bool,
    inert: bool,
    pinned: bool,
    detached: bool,
}

/// A mutable fragment tree that notifies watchers on structural change.
///
/// Insertions and removals call every registered [`ViewChangeWatcher`]
/// before returning, so a watcher's decision is in effect by the time the
/// caller can dispatch the next interaction. Detaching and reattaching are
/// silent.
pub struct InMemoryView {
    nodes: HashMap<FragmentId, Node>,
    root: FragmentId,
    next_id: u64,
    attributes: MarkerAttributes,
    watchers: Vec<Arc<dyn ViewChangeWatcher>>,
    clicks: HashMap<FragmentId, u32>,
}

impl InMemoryView {
    /// Create an empty view whose markers use the given attribute names
    pub fn new(attributes: MarkerAttributes) -> Self {
        let root = FragmentId::from_raw(0);
        let mut nodes = HashMap::new();
        nodes.insert(
            root,
            Node {
                tag: "body".to_string(),
                attributes: BTreeMap::new(),
                parent: None,
                children: vec![],
                hidden: false,
                inert: false,
                pinned: true,
                detached: false,
            },
        );

        Self {
            nodes,
            root,
            next_id: 1,
            attributes,
            watchers: vec![],
            clicks: HashMap::new(),
        }
    }

    pub fn root(&self) -> FragmentId {
        self.root
    }

    pub fn marker_attributes(&self) -> &MarkerAttributes {
        &self.attributes
    }

    /// Register a watcher for subsequent structural changes
    pub fn watch(&mut self, watcher: Arc<dyn ViewChangeWatcher>) {
        self.watchers.push(watcher);
    }

    /// Insert a fragment subtree under `parent` and notify watchers
    pub fn insert(&mut self, parent: FragmentId, spec: FragmentSpec) -> ViewResult<FragmentId> {
        if !self.nodes.contains_key(&parent) {
            return Err(ViewError::NotFound(parent));
        }

        let id = self.build(parent, spec);
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.push(id);
        }

        let inserted = if self.contains(parent) {
            self.marked_in(id)
        } else {
            vec![]
        };
        trace!(fragment = %id, marked = inserted.len(), "Fragment inserted");
        if !inserted.is_empty() {
            self.notify(ViewChange::Inserted(inserted));
        }

        Ok(id)
    }

    /// Delete a fragment and its subtree for good and notify watchers
    pub fn remove(&mut self, fragment: FragmentId) -> ViewResult<()> {
        let node = self
            .nodes
            .get(&fragment)
            .ok_or(ViewError::NotFound(fragment))?;
        if node.pinned || fragment == self.root {
            return Err(ViewError::Pinned(fragment));
        }

        let parent = node.parent;
        let removed = if self.contains(fragment) {
            self.marked_in(fragment)
        } else {
            vec![]
        };
        for id in self.subtree(fragment, false) {
            self.nodes.remove(&id);
            self.clicks.remove(&id);
        }
        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent.children.retain(|c| *c != fragment);
        }

        trace!(fragment = %fragment, marked = removed.len(), "Fragment removed");
        if !removed.is_empty() {
            self.notify(ViewChange::Removed(removed));
        }
        Ok(())
    }

    /// Simulate a user click. Fails if the fragment is gone or inert.
    pub fn dispatch_click(&mut self, fragment: FragmentId) -> ViewResult<()> {
        if !self.contains(fragment) {
            return Err(ViewError::NotFound(fragment));
        }
        if !self.is_interactive(fragment) {
            return Err(ViewError::NotInteractive(fragment));
        }
        *self.clicks.entry(fragment).or_insert(0) += 1;
        Ok(())
    }

    pub fn click_count(&self, fragment: FragmentId) -> u32 {
        self.clicks.get(&fragment).copied().unwrap_or(0)
    }

    pub fn set_pinned(&mut self, fragment: FragmentId, pinned: bool) -> ViewResult<()> {
        let node = self
            .nodes
            .get_mut(&fragment)
            .ok_or(ViewError::NotFound(fragment))?;
        node.pinned = pinned;
        Ok(())
    }

    pub fn attribute(&self, fragment: FragmentId, name: &str) -> Option<&str> {
        self.nodes
            .get(&fragment)
            .and_then(|n| n.attributes.get(name))
            .map(String::as_str)
    }

    pub fn tag(&self, fragment: FragmentId) -> Option<&str> {
        self.nodes.get(&fragment).map(|n| n.tag.as_str())
    }

    pub fn is_hidden(&self, fragment: FragmentId) -> bool {
        self.nodes.get(&fragment).map(|n| n.hidden).unwrap_or(false)
    }

    /// Number of attached fragments, root included
    pub fn len(&self) -> usize {
        self.subtree(self.root, true).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    /// Serialize the view as markup
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        self.render(self.root, &mut out);
        out
    }

    fn build(&mut self, parent: FragmentId, spec: FragmentSpec) -> FragmentId {
        let id = FragmentId::from_raw(self.next_id);
        self.next_id += 1;

        self.nodes.insert(
            id,
            Node {
                tag: spec.tag,
                attributes: spec.attributes,
                parent: Some(parent),
                children: vec![],
                hidden: false,
                inert: false,
                pinned: spec.pinned,
                detached: false,
            },
        );

        let children: Vec<FragmentId> = spec
            .children
            .into_iter()
            .map(|child| self.build(id, child))
            .collect();
        if let Some(node) = self.nodes.get_mut(&id) {
            node.children = children;
        }

        id
    }

    fn marker_of(&self, node: &Node) -> Option<MarkerDecl> {
        let id = node.attributes.get(&self.attributes.id)?;
        if id.trim().is_empty() {
            return None;
        }
        Some(MarkerDecl::new(
            id.as_str(),
            node.attributes
                .get(&self.attributes.description)
                .map(String::as_str),
            node.attributes.get(&self.attributes.parent).map(String::as_str),
        ))
    }

    /// Pre-order ids of the subtree rooted at `fragment`, optionally
    /// skipping detached branches
    fn subtree(&self, fragment: FragmentId, attached_only: bool) -> Vec<FragmentId> {
        let mut out = vec![];
        let mut stack = vec![fragment];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.get(&id) {
                if attached_only && node.detached {
                    continue;
                }
                out.push(id);
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    fn marked_in(&self, fragment: FragmentId) -> Vec<MarkedFragment> {
        self.subtree(fragment, true)
            .into_iter()
            .filter_map(|id| {
                let node = self.nodes.get(&id)?;
                self.marker_of(node).map(|marker| MarkedFragment {
                    fragment: id,
                    marker,
                })
            })
            .collect()
    }

    fn notify(&mut self, change: ViewChange) {
        let watchers = self.watchers.clone();
        for watcher in watchers {
            watcher.on_change(self, &change);
        }
    }

    fn render(&self, id: FragmentId, out: &mut String) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        out.push('<');
        out.push_str(&node.tag);
        for (name, value) in &node.attributes {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(&escape(value));
            out.push('"');
        }
        out.push('>');
        for child in &node.children {
            if self.nodes.get(child).is_some_and(|c| !c.detached) {
                self.render(*child, out);
            }
        }
        out.push_str("</");
        out.push_str(&node.tag);
        out.push('>');
    }
}

impl Default for InMemoryView {
    fn default() -> Self {
        Self::new(MarkerAttributes::default())
    }
}

impl ViewTree for InMemoryView {
    fn marked_fragments(&self) -> Vec<MarkedFragment> {
        self.marked_in(self.root)
    }

    fn contains(&self, fragment: FragmentId) -> bool {
        let mut current = Some(fragment);
        while let Some(id) = current {
            match self.nodes.get(&id) {
                Some(node) if node.detached => return false,
                Some(node) => current = node.parent,
                None => return false,
            }
        }
        true
    }

    fn detach(&mut self, fragment: FragmentId) -> ViewResult<()> {
        let node = self
            .nodes
            .get_mut(&fragment)
            .ok_or(ViewError::NotFound(fragment))?;
        if node.pinned || fragment == self.root {
            return Err(ViewError::Pinned(fragment));
        }
        node.detached = true;
        trace!(fragment = %fragment, "Fragment detached");
        Ok(())
    }

    fn reattach(&mut self, fragment: FragmentId) -> ViewResult<()> {
        let node = self
            .nodes
            .get_mut(&fragment)
            .ok_or(ViewError::NotFound(fragment))?;
        node.detached = false;
        trace!(fragment = %fragment, "Fragment reattached");
        Ok(())
    }

    fn disable_and_hide(&mut self, fragment: FragmentId) -> ViewResult<()> {
        let node = self
            .nodes
            .get_mut(&fragment)
            .ok_or(ViewError::NotFound(fragment))?;
        node.hidden = true;
        node.inert = true;
        node.attributes
            .insert(HIDDEN_MARK_ATTRIBUTE.to_string(), "true".to_string());
        Ok(())
    }

    fn restore(&mut self, fragment: FragmentId) -> ViewResult<()> {
        let node = self
            .nodes
            .get_mut(&fragment)
            .ok_or(ViewError::NotFound(fragment))?;
        node.hidden = false;
        node.inert = false;
        node.attributes.remove(HIDDEN_MARK_ATTRIBUTE);
        Ok(())
    }

    fn is_interactive(&self, fragment: FragmentId) -> bool {
        let mut current = Some(fragment);
        while let Some(id) = current {
            match self.nodes.get(&id) {
                Some(node) if node.hidden || node.inert || node.detached => return false,
                Some(node) => current = node.parent,
                None => return false,
            }
        }
        true
    }
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

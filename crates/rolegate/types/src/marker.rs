//! Marker declarations and the hierarchical marker forest

use crate::{MarkerId, NEEDS_DESCRIPTION};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A declared capability marker.
///
/// This is the typed descriptor a fragment author registers: the marker id,
/// a human description and an optional parent marker.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerDecl {
    pub id: MarkerId,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<MarkerId>,
}

impl MarkerDecl {
    /// Build a declaration, normalizing blank values.
    ///
    /// A missing or blank description becomes [`NEEDS_DESCRIPTION`]; a blank
    /// parent is treated as no parent.
    pub fn new(
        id: impl Into<String>,
        description: Option<&str>,
        parent: Option<&str>,
    ) -> Self {
        let id: String = id.into();
        let description = description
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .unwrap_or(NEEDS_DESCRIPTION)
            .to_string();
        let parent = parent
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(MarkerId::new);

        Self {
            id: MarkerId::new(id.trim()),
            description,
            parent,
        }
    }

    /// Declaration without description or parent
    pub fn root(id: impl Into<String>) -> Self {
        Self::new(id, None, None)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(MarkerId::new(parent));
        self
    }

    pub fn needs_description(&self) -> bool {
        self.description == NEEDS_DESCRIPTION
    }
}

/// A root of the marker forest (keyed by its id in [`MarkerForest`])
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerNode {
    pub description: String,
    #[serde(default)]
    pub children: Vec<MarkerEntry>,
}

/// A nested child entry of the marker forest
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerEntry {
    pub id: MarkerId,
    pub description: String,
    #[serde(default)]
    pub children: Vec<MarkerEntry>,
}

// Scanned views can nest arbitrarily deep, so nothing here recurses per level.
impl Drop for MarkerEntry {
    fn drop(&mut self) {
        let mut stack = std::mem::take(&mut self.children);
        while let Some(mut entry) = stack.pop() {
            stack.append(&mut entry.children);
        }
    }
}

/// Pre-order walk over nested entries
struct Entries<'a> {
    stack: Vec<&'a MarkerEntry>,
}

impl<'a> Entries<'a> {
    fn new(entries: &'a [MarkerEntry]) -> Self {
        Self {
            stack: entries.iter().rev().collect(),
        }
    }
}

impl<'a> Iterator for Entries<'a> {
    type Item = &'a MarkerEntry;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.stack.pop()?;
        self.stack.extend(entry.children.iter().rev());
        Some(entry)
    }
}

/// Hierarchical registry of markers: root marker id → node.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkerForest(BTreeMap<MarkerId, MarkerNode>);

impl MarkerForest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a root node
    pub fn insert_root(&mut self, id: MarkerId, node: MarkerNode) {
        self.0.insert(id, node);
    }

    pub fn root(&self, id: &str) -> Option<&MarkerNode> {
        self.0.get(id)
    }

    pub fn roots(&self) -> impl Iterator<Item = (&MarkerId, &MarkerNode)> {
        self.0.iter()
    }

    pub fn root_count(&self) -> usize {
        self.0.len()
    }

    /// Total number of markers at every depth
    pub fn marker_count(&self) -> usize {
        self.0
            .values()
            .map(|n| 1 + Entries::new(&n.children).count())
            .sum()
    }

    /// Whether the marker appears anywhere in the forest
    pub fn contains(&self, id: &str) -> bool {
        self.0.contains_key(id)
            || self
                .0
                .values()
                .any(|n| Entries::new(&n.children).any(|e| e.id.as_str() == id))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

//! Fragment identifiers and fragment construction

use rolegate_types::{MarkerAttributes, MarkerDecl};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identifier of a fragment within one view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FragmentId(u64);

impl FragmentId {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for FragmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fragment:{}", self.0)
    }
}

/// A fragment carrying a marker declaration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarkedFragment {
    pub fragment: FragmentId,
    pub marker: MarkerDecl,
}

/// Description of a fragment subtree to insert into a view
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FragmentSpec {
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    pub children: Vec<FragmentSpec>,
    /// The fragment refuses structural removal
    pub pinned: bool,
}

impl FragmentSpec {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Stamp a marker declaration onto this fragment
    pub fn marker(mut self, decl: &MarkerDecl, attributes: &MarkerAttributes) -> Self {
        self.attributes
            .insert(attributes.id.clone(), decl.id.to_string());
        if !decl.needs_description() {
            self.attributes
                .insert(attributes.description.clone(), decl.description.clone());
        }
        if let Some(parent) = &decl.parent {
            self.attributes
                .insert(attributes.parent.clone(), parent.to_string());
        }
        self
    }

    pub fn child(mut self, child: FragmentSpec) -> Self {
        self.children.push(child);
        self
    }

    pub fn pinned(mut self) -> Self {
        self.pinned = true;
        self
    }
}

//! Rolegate Hierarchy - marker forest construction
//!
//! A flat list of [`MarkerDecl`] becomes a [`MarkerForest`] keyed by the
//! declared parent relations. Construction never fails: references that
//! cannot be honoured are reported as [`HierarchyWarning`]s and the marker
//! is placed at the root level instead.

#![deny(unsafe_code)]

use rolegate_types::{MarkerDecl, MarkerEntry, MarkerForest, MarkerId, MarkerNode};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::{debug, warn};

/// A parent reference that could not be honoured
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HierarchyWarning {
    /// The declared parent is not among the markers; promoted to root
    UnresolvedParent { marker: MarkerId, parent: MarkerId },
    /// The marker sits on a parent cycle; promoted to root, which breaks
    /// the cycle for everything hanging off it
    Cycle { marker: MarkerId },
    /// A later declaration of an id that was already seen; ignored
    Duplicate { marker: MarkerId },
}

impl fmt::Display for HierarchyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnresolvedParent { marker, parent } => {
                write!(f, "marker {marker} declares unknown parent {parent}")
            }
            Self::Cycle { marker } => write!(f, "marker {marker} is part of a parent cycle"),
            Self::Duplicate { marker } => write!(f, "marker {marker} is declared more than once"),
        }
    }
}

/// Forest plus everything that had to be repaired to build it
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ForestReport {
    pub forest: MarkerForest,
    pub warnings: Vec<HierarchyWarning>,
}

/// Build the marker forest, discarding warnings
pub fn build_forest(markers: &[MarkerDecl]) -> MarkerForest {
    build_forest_report(markers).forest
}

/// Build the marker forest and report unresolved references.
///
/// Children keep the order of `markers`. The same input always yields the
/// same forest.
pub fn build_forest_report(markers: &[MarkerDecl]) -> ForestReport {
    let mut warnings = vec![];

    let mut unique: Vec<&MarkerDecl> = Vec::with_capacity(markers.len());
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(markers.len());
    for decl in markers {
        if index.contains_key(decl.id.as_str()) {
            warnings.push(HierarchyWarning::Duplicate {
                marker: decl.id.clone(),
            });
            continue;
        }
        index.insert(decl.id.as_str(), unique.len());
        unique.push(decl);
    }

    let mut children: Vec<Vec<usize>> = vec![vec![]; unique.len()];
    let mut parent_of: Vec<Option<usize>> = vec![None; unique.len()];
    let mut roots = vec![];
    for (i, decl) in unique.iter().enumerate() {
        match &decl.parent {
            None => roots.push(i),
            Some(parent) => match index.get(parent.as_str()) {
                Some(&p) if p != i => {
                    children[p].push(i);
                    parent_of[i] = Some(p);
                }
                Some(_) => {
                    // Self-parented markers are cycles of length one; the
                    // promotion pass below picks them up.
                    parent_of[i] = Some(i);
                }
                None => {
                    warnings.push(HierarchyWarning::UnresolvedParent {
                        marker: decl.id.clone(),
                        parent: parent.clone(),
                    });
                    roots.push(i);
                }
            },
        }
    }

    let mut visited = HashSet::with_capacity(unique.len());
    let mut forest = MarkerForest::new();
    for &root in &roots {
        insert_root(&mut forest, root, &unique, &children, &mut visited);
    }

    // Whatever is still unvisited is on a parent cycle or hangs off one.
    // Promote the first cycle member reached from it, so markers that merely
    // hang off the cycle keep their parent.
    for i in 0..unique.len() {
        if visited.contains(&i) {
            continue;
        }
        let promoted = cycle_member(i, &parent_of);
        warnings.push(HierarchyWarning::Cycle {
            marker: unique[promoted].id.clone(),
        });
        insert_root(&mut forest, promoted, &unique, &children, &mut visited);
    }

    for warning in &warnings {
        match warning {
            HierarchyWarning::Duplicate { .. } => debug!(%warning, "Duplicate marker ignored"),
            _ => warn!(%warning, "Marker hierarchy repaired"),
        }
    }
    debug!(
        markers = unique.len(),
        roots = forest.root_count(),
        "Built marker forest"
    );

    ForestReport { forest, warnings }
}

/// Follow parents from `start` until one repeats
fn cycle_member(start: usize, parent_of: &[Option<usize>]) -> usize {
    let mut path = HashSet::new();
    let mut current = start;
    while path.insert(current) {
        match parent_of[current] {
            Some(parent) => current = parent,
            None => return start,
        }
    }
    current
}

struct Frame {
    marker: usize,
    next: usize,
    entries: Vec<MarkerEntry>,
}

impl Frame {
    fn new(marker: usize) -> Self {
        Self {
            marker,
            next: 0,
            entries: vec![],
        }
    }
}

/// Insert `root` and every unvisited marker below it, depth first with an
/// explicit stack
fn insert_root(
    forest: &mut MarkerForest,
    root: usize,
    unique: &[&MarkerDecl],
    children: &[Vec<usize>],
    visited: &mut HashSet<usize>,
) {
    visited.insert(root);
    let mut stack = vec![Frame::new(root)];

    while let Some(frame) = stack.last_mut() {
        if let Some(&child) = children[frame.marker].get(frame.next) {
            frame.next += 1;
            if visited.insert(child) {
                stack.push(Frame::new(child));
            }
            continue;
        }

        let Some(done) = stack.pop() else { break };
        let decl = unique[done.marker];
        match stack.last_mut() {
            Some(parent) => parent.entries.push(MarkerEntry {
                id: decl.id.clone(),
                description: decl.description.clone(),
                children: done.entries,
            }),
            None => forest.insert_root(
                decl.id.clone(),
                MarkerNode {
                    description: decl.description.clone(),
                    children: done.entries,
                },
            ),
        }
    }
}

/// Flatten a forest back into declarations, parents before children
pub fn flatten_forest(forest: &MarkerForest) -> Vec<MarkerDecl> {
    let mut out = Vec::with_capacity(forest.marker_count());
    for (id, node) in forest.roots() {
        out.push(MarkerDecl {
            id: id.clone(),
            description: node.description.clone(),
            parent: None,
        });

        let mut stack: Vec<(&MarkerId, &MarkerEntry)> =
            node.children.iter().rev().map(|entry| (id, entry)).collect();
        while let Some((parent, entry)) = stack.pop() {
            out.push(MarkerDecl {
                id: entry.id.clone(),
                description: entry.description.clone(),
                parent: Some(parent.clone()),
            });
            stack.extend(entry.children.iter().rev().map(|child| (&entry.id, child)));
        }
    }
    out
}

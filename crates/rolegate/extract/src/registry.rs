//! Declarative marker registration

use rolegate_types::{MarkerDecl, MarkerId};
use std::collections::HashMap;
use tracing::debug;

/// Collects markers declared by fragment authors.
///
/// Declaring an id twice returns the first descriptor unchanged.
#[derive(Debug, Default)]
pub struct MarkerRegistry {
    markers: Vec<MarkerDecl>,
    index: HashMap<MarkerId, usize>,
}

impl MarkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a marker and return its descriptor
    pub fn declare(
        &mut self,
        id: &str,
        description: Option<&str>,
        parent: Option<&str>,
    ) -> MarkerDecl {
        let decl = MarkerDecl::new(id, description, parent);
        if let Some(&existing) = self.index.get(&decl.id) {
            debug!(marker = %decl.id, "Marker already declared, keeping first declaration");
            return self.markers[existing].clone();
        }

        self.index.insert(decl.id.clone(), self.markers.len());
        self.markers.push(decl.clone());
        decl
    }

    pub fn get(&self, id: &str) -> Option<&MarkerDecl> {
        self.index.get(id).map(|&i| &self.markers[i])
    }

    /// Declarations in registration order
    pub fn markers(&self) -> &[MarkerDecl] {
        &self.markers
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

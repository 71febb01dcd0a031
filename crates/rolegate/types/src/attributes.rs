//! Attribute names under which fragments declare their marker

use serde::{Deserialize, Serialize};

/// The three co-located attributes of a marker declaration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerAttributes {
    /// Attribute holding the marker id
    #[serde(default = "default_id")]
    pub id: String,

    /// Attribute holding the human description
    #[serde(default = "default_description")]
    pub description: String,

    /// Attribute holding the parent marker id
    #[serde(default = "default_parent")]
    pub parent: String,
}

impl Default for MarkerAttributes {
    fn default() -> Self {
        Self {
            id: default_id(),
            description: default_description(),
            parent: default_parent(),
        }
    }
}

fn default_id() -> String {
    "data-permission".to_string()
}

fn default_description() -> String {
    "data-permission-desc".to_string()
}

fn default_parent() -> String {
    "data-permission-parent".to_string()
}

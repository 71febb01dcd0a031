//! Rolegate Extract - marker discovery
//!
//! Markers reach the registry through two paths:
//!
//! - **Declarative registration** ([`MarkerRegistry`]): fragment authors
//!   call `declare` and receive a typed [`MarkerDecl`] they stamp onto
//!   their fragment.
//! - **Scanning** ([`MarkerExtractor`]): a live [`ViewTree`] or serialized
//!   markup is searched for the three marker attributes.
//!
//! Both paths deduplicate by id with first occurrence winning, and neither
//! has persistence side effects.
//!
//! [`ViewTree`]: rolegate_view::ViewTree

#![deny(unsafe_code)]

mod error;
mod markup;
mod registry;
mod source;

pub use error::{ExtractError, ExtractResult};
pub use markup::MarkupScanner;
pub use registry::MarkerRegistry;
pub use source::{extract_markers, MarkerExtractor, ViewSource};

use rolegate_types::MarkerDecl;
use std::collections::HashSet;

/// Drop later declarations of an id that was already seen
pub fn dedupe_first_wins<I>(markers: I) -> Vec<MarkerDecl>
where
    I: IntoIterator<Item = MarkerDecl>,
{
    let mut seen = HashSet::new();
    markers
        .into_iter()
        .filter(|decl| seen.insert(decl.id.clone()))
        .collect()
}

//! Extraction entry points over live and serialized views

use crate::{dedupe_first_wins, ExtractResult, MarkupScanner};
use rolegate_types::{MarkerAttributes, MarkerDecl};
use rolegate_view::ViewTree;
use tracing::debug;

/// What to scan for markers
pub enum ViewSource<'a> {
    /// A rendered view; markers come from its attached fragments
    Live(&'a dyn ViewTree),
    /// Raw serialized view source
    Markup(&'a str),
}

/// Marker extractor configured with the attribute names to look for
#[derive(Debug, Clone)]
pub struct MarkerExtractor {
    scanner: MarkupScanner,
}

impl MarkerExtractor {
    pub fn new(attributes: MarkerAttributes) -> ExtractResult<Self> {
        Ok(Self {
            scanner: MarkupScanner::new(&attributes)?,
        })
    }

    /// Markers declared in `source`, deduplicated by id (first wins)
    pub fn extract(&self, source: ViewSource<'_>) -> Vec<MarkerDecl> {
        let markers = match source {
            ViewSource::Live(view) => {
                dedupe_first_wins(view.marked_fragments().into_iter().map(|m| m.marker))
            }
            ViewSource::Markup(text) => self.scanner.scan(text),
        };
        debug!(count = markers.len(), "Extracted markers");
        markers
    }

    /// Markers across several sources, deduplicated across all of them
    pub fn extract_all<'a, I>(&self, sources: I) -> Vec<MarkerDecl>
    where
        I: IntoIterator<Item = ViewSource<'a>>,
    {
        dedupe_first_wins(
            sources
                .into_iter()
                .flat_map(|source| self.extract(source)),
        )
    }
}

/// Extract markers using the default attribute names
pub fn extract_markers(source: ViewSource<'_>) -> ExtractResult<Vec<MarkerDecl>> {
    Ok(MarkerExtractor::new(MarkerAttributes::default())?.extract(source))
}

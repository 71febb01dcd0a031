//! Marker scanning over serialized markup

use crate::{dedupe_first_wins, ExtractError, ExtractResult};
use regex::Regex;
use rolegate_types::{MarkerAttributes, MarkerDecl};
use std::collections::HashMap;
use tracing::trace;

const TAG_PATTERN: &str = r#"<[A-Za-z][A-Za-z0-9:_.-]*((?:\s+[^\s"'<>/=]+(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s"'<>]+))?)*)\s*/?>"#;
const ATTRIBUTE_PATTERN: &str = r#"([^\s"'<>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'<>]+)))?"#;

/// Finds marker declarations in markup text.
///
/// Each opening tag is parsed into its attribute set first, so the order in
/// which the three marker attributes appear inside a tag does not matter.
#[derive(Debug, Clone)]
pub struct MarkupScanner {
    id: String,
    description: String,
    parent: String,
    tag: Regex,
    attribute: Regex,
}

impl MarkupScanner {
    pub fn new(attributes: &MarkerAttributes) -> ExtractResult<Self> {
        Ok(Self {
            id: attribute_name(&attributes.id)?,
            description: attribute_name(&attributes.description)?,
            parent: attribute_name(&attributes.parent)?,
            tag: Regex::new(TAG_PATTERN)?,
            attribute: Regex::new(ATTRIBUTE_PATTERN)?,
        })
    }

    /// Marker declarations in document order, first occurrence per id
    pub fn scan(&self, markup: &str) -> Vec<MarkerDecl> {
        let found = self.tag.captures_iter(markup).filter_map(|tag| {
            let attrs = self.attributes(tag.get(1).map(|m| m.as_str()).unwrap_or(""));
            let id = attrs.get(self.id.as_str())?;
            if id.trim().is_empty() {
                return None;
            }
            trace!(marker = %id, "Marker found in markup");
            Some(MarkerDecl::new(
                id.as_str(),
                attrs.get(self.description.as_str()).map(String::as_str),
                attrs.get(self.parent.as_str()).map(String::as_str),
            ))
        });

        dedupe_first_wins(found)
    }

    fn attributes(&self, section: &str) -> HashMap<String, String> {
        let mut attrs = HashMap::new();
        for cap in self.attribute.captures_iter(section) {
            let Some(name) = cap.get(1) else { continue };
            let value = cap
                .get(2)
                .or_else(|| cap.get(3))
                .or_else(|| cap.get(4))
                .map(|m| unescape(m.as_str()))
                .unwrap_or_default();
            attrs
                .entry(name.as_str().to_ascii_lowercase())
                .or_insert(value);
        }
        attrs
    }
}

fn attribute_name(name: &str) -> ExtractResult<String> {
    let valid = !name.is_empty()
        && !name
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | '<' | '>' | '/' | '='));
    if valid {
        Ok(name.to_ascii_lowercase())
    } else {
        Err(ExtractError::InvalidAttribute(name.to_string()))
    }
}

fn unescape(value: &str) -> String {
    value
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scanner() -> MarkupScanner {
        MarkupScanner::new(&MarkerAttributes::default()).unwrap()
    }

    #[test]
    fn test_scans_all_three_attributes_in_any_order() {
        let markup = r#"
            <div data-permission-parent="orders" class="x" data-permission="orders.edit"
                 data-permission-desc="Edit an order">
            <button data-permission='orders' data-permission-desc='Orders'/>
        "#;
        let markers = scanner().scan(markup);

        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].id.as_str(), "orders.edit");
        assert_eq!(markers[0].description, "Edit an order");
        assert_eq!(markers[0].parent.as_ref().unwrap().as_str(), "orders");
        assert_eq!(markers[1].id.as_str(), "orders");
        assert!(markers[1].parent.is_none());
    }

    #[test]
    fn test_duplicate_ids_keep_first_description() {
        let markup = r#"
            <a data-permission="view-x" data-permission-desc="First">
            <a data-permission="view-x" data-permission-desc="Second">
        "#;
        let markers = scanner().scan(markup);

        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].description, "First");
    }

    #[test]
    fn test_missing_description_uses_sentinel() {
        let markers = scanner().scan(r#"<span data-permission=warehouse.list>"#);
        assert_eq!(markers.len(), 1);
        assert!(markers[0].needs_description());
        assert!(markers[0].parent.is_none());
    }

    #[test]
    fn test_ignores_empty_ids_and_unmarked_tags() {
        let markup = r#"<div data-permission=""><p class="a">text</p><br/>"#;
        assert!(scanner().scan(markup).is_empty());
    }

    #[test]
    fn test_entities_are_decoded() {
        let markers =
            scanner().scan(r#"<b data-permission="m" data-permission-desc="Molds &amp; dies">"#);
        assert_eq!(markers[0].description, "Molds & dies");
    }

    #[test]
    fn test_custom_attribute_names() {
        let attributes = MarkerAttributes {
            id: "data-cap".into(),
            description: "data-cap-desc".into(),
            parent: "data-cap-parent".into(),
        };
        let scanner = MarkupScanner::new(&attributes).unwrap();
        let markers = scanner.scan(r#"<i DATA-CAP="tech" data-permission="ignored">"#);

        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].id.as_str(), "tech");
    }

    #[test]
    fn test_rejects_invalid_attribute_name() {
        let attributes = MarkerAttributes {
            id: "data cap".into(),
            ..MarkerAttributes::default()
        };
        assert!(matches!(
            MarkupScanner::new(&attributes),
            Err(ExtractError::InvalidAttribute(_))
        ));
    }
}

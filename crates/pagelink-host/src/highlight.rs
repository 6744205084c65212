//! Visual highlight overlay.
//!
//! Highlights live in a layer above the document; marking an element never
//! touches its attributes, so highlighting does not trigger the watcher.

use pagelink_dom::{Document, NodeId};
use pagelink_protocols::Selector;

use crate::error::HostError;

pub const DEFAULT_COLOR: &str = "#ffcc00";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Highlight {
    pub node: NodeId,
    pub color: String,
}

#[derive(Debug, Default)]
pub struct HighlightLayer {
    entries: Vec<Highlight>,
}

impl HighlightLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Highlight every element `selector` matches. Returns how many.
    pub fn highlight(
        &mut self,
        doc: &Document,
        selector: &Selector,
        color: Option<&str>,
    ) -> Result<usize, HostError> {
        let color = color.unwrap_or(DEFAULT_COLOR);
        if parse_color(color).is_none() {
            return Err(HostError::InvalidArguments(format!("Unsupported color: {}", color)));
        }
        let nodes = pagelink_query::resolve(doc, selector, None);
        for &node in &nodes {
            match self.entries.iter_mut().find(|h| h.node == node) {
                Some(existing) => existing.color = color.to_string(),
                None => self.entries.push(Highlight {
                    node,
                    color: color.to_string(),
                }),
            }
        }
        Ok(nodes.len())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[Highlight] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parse `#rgb` / `#rrggbb` or a handful of color names into RGBA.
pub fn parse_color(color: &str) -> Option<[u8; 4]> {
    let named = match color.trim().to_ascii_lowercase().as_str() {
        "red" => Some([255, 0, 0, 255]),
        "green" => Some([0, 128, 0, 255]),
        "blue" => Some([0, 0, 255, 255]),
        "yellow" => Some([255, 255, 0, 255]),
        "orange" => Some([255, 165, 0, 255]),
        "black" => Some([0, 0, 0, 255]),
        "white" => Some([255, 255, 255, 255]),
        _ => None,
    };
    if named.is_some() {
        return named;
    }

    let hex = color.trim().strip_prefix('#')?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        3 => {
            let mut rgba = [0, 0, 0, 255];
            for (i, c) in hex.chars().enumerate() {
                let digit = channel(&c.to_string())?;
                rgba[i] = digit * 17;
            }
            Some(rgba)
        }
        6 => Some([
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
            255,
        ]),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highlight_counts_and_recolors() {
        let doc =
            Document::parse_html("<ul><li>a</li><li>b</li></ul>", "https://a.test/").unwrap();
        let mut layer = HighlightLayer::new();

        assert_eq!(layer.highlight(&doc, &Selector::rule("li"), None).unwrap(), 2);
        assert_eq!(layer.highlight(&doc, &Selector::rule("li"), Some("red")).unwrap(), 2);
        assert_eq!(layer.len(), 2);
        assert!(layer.entries().iter().all(|h| h.color == "red"));
        assert!(!doc.has_pending_records());

        assert_eq!(layer.highlight(&doc, &Selector::rule("p"), None).unwrap(), 0);
        layer.clear();
        assert!(layer.is_empty());
    }

    #[test]
    fn test_parse_color() {
        assert_eq!(parse_color("#ffcc00"), Some([255, 204, 0, 255]));
        assert_eq!(parse_color("#0f0"), Some([0, 255, 0, 255]));
        assert_eq!(parse_color("Blue"), Some([0, 0, 255, 255]));
        assert_eq!(parse_color("#12"), None);
        assert_eq!(parse_color("chartreuse"), None);
        assert_eq!(parse_color("#aééb"), None);
        assert_eq!(parse_color("#ééé"), None);
        assert_eq!(parse_color("#gg0000"), None);
    }

    #[test]
    fn test_highlight_rejects_unparseable_color() {
        let doc = Document::parse_html("<p>a</p>", "https://a.test/").unwrap();
        let mut layer = HighlightLayer::new();
        let err = layer
            .highlight(&doc, &Selector::rule("p"), Some("#aééb"))
            .unwrap_err();
        assert!(matches!(err, HostError::InvalidArguments(_)));
        assert!(layer.is_empty());
    }
}

//! Evaluation results.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Viewport-relative bounding box of an element.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coords {
    pub x: f64,
    pub y: f64,
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
    pub width: f64,
    pub height: f64,
}

impl Coords {
    /// Build from origin and size the way the host reports a client rect.
    pub fn from_rect(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            left: x,
            right: x + width,
            top: y,
            bottom: y + height,
            width,
            height,
        }
    }
}

/// Structured snapshot of one matched element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementSnapshot {
    pub attrs: BTreeMap<String, Value>,
    /// Position within this query's own match list.
    pub index: usize,
    pub coords: Coords,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<BTreeMap<String, Vec<ElementSnapshot>>>,
}

/// Evaluation of a whole query map at one instant.
pub type QueryMapResult = BTreeMap<String, Vec<ElementSnapshot>>;

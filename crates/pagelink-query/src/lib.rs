//! pagelink query - selector resolution and snapshot evaluation
//!
//! Two addressing schemes locate elements: RULE patterns are structural
//! stylesheet-style selectors, PATH patterns are a path-query language.
//! Both produce element lists in document order; [`resolve`] then slices the
//! list by the selector's range.
//!
//! Malformed patterns never fail the caller. A missing element is a normal
//! transient state of a live document, so resolution degrades to an empty
//! list and logs a warning.

mod error;
mod evaluate;
mod path;
mod range;
mod resolve;
mod rule;

pub use error::SelectorError;
pub use evaluate::{evaluate, evaluate_map, snapshot};
pub use path::PathExpr;
pub use range::apply_range;
pub use resolve::{resolve, try_resolve};
pub use rule::RuleSelector;

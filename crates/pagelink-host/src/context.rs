//! The document-access context.

use pagelink_dom::{Document, Rect};
use pagelink_protocols::HostCall;
use pagelink_watcher::{MutationWatcher, PushSink, TickReport};
use serde_json::{Value, json};
use tracing::debug;

use crate::actions;
use crate::capture::{self, ScreenCapture, WireframeCapture};
use crate::clipboard::{ClipboardBackend, MemoryClipboard};
use crate::error::HostError;
use crate::fetch::{self, PreparedFetch};
use crate::highlight::HighlightLayer;

/// Outcome of dispatching a call.
#[derive(Debug)]
pub enum Dispatch {
    /// Finished; this is the response payload.
    Done(Value),
    /// Needs network I/O, performed off the document thread.
    Fetch(PreparedFetch),
}

/// Single owner of the host document and everything that observes or
/// drives it.
pub struct HostContext {
    document: Document,
    watcher: MutationWatcher,
    highlights: HighlightLayer,
    clipboard: Box<dyn ClipboardBackend>,
    capture: Box<dyn ScreenCapture>,
}

impl HostContext {
    pub fn new(document: Document, push: PushSink) -> Self {
        Self {
            document,
            watcher: MutationWatcher::new(push),
            highlights: HighlightLayer::new(),
            clipboard: Box::new(MemoryClipboard::new()),
            capture: Box::new(WireframeCapture::new()),
        }
    }

    pub fn with_clipboard(mut self, clipboard: impl ClipboardBackend + 'static) -> Self {
        self.clipboard = Box::new(clipboard);
        self
    }

    pub fn with_capture(mut self, capture: impl ScreenCapture + 'static) -> Self {
        self.capture = Box::new(capture);
        self
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn watcher(&self) -> &MutationWatcher {
        &self.watcher
    }

    pub fn highlights(&self) -> &HighlightLayer {
        &self.highlights
    }

    /// Drain pending mutation records; true if the watcher should tick.
    pub fn observe(&mut self) -> bool {
        self.watcher.observe(&mut self.document)
    }

    pub fn tick(&mut self) -> TickReport {
        self.watcher.tick(&mut self.document)
    }

    /// Execute one call against the document.
    pub fn dispatch(&mut self, call: HostCall) -> Result<Dispatch, HostError> {
        debug!("dispatch {}", call.name());
        let doc = &mut self.document;
        let value = match call {
            HostCall::EvaluateQuery { query } => {
                serde_json::to_value(pagelink_query::evaluate(doc, &query, None))?
            }
            HostCall::EvaluateQueryMap { query_map } => {
                serde_json::to_value(pagelink_query::evaluate_map(doc, &query_map, None))?
            }
            HostCall::RegisterQueryMap { query_map } => {
                serde_json::to_value(self.watcher.register(doc, query_map))?
            }
            HostCall::UnregisterQueryMap { id } => Value::Bool(self.watcher.unregister(id)),
            HostCall::RegisterNativeEvent { selector, events } => {
                serde_json::to_value(self.watcher.attach_listener(doc, selector, events))?
            }
            HostCall::RemoveNativeEvent { id } => Value::Bool(self.watcher.remove_listener(doc, id)),
            HostCall::Click { selector } => {
                actions::click(doc, &selector)?;
                Value::Null
            }
            HostCall::DoubleClick { selector } => {
                actions::double_click(doc, &selector)?;
                Value::Null
            }
            HostCall::TypeText {
                selector,
                text,
                append,
            } => {
                actions::type_text(doc, &selector, &text, append)?;
                Value::Null
            }
            HostCall::SelectOption { selector, value } => {
                actions::select_option(doc, &selector, &value)?;
                Value::Null
            }
            HostCall::DragDrop { source, target } => {
                actions::drag_drop(doc, &source, &target)?;
                Value::Null
            }
            HostCall::Screenshot { selector } => {
                let region = match selector {
                    Some(selector) => {
                        let node = actions::first_match(doc, &selector)?;
                        doc.layout(node)
                            .ok_or_else(|| HostError::NoLayout(selector.pattern.clone()))?
                    }
                    None => {
                        let viewport = doc.viewport();
                        Rect::new(
                            viewport.scroll_x,
                            viewport.scroll_y,
                            viewport.width,
                            viewport.height,
                        )
                    }
                };
                let shot =
                    capture::screenshot(self.capture.as_mut(), doc, &self.highlights, region)?;
                serde_json::to_value(shot)?
            }
            HostCall::Fetch(request) => return Ok(Dispatch::Fetch(fetch::prepare(doc, request)?)),
            HostCall::ReadClipboard => Value::String(self.clipboard.read_text()?),
            HostCall::WriteClipboard { text } => {
                self.clipboard.write_text(&text)?;
                Value::Null
            }
            HostCall::Highlight { selector, color } => {
                json!(self.highlights.highlight(doc, &selector, color.as_deref())?)
            }
            HostCall::ClearHighlights => {
                self.highlights.clear();
                Value::Null
            }
            HostCall::GetLocation => Value::String(doc.url().to_string()),
        };
        Ok(Dispatch::Done(value))
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;

use std::sync::{Arc, Mutex};

use pagelink_dom::{DomEvent, Listener};

use super::*;

const PAGE: &str = r#"<html><body>
<form id="f">
  <input id="q" value="old">
  <select id="size"><option value="s">Small</option><option value="m" selected>Medium</option><option>Large</option></select>
  <div id="note">Hi</div>
</form>
<ul><li id="a">A</li><li id="b">B</li></ul>
</body></html>"#;

fn page() -> Document {
    Document::parse_html(PAGE, "https://shop.test/").unwrap()
}

/// Record `events` fired at or bubbling through `node`.
fn record(doc: &mut Document, node: NodeId, events: &[&str]) -> Arc<Mutex<Vec<String>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = log.clone();
    let listener: Listener = Arc::new(move |event: &DomEvent| {
        sink.lock().unwrap().push(event.event_type.clone());
    });
    for event in events {
        doc.add_event_listener(node, event, listener.clone()).unwrap();
    }
    log
}

#[test]
fn test_click_fires_mouse_sequence_and_focuses() {
    let mut doc = page();
    let target = doc.get_element_by_id("a").unwrap();
    let log = record(&mut doc, target, &["mousedown", "mouseup", "click", "dblclick"]);

    click(&mut doc, &Selector::rule("li")).unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["mousedown", "mouseup", "click"]);
    assert_eq!(doc.active_element(), Some(target));
}

#[test]
fn test_double_click_adds_dblclick() {
    let mut doc = page();
    let target = doc.get_element_by_id("b").unwrap();
    let log = record(&mut doc, target, &["click", "dblclick"]);

    double_click(&mut doc, &Selector::rule("#b")).unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["click", "dblclick"]);
}

#[test]
fn test_click_bubbles_to_ancestors() {
    let mut doc = page();
    let form = doc.get_element_by_id("f").unwrap();
    let log = record(&mut doc, form, &["click"]);

    click(&mut doc, &Selector::rule("#note")).unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["click"]);
}

#[test]
fn test_no_match_is_error() {
    let mut doc = page();
    let err = click(&mut doc, &Selector::rule("#missing")).unwrap_err();
    assert_eq!(err.to_string(), "No element matches '#missing'");
}

#[test]
fn test_type_text_into_input() {
    let mut doc = page();
    let input = doc.get_element_by_id("q").unwrap();
    let log = record(&mut doc, input, &["input", "change"]);

    type_text(&mut doc, &Selector::rule("#q"), "new", false).unwrap();
    assert_eq!(doc.get_attribute(input, "value"), Some("new"));
    type_text(&mut doc, &Selector::rule("#q"), "er", true).unwrap();
    assert_eq!(doc.get_attribute(input, "value"), Some("newer"));
    assert_eq!(*log.lock().unwrap(), vec!["input", "change", "input", "change"]);
    assert_eq!(doc.active_element(), Some(input));
}

#[test]
fn test_type_text_into_plain_element() {
    let mut doc = page();
    let note = doc.get_element_by_id("note").unwrap();
    type_text(&mut doc, &Selector::rule("#note"), " there", true).unwrap();
    assert_eq!(doc.text_content(note), "Hi there");
    assert!(doc.has_pending_records());
}

#[test]
fn test_select_option_by_value_and_text() {
    let mut doc = page();
    let select = doc.get_element_by_id("size").unwrap();
    let log = record(&mut doc, select, &["change"]);

    select_option(&mut doc, &Selector::rule("#size"), "s").unwrap();
    let options: Vec<NodeId> = doc.element_children(select);
    assert!(doc.has_attribute(options[0], "selected"));
    assert!(!doc.has_attribute(options[1], "selected"));
    assert_eq!(doc.get_attribute(select, "value"), Some("s"));

    select_option(&mut doc, &Selector::rule("#size"), "Large").unwrap();
    assert!(doc.has_attribute(options[2], "selected"));
    assert!(!doc.has_attribute(options[0], "selected"));
    assert_eq!(log.lock().unwrap().len(), 2);
}

#[test]
fn test_select_option_errors() {
    let mut doc = page();
    assert!(matches!(
        select_option(&mut doc, &Selector::rule("#size"), "xl"),
        Err(HostError::NoOption(_))
    ));
    assert!(matches!(
        select_option(&mut doc, &Selector::rule("#q"), "s"),
        Err(HostError::WrongElement { expected: "select", .. })
    ));
}

#[test]
fn test_drag_drop_sequence() {
    let mut doc = page();
    let source = doc.get_element_by_id("a").unwrap();
    let target = doc.get_element_by_id("b").unwrap();
    let source_log = record(&mut doc, source, &["dragstart", "dragend"]);
    let target_log = record(&mut doc, target, &["dragenter", "dragover", "drop"]);

    drag_drop(&mut doc, &Selector::rule("#a"), &Selector::rule("#b")).unwrap();
    assert_eq!(*source_log.lock().unwrap(), vec!["dragstart", "dragend"]);
    assert_eq!(*target_log.lock().unwrap(), vec!["dragenter", "dragover", "drop"]);
}

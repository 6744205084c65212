use super::*;
use serde_json::json;

#[test]
fn test_call_wire_shape() {
    let call = HostCall::Click {
        selector: Selector::rule("#submit"),
    };
    let value = serde_json::to_value(&call).unwrap();
    assert_eq!(
        value,
        json!({"fn": "click", "args": {"selector": {"addressing": "RULE", "pattern": "#submit"}}})
    );
}

#[test]
fn test_call_query_map_uses_camel_case() {
    let call = HostCall::RegisterQueryMap {
        query_map: QueryMap::new(),
    };
    let value = serde_json::to_value(&call).unwrap();
    assert_eq!(value, json!({"fn": "registerQueryMap", "args": {"queryMap": {}}}));
}

#[test]
fn test_from_request_unit_variant_without_args() {
    let call = HostCall::from_request("readClipboard", Value::Null).unwrap();
    assert_eq!(call, HostCall::ReadClipboard);
}

#[test]
fn test_from_request_unit_variant_with_empty_args() {
    assert_eq!(
        HostCall::from_request("readClipboard", json!({})).unwrap(),
        HostCall::ReadClipboard
    );
    assert_eq!(
        HostCall::from_request("clearHighlights", json!([])).unwrap(),
        HostCall::ClearHighlights
    );
    assert_eq!(
        HostCall::from_request("getLocation", Value::Null).unwrap(),
        HostCall::GetLocation
    );
    assert!(HostCall::from_request("getLocation", json!({"extra": 1})).is_err());
}

#[test]
fn test_from_request_null_args_on_optional_fields() {
    let call = HostCall::from_request("screenshot", Value::Null).unwrap();
    assert_eq!(call, HostCall::Screenshot { selector: None });
    let call = HostCall::from_request("screenshot", json!({})).unwrap();
    assert_eq!(call, HostCall::Screenshot { selector: None });
}

#[test]
fn test_from_request_null_args_missing_required_field() {
    let err = HostCall::from_request("click", Value::Null).unwrap_err();
    assert!(err.to_string().contains("selector"));
}

#[test]
fn test_unit_calls_match_catalog() {
    for name in UNIT_CALLS {
        assert!(HostCall::catalog().iter().any(|f| f.name == *name));
        let call = HostCall::from_request(name, Value::Null).unwrap();
        assert_eq!(call.name(), *name);
    }
}

#[test]
fn test_from_request_unknown_function() {
    assert!(HostCall::from_request("formatDisk", json!({})).is_err());
}

#[test]
fn test_into_request_roundtrip() {
    let call = HostCall::TypeText {
        selector: Selector::rule("input"),
        text: "hello".to_string(),
        append: false,
    };
    let (name, args) = call.clone().into_request().unwrap();
    assert_eq!(name, "typeText");
    assert_eq!(args["text"], "hello");
    assert_eq!(HostCall::from_request(&name, args).unwrap(), call);
}

#[test]
fn test_fetch_defaults() {
    let call = HostCall::from_request("fetch", json!({"url": "https://example.com"})).unwrap();
    match call {
        HostCall::Fetch(req) => {
            assert_eq!(req.method, "GET");
            assert!(req.headers.is_empty());
            assert!(req.csrf.is_none());
        }
        other => panic!("unexpected call: {:?}", other),
    }
}

#[test]
fn test_catalog_matches_names() {
    let names: Vec<&str> = HostCall::catalog().iter().map(|f| f.name).collect();
    assert!(names.contains(&HostCall::GetLocation.name()));
    assert!(names.contains(&HostCall::ClearHighlights.name()));
    assert_eq!(names.len(), 18);
}

use std::collections::BTreeMap;

use pagelink_config::FetchConfig;
use pagelink_protocols::{
    FetchRequest, PushMessage, Query, QueryMap, Selector, SubscriptionId,
};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;

const WINDOW: Duration = Duration::from_millis(100);

fn start(url: &str) -> (HostHandle, mpsc::UnboundedReceiver<PushMessage>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let doc = Document::parse_html("<ul id='list'><li>one</li></ul>", url).unwrap();
    let context = HostContext::new(doc, tx);
    let fetcher = Fetcher::new(&FetchConfig::default()).unwrap();
    let (handle, _task) = HostRuntime::spawn(context, fetcher, WINDOW);
    (handle, rx)
}

fn list_map() -> QueryMap {
    let mut map = BTreeMap::new();
    map.insert("items".to_string(), Query::new(Selector::rule("li")));
    map
}

async fn append_item(handle: &HostHandle) {
    handle
        .mutate(|doc| {
            let list = doc.get_element_by_id("list").unwrap();
            let li = doc.create_element("li");
            doc.append_child(list, li).unwrap();
        })
        .await
        .unwrap();
}

fn subscription_push(rx: &mut mpsc::UnboundedReceiver<PushMessage>) -> Option<SubscriptionId> {
    match rx.try_recv() {
        Ok(PushMessage::Subscription(push)) => Some(push.id),
        _ => None,
    }
}

#[tokio::test]
async fn test_call_round_trip() {
    let (handle, _rx) = start("https://a.test/");
    assert_eq!(
        handle.call(HostCall::GetLocation).await.unwrap(),
        json!("https://a.test/")
    );
}

#[tokio::test]
async fn test_handler_decodes_requests() {
    let (handle, _rx) = start("https://a.test/");
    assert_eq!(
        handle.handle("getLocation", Value::Null).await,
        Ok(json!("https://a.test/"))
    );
    let err = handle.handle("launchMissiles", json!({})).await.unwrap_err();
    assert!(err.starts_with("Invalid call 'launchMissiles'"), "{}", err);
    let err = handle
        .handle("click", json!({"selector": {"addressing": "RULE", "pattern": "#none"}}))
        .await
        .unwrap_err();
    assert_eq!(err, "No element matches '#none'");
}

#[tokio::test]
async fn test_rejected_highlight_leaves_runtime_alive() {
    let (handle, _rx) = start("https://a.test/");
    let err = handle
        .call(HostCall::Highlight {
            selector: Selector::rule("li"),
            color: Some("#a\u{e9}\u{e9}b".to_string()),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, HostError::InvalidArguments(_)));

    let shot = handle.call(HostCall::Screenshot { selector: None }).await.unwrap();
    assert!(shot["data"].as_str().is_some_and(|d| !d.is_empty()));
    assert!(handle.is_running());
    assert_eq!(
        handle.call(HostCall::GetLocation).await.unwrap(),
        json!("https://a.test/")
    );
}

#[tokio::test]
async fn test_handler_accepts_empty_args_for_unit_calls() {
    let (handle, _rx) = start("https://a.test/");
    assert_eq!(handle.handle("clearHighlights", json!([])).await, Ok(Value::Null));
    assert_eq!(
        handle.handle("getLocation", json!({})).await,
        Ok(json!("https://a.test/"))
    );
}

#[tokio::test(start_paused = true)]
async fn test_mutation_notifies_after_quiet_window() {
    let (handle, mut rx) = start("https://a.test/");
    let id: SubscriptionId = serde_json::from_value(
        handle
            .call(HostCall::RegisterQueryMap {
                query_map: list_map(),
            })
            .await
            .unwrap(),
    )
    .unwrap();
    assert_eq!(subscription_push(&mut rx), Some(id));

    append_item(&handle).await;
    tokio::time::sleep(WINDOW / 2).await;
    assert_eq!(subscription_push(&mut rx), None);

    tokio::time::sleep(WINDOW).await;
    assert_eq!(subscription_push(&mut rx), Some(id));
}

#[tokio::test(start_paused = true)]
async fn test_burst_is_coalesced_into_one_push() {
    let (handle, mut rx) = start("https://a.test/");
    handle
        .call(HostCall::RegisterQueryMap {
            query_map: list_map(),
        })
        .await
        .unwrap();
    assert!(subscription_push(&mut rx).is_some());

    for _ in 0..5 {
        append_item(&handle).await;
        tokio::time::sleep(WINDOW / 4).await;
    }
    assert_eq!(subscription_push(&mut rx), None);

    tokio::time::sleep(WINDOW * 2).await;
    assert!(subscription_push(&mut rx).is_some());
    assert_eq!(subscription_push(&mut rx), None);
}

#[tokio::test(start_paused = true)]
async fn test_unchanged_result_is_not_pushed() {
    let (handle, mut rx) = start("https://a.test/");
    handle
        .call(HostCall::RegisterQueryMap {
            query_map: list_map(),
        })
        .await
        .unwrap();
    assert!(subscription_push(&mut rx).is_some());

    // Outside the matched elements.
    handle
        .mutate(|doc| {
            let list = doc.get_element_by_id("list").unwrap();
            doc.set_attribute(list, "data-seen", "1").unwrap();
        })
        .await
        .unwrap();
    tokio::time::sleep(WINDOW * 2).await;
    assert_eq!(subscription_push(&mut rx), None);
}

#[tokio::test]
async fn test_fetch_runs_off_the_document_task() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/me"))
        .and(header("X-CSRF", "tok"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"name\":\"ada\"}"))
        .mount(&mock_server)
        .await;

    let (handle, _rx) = start(&format!("{}/app", mock_server.uri()));
    handle
        .mutate(|doc| doc.set_cookie("csrf=tok"))
        .await
        .unwrap();

    let mut request = FetchRequest::get("/api/me");
    request.csrf = Some(pagelink_protocols::CsrfForwarding {
        cookie: "csrf".to_string(),
        header: "X-CSRF".to_string(),
    });
    let response = handle.call(HostCall::Fetch(request)).await.unwrap();
    assert_eq!(response["status"], json!(200));
    assert_eq!(response["body"], json!("{\"name\":\"ada\"}"));
}

#[tokio::test]
async fn test_shutdown_stops_runtime() {
    let (handle, _rx) = start("https://a.test/");
    handle.shutdown();
    let err = handle.call(HostCall::GetLocation).await.unwrap_err();
    assert!(matches!(err, HostError::Stopped));
}

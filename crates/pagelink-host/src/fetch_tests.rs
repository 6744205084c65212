use super::*;
use pagelink_protocols::CsrfForwarding;
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn doc_at(url: &str) -> Document {
    let mut doc = Document::new(url);
    doc.set_cookie("session=abc; csrftoken=t0k3n; theme=dark");
    doc
}

fn fetcher() -> Fetcher {
    Fetcher::new(&FetchConfig::default()).unwrap()
}

#[test]
fn test_prepare_resolves_relative_url() {
    let doc = doc_at("https://shop.test/cart/view");
    let prepared = prepare(&doc, FetchRequest::get("/api/items?page=2")).unwrap();
    assert_eq!(prepared.url.as_str(), "https://shop.test/api/items?page=2");
    assert_eq!(prepared.method, Method::GET);
}

#[test]
fn test_prepare_copies_csrf_cookie() {
    let doc = doc_at("https://shop.test/");
    let mut request = FetchRequest::get("https://shop.test/api");
    request.method = "post".to_string();
    request.csrf = Some(CsrfForwarding {
        cookie: "csrftoken".to_string(),
        header: "X-CSRFToken".to_string(),
    });
    let prepared = prepare(&doc, request).unwrap();
    assert_eq!(prepared.method, Method::POST);
    assert_eq!(prepared.headers.get("X-CSRFToken").map(String::as_str), Some("t0k3n"));
}

#[test]
fn test_prepare_missing_cookie_sends_without_header() {
    let doc = doc_at("https://shop.test/");
    let mut request = FetchRequest::get("https://shop.test/api");
    request.csrf = Some(CsrfForwarding {
        cookie: "xsrf".to_string(),
        header: "X-XSRF-TOKEN".to_string(),
    });
    let prepared = prepare(&doc, request).unwrap();
    assert!(prepared.headers.is_empty());
}

#[test]
fn test_prepare_rejects_bad_method() {
    let doc = doc_at("https://shop.test/");
    let mut request = FetchRequest::get("https://shop.test/");
    request.method = "GE T".to_string();
    assert!(matches!(prepare(&doc, request), Err(HostError::InvalidArguments(_))));
}

#[tokio::test]
async fn test_fetch_get() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("[1,2,3]")
                .insert_header("x-total", "3"),
        )
        .mount(&mock_server)
        .await;

    let doc = doc_at(&mock_server.uri());
    let prepared = prepare(&doc, FetchRequest::get("/items")).unwrap();
    let response = fetcher().execute(prepared).await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.body, "[1,2,3]");
    assert_eq!(response.headers.get("x-total").map(String::as_str), Some("3"));
    assert!(response.url.ends_with("/items"));
}

#[tokio::test]
async fn test_fetch_post_with_csrf_header() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/orders"))
        .and(header("X-CSRFToken", "t0k3n"))
        .and(body_string("{\"qty\":1}"))
        .respond_with(ResponseTemplate::new(201).set_body_string("created"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let doc = doc_at(&mock_server.uri());
    let mut request = FetchRequest::get(format!("{}/orders", mock_server.uri()));
    request.method = "POST".to_string();
    request.body = Some("{\"qty\":1}".to_string());
    request.csrf = Some(CsrfForwarding {
        cookie: "csrftoken".to_string(),
        header: "X-CSRFToken".to_string(),
    });

    let response = fetcher().execute(prepare(&doc, request).unwrap()).await.unwrap();
    assert_eq!(response.status, 201);
    assert_eq!(response.body, "created");
}

#[tokio::test]
async fn test_fetch_error_status_carries_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/secret"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .mount(&mock_server)
        .await;

    let doc = doc_at(&mock_server.uri());
    let err = fetcher()
        .execute(prepare(&doc, FetchRequest::get("/secret")).unwrap())
        .await
        .unwrap_err();
    match err {
        HostError::Fetch { status, body } => {
            assert_eq!(status, 403);
            assert_eq!(body, "forbidden");
        }
        other => panic!("expected fetch error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fetch_network_error() {
    let doc = doc_at("http://127.0.0.1:1/");
    let err = fetcher()
        .execute(prepare(&doc, FetchRequest::get("/")).unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, HostError::Network(_)));
}

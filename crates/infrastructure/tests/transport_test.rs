//! Integration tests for the reqwest transport against a local mock server.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::collections::BTreeMap;
use std::io::Write;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use apiprobe_application::{HttpTransport, TransportError};
use apiprobe_domain::{FileAttachment, HttpMethod, RequestBody, TestRequest};
use apiprobe_infrastructure::ReqwestTransport;

const TIMEOUT: Duration = Duration::from_secs(5);

fn transport() -> ReqwestTransport {
    ReqwestTransport::new().expect("transport")
}

#[tokio::test]
async fn test_captures_status_headers_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/1"))
        .respond_with(
            ResponseTemplate::new(404)
                .insert_header("x-request-id", "abc")
                .append_header("x-multi", "a")
                .append_header("x-multi", "b")
                .set_body_string(r#"{"error":"missing"}"#),
        )
        .mount(&server)
        .await;

    let request = TestRequest::get(format!("{}/users/1", server.uri()));
    let response = transport().send(&request, TIMEOUT).await.unwrap();

    assert_eq!(response.status, 404);
    assert_eq!(response.header("X-Request-Id"), Some("abc"));
    assert_eq!(response.header("x-multi"), Some("a, b"));
    assert_eq!(response.body, r#"{"error":"missing"}"#);
    assert_eq!(response.size, 19);
    assert!(response.elapsed > Duration::ZERO);
}

#[tokio::test]
async fn test_sends_headers_and_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "rust lang"))
        .and(query_param("page", "2"))
        .and(header("authorization", "Bearer t0k"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let request = TestRequest::get(format!("{}/search", server.uri()))
        .with_query("q", "rust lang")
        .with_query("page", "2")
        .with_header("Authorization", "Bearer t0k");
    let response = transport().send(&request, TIMEOUT).await.unwrap();

    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn test_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({"name": "ada", "admin": false})))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let request = TestRequest::new(HttpMethod::Post, format!("{}/users", server.uri()))
        .with_body(RequestBody::Json(json!({"name": "ada", "admin": false})));
    let response = transport().send(&request, TIMEOUT).await.unwrap();

    assert_eq!(response.status, 201);
}

#[tokio::test]
async fn test_explicit_content_type_wins() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(header("content-type", "application/vnd.api+json"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let request = TestRequest::new(HttpMethod::Put, format!("{}/doc", server.uri()))
        .with_header("Content-Type", "application/vnd.api+json")
        .with_body(RequestBody::Json(json!({"data": null})));
    let response = transport().send(&request, TIMEOUT).await.unwrap();

    assert_eq!(response.status, 204);
}

#[tokio::test]
async fn test_form_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string("password=p%40ss&user=ada+lovelace"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut fields = BTreeMap::new();
    fields.insert("user".to_string(), "ada lovelace".to_string());
    fields.insert("password".to_string(), "p@ss".to_string());
    let request = TestRequest::new(HttpMethod::Post, format!("{}/login", server.uri()))
        .with_body(RequestBody::Form(fields));
    let response = transport().send(&request, TIMEOUT).await.unwrap();

    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn test_multipart_upload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file_path = dir.path().join("report.csv");
    std::fs::File::create(&file_path)
        .unwrap()
        .write_all(b"id,name\n1,ada\n")
        .unwrap();

    let mut fields = BTreeMap::new();
    fields.insert("owner".to_string(), "qa".to_string());
    let request = TestRequest::new(HttpMethod::Post, format!("{}/upload", server.uri()))
        .with_body(RequestBody::Form(fields))
        .with_file("document", FileAttachment::new(&file_path));
    let response = transport().send(&request, TIMEOUT).await.unwrap();
    assert_eq!(response.status, 200);

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    let content_type = received[0]
        .headers
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.starts_with("multipart/form-data; boundary="));

    let body = String::from_utf8_lossy(&received[0].body);
    assert!(body.contains(r#"name="owner""#));
    assert!(body.contains(r#"name="document"; filename="report.csv""#));
    assert!(body.contains("text/csv"));
    assert!(body.contains("1,ada"));
}

#[tokio::test]
async fn test_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let request = TestRequest::get(format!("{}/slow", server.uri()));
    let error = transport()
        .send(&request, Duration::from_millis(50))
        .await
        .unwrap_err();

    assert_eq!(error, TransportError::Timeout { timeout_ms: 50 });
    assert!(error.is_timeout());
}

#[tokio::test]
async fn test_connection_refused() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let request = TestRequest::get(format!("http://127.0.0.1:{port}/"));
    let error = transport().send(&request, TIMEOUT).await.unwrap_err();

    assert_eq!(
        error,
        TransportError::ConnectionRefused {
            host: format!("127.0.0.1:{port}")
        }
    );
}

#[tokio::test]
async fn test_invalid_url() {
    let error = transport()
        .send(&TestRequest::get("definitely not a url"), TIMEOUT)
        .await
        .unwrap_err();
    assert!(matches!(error, TransportError::InvalidUrl(_)));
}

#[tokio::test]
async fn test_missing_upload_file_is_io_error() {
    let request = TestRequest::new(HttpMethod::Post, "http://127.0.0.1:9/upload")
        .with_file("f", FileAttachment::new("/no/such/file.bin"));
    let error = transport().send(&request, TIMEOUT).await.unwrap_err();
    assert!(matches!(error, TransportError::Io(_)));
}

#[tokio::test]
async fn test_redirect_policy() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("location", format!("{}/new", server.uri())),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(ResponseTemplate::new(200).set_body_string("moved here"))
        .mount(&server)
        .await;

    let transport = transport();
    let url = format!("{}/old", server.uri());

    let followed = transport
        .send(&TestRequest::get(&url), TIMEOUT)
        .await
        .unwrap();
    assert_eq!(followed.status, 200);
    assert_eq!(followed.body, "moved here");

    let not_followed = transport
        .send(
            &TestRequest::get(&url).with_transport_flags(false, true),
            TIMEOUT,
        )
        .await
        .unwrap();
    assert_eq!(not_followed.status, 302);
    assert!(not_followed.header("location").unwrap().ends_with("/new"));
}

//! HTTP client retry behaviour against a mock server.

use grocer_core::CoreError;
use grocer_fetch::{HttpClient, HttpError, RetryStrategy};
use serde_json::{Value, json};
use std::time::{Duration, Instant};
use wiremock::matchers::{body_string_contains, header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(attempts: u32) -> HttpClient {
    HttpClient::new().unwrap().with_retry_strategy(
        RetryStrategy::new(attempts)
            .with_base_delay(Duration::from_millis(10))
            .with_max_delay(Duration::from_millis(50)),
    )
}

#[tokio::test]
async fn test_transient_status_retried_until_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/products"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/products"))
        .and(query_param("filter.term", "milk"))
        .and(header("authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(1)
        .mount(&server)
        .await;

    let body: Value = client(3)
        .get_json(
            &format!("{}/products", server.uri()),
            &[("filter.term", "milk".to_string())],
            "tok",
        )
        .await
        .unwrap();
    assert_eq!(body, json!({"data": []}));
}

#[tokio::test]
async fn test_retries_exhausted_maps_to_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .expect(2)
        .mount(&server)
        .await;

    let err = client(2)
        .get_json::<Value>(&server.uri(), &[], "tok")
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(502));
    assert!(matches!(CoreError::from(err), CoreError::RemoteUnavailable(_)));
}

#[tokio::test]
async fn test_unauthorized_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/cart/add"))
        .respond_with(ResponseTemplate::new(401).set_body_string("expired"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(3)
        .put_json(
            &format!("{}/cart/add", server.uri()),
            &json!({"items": [{"upc": "1", "quantity": 1}]}),
            "stale",
        )
        .await
        .unwrap_err();
    assert_eq!(err.body(), Some("expired"));
    assert_eq!(CoreError::from(err), CoreError::Unauthorized);
}

#[tokio::test]
async fn test_client_error_maps_to_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such product"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(3)
        .get_json::<Value>(&server.uri(), &[], "tok")
        .await
        .unwrap_err();
    match CoreError::from(err) {
        CoreError::RemoteRejected { status, message } => {
            assert_eq!(status, 404);
            assert!(message.contains("no such product"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_retry_after_honoured() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "1"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let client = HttpClient::new().unwrap().with_retry_strategy(
        RetryStrategy::new(2)
            .with_base_delay(Duration::from_millis(1))
            .with_max_delay(Duration::from_secs(5)),
    );
    let started = Instant::now();
    let body: Value = client.get_json(&server.uri(), &[], "tok").await.unwrap();
    assert_eq!(body["ok"], true);
    assert!(started.elapsed() >= Duration::from_secs(1));
}

#[tokio::test]
async fn test_form_post_uses_basic_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/connect/oauth2/token"))
        .and(header_exists("authorization"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "a"})))
        .expect(1)
        .mount(&server)
        .await;

    let response = client(1)
        .post_form_basic(
            &format!("{}/connect/oauth2/token", server.uri()),
            &[("grant_type", "refresh_token"), ("refresh_token", "r")],
            "id",
            "secret",
        )
        .await
        .unwrap();
    assert!(response.status().is_success());

    let requests = server.received_requests().await.unwrap();
    let auth = requests[0].headers.get("authorization").unwrap();
    // base64("id:secret")
    assert_eq!(auth.to_str().unwrap(), "Basic aWQ6c2VjcmV0");
}

#[test]
fn test_invalid_url_is_config_error() {
    let err = HttpError::InvalidUrl("not a url".to_string());
    assert!(matches!(CoreError::from(err), CoreError::InvalidConfig(_)));
}

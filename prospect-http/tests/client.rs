use std::time::Duration;

use prospect_http::{ClientOptions, HttpClient, HttpError, RequestOpts};
use reqwest::StatusCode;
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn page_client() -> HttpClient {
    HttpClient::unanchored(ClientOptions::default())
        .expect("client")
        .with_backoff(Duration::from_millis(1))
}

#[tokio::test]
async fn get_text_returns_body_and_final_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/profile"))
        .and(header("user-agent", "ua-under-test"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string("<p>jane@firm.io</p>"),
        )
        .mount(&server)
        .await;

    let opts = RequestOpts {
        user_agent: Some("ua-under-test"),
        ..Default::default()
    };
    let resp = page_client()
        .get_text(&format!("{}/profile", server.uri()), opts)
        .await
        .expect("page");

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body, "<p>jane@firm.io</p>");
    assert_eq!(resp.final_url.path(), "/profile");
    assert_eq!(resp.content_type.as_deref(), Some("text/html"));
}

#[tokio::test]
async fn server_errors_are_retried_then_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({"message": "busy"})))
        .expect(3)
        .mount(&server)
        .await;

    let err = page_client()
        .with_retries(2)
        .get_text(&format!("{}/flaky", server.uri()), RequestOpts::default())
        .await
        .expect_err("should fail");

    match err {
        HttpError::Api { status, message, .. } => {
            assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
            assert_eq!(message, "busy");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn forbidden_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/blocked"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let err = page_client()
        .get_text(&format!("{}/blocked", server.uri()), RequestOpts::default())
        .await
        .expect_err("should fail");
    assert!(err.is_blocked());
}

#[tokio::test]
async fn form_post_is_urlencoded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/html/"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("q=site%3Agithub.com+%22designer%22"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let resp = page_client()
        .post_form_text(
            &format!("{}/html/", server.uri()),
            &[("q", "site:github.com \"designer\"")],
            RequestOpts::default(),
        )
        .await
        .expect("form post");
    assert_eq!(resp.body, "ok");
}

#[tokio::test]
async fn json_helpers_resolve_against_base() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/echo"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let client = HttpClient::new(&format!("{}/", server.uri())).expect("client");
    let got: serde_json::Value = client
        .post_json("v1/echo", Some(" sk-test "), &json!({"ping": 1}))
        .await
        .expect("json");
    assert_eq!(got["ok"], true);
}

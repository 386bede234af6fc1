mod common;

use std::sync::Arc;

use prospect_common::NameAssistant;
use prospect_llm::assist::LlmNameAssistant;
use prospect_llm::ollama::OllamaClient;
use prospect_llm::openai::OpenAiClient;
use prospect_llm::traits::LlmClient;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn responses_body(text: &str) -> serde_json::Value {
    json!({
        "id": "resp_1",
        "object": "response",
        "created_at": 0,
        "status": "completed",
        "model": "gpt-4o-mini",
        "output": [{
            "id": "msg_1",
            "type": "message",
            "status": "completed",
            "content": [{"type": "output_text", "text": text}]
        }],
        "usage": {"total_tokens": 42}
    })
}

#[tokio::test]
async fn openai_backed_assistant_parses_answer() {
    common::init_test_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/responses"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({"model": "gpt-4o-mini"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(responses_body(
            r#"{"name": "John Doe", "confidence": 0.88, "reasoning": "initial plus surname"}"#,
        )))
        .mount(&server)
        .await;

    let client = OpenAiClient::with_endpoint(
        &format!("{}/v1", server.uri()),
        "sk-test".into(),
        "gpt-4o-mini".into(),
    )
    .expect("client");
    let assistant = LlmNameAssistant::new(Arc::new(client));

    let got = assistant
        .infer_name_from_email("jdoe@business.com")
        .await
        .expect("call")
        .expect("answer");
    assert_eq!(got.name, "John Doe");
    assert!((got.confidence - 0.88).abs() < 1e-9);
    assert_eq!(got.reasoning, "initial plus surname");
}

#[tokio::test]
async fn provider_errors_surface_as_errors() {
    common::init_test_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/responses"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"error": {"message": "bad key"}})),
        )
        .mount(&server)
        .await;

    let client = OpenAiClient::with_endpoint(
        &format!("{}/v1", server.uri()),
        "sk-wrong".into(),
        "gpt-4o-mini".into(),
    )
    .expect("client");
    let assistant = LlmNameAssistant::new(Arc::new(client));

    let err = assistant
        .infer_name_from_email("jdoe@business.com")
        .await
        .expect_err("401 should fail");
    assert!(err.to_string().contains("bad key"));
}

#[tokio::test]
async fn ollama_batch_inference_round_trip() {
    common::init_test_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({"model": "llama3.2:3b", "stream": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": "```json\n[{\"email\": \"jdoe@x.io\", \"name\": \"J. Doe\", \"confidence\": 0.75}]\n```",
            "eval_count": 30
        })))
        .mount(&server)
        .await;

    let client = OllamaClient::unchecked(server.uri(), "llama3.2:3b".into()).expect("client");
    let assistant = LlmNameAssistant::new(Arc::new(client));

    let emails = vec!["jdoe@x.io".to_string(), "zz@x.io".to_string()];
    let got = assistant.batch_infer(&emails).await.expect("batch");
    assert_eq!(got.len(), 2);
    assert_eq!(got[0].as_ref().map(|a| a.name.as_str()), Some("J. Doe"));
    assert!(got[1].is_none());
}

#[tokio::test]
async fn oversized_batches_are_rejected() {
    let client = OllamaClient::unchecked("http://127.0.0.1:9".into(), "m".into()).expect("client");
    let assistant = LlmNameAssistant::new(Arc::new(client));
    let emails: Vec<String> = (0..11).map(|i| format!("u{i}@x.io")).collect();
    assert!(assistant.batch_infer(&emails).await.is_err());
}

#[tokio::test]
async fn ollama_health_check_reports_unreachable_server() {
    let client = OllamaClient::unchecked("http://127.0.0.1:9".into(), "m".into()).expect("client");
    assert!(!client.health_check().await.expect("health"));
}

#[tokio::test]
#[ignore]
async fn openai_live_smoketest() {
    common::init_test_tracing();
    let Ok(key) = std::env::var("OPENAI_API_KEY") else {
        return;
    };
    let client = OpenAiClient::new(key, prospect_llm::DEFAULT_OPENAI_MODEL.into()).expect("client");
    let assistant = LlmNameAssistant::new(Arc::new(client));
    let got = assistant.infer_name_from_email("jane.smith@gmail.com").await.expect("call");
    assert!(got.is_some());
}

use crate::traits::{LlmClient, LlmResponse};
use async_trait::async_trait;
use prospect_common::{ProspectError, Result};
use prospect_http::{HttpClient, HttpError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const OPENAI_API_BASE: &str = "https://api.openai.com/v1/";
const DEFAULT_INSTRUCTIONS: &str = "Answer briefly and exactly as instructed.";

/// OpenAI Responses API (`POST {endpoint}/responses`).
pub struct OpenAiClient {
    client: HttpClient,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct CreateResponse<'a> {
    model: &'a str,
    input: &'a str,
    instructions: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize)]
struct ResponseBody {
    model: String,
    #[serde(default)]
    output: Vec<OutputItem>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct OutputItem {
    #[serde(default)]
    content: Vec<ContentPart>,
}

#[derive(Deserialize)]
struct ContentPart {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct Usage {
    #[serde(default)]
    total_tokens: Option<u32>,
}

impl ResponseBody {
    /// All `output_text` parts, in order.
    fn text(&self) -> String {
        self.output
            .iter()
            .flat_map(|item| &item.content)
            .filter(|part| part.kind == "output_text")
            .map(|part| part.text.as_str())
            .collect()
    }
}

impl OpenAiClient {
    pub fn new(api_key: String, model: String) -> Result<Self> {
        Self::with_endpoint(OPENAI_API_BASE, api_key, model)
    }

    /// Any OpenAI-compatible base URL, e.g. a gateway or a mock server.
    pub fn with_endpoint(endpoint: &str, api_key: String, model: String) -> Result<Self> {
        let base = format!("{}/", endpoint.trim_end_matches('/'));
        let client = HttpClient::new(&base)
            .map_err(|e| ProspectError::Agent(format!("HttpClient init failed: {e}")))?;
        Ok(Self {
            client,
            api_key,
            model,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = self.client.with_timeout(timeout);
        self
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<LlmResponse> {
        let req = CreateResponse {
            model: &self.model,
            input: prompt,
            instructions: system_prompt.unwrap_or(DEFAULT_INSTRUCTIONS),
            max_output_tokens: max_tokens,
            temperature,
        };
        let body: ResponseBody = self
            .client
            .post_json("responses", Some(&self.api_key), &req)
            .await
            .map_err(agent_error)?;

        let text = body.text();
        tracing::debug!(
            target: "llm.openai",
            model = %body.model,
            text_len = text.len(),
            "llm.openai.generated"
        );
        Ok(LlmResponse {
            text,
            tokens_used: body.usage.and_then(|u| u.total_tokens),
            model: Some(body.model),
        })
    }

    async fn health_check(&self) -> Result<bool> {
        match self.generate("Reply with OK.", None, Some(16), Some(0.0)).await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!(target: "llm.openai", error = %e, "llm.openai.health_failed");
                Ok(false)
            }
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

fn agent_error(e: HttpError) -> ProspectError {
    match e {
        HttpError::Api { status, message, .. } => {
            ProspectError::Agent(format!("openai returned {status}: {message}"))
        }
        other => ProspectError::Agent(other.to_string()),
    }
}

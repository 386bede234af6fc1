use crate::traits::{LlmClient, LlmResponse};
use async_trait::async_trait;
use prospect_common::{ProspectError, Result};
use prospect_http::{HttpClient, HttpError, RequestOpts};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const NOT_RUNNING: &str =
    "no Ollama server answered; start one with `ollama serve` (https://github.com/ollama/ollama)";

/// Local models served by Ollama's `/api/generate`.
pub struct OllamaClient {
    client: HttpClient,
    model: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize, Default)]
struct GenerateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Deserialize)]
struct TagList {
    #[serde(default)]
    models: Vec<Tag>,
}

#[derive(Deserialize)]
struct Tag {
    name: String,
}

#[derive(Serialize)]
struct PullRequest<'a> {
    model: &'a str,
    stream: bool,
}

impl OllamaClient {
    /// Connect, then make sure `model` is pulled.
    pub async fn new(base_url: String, model: String) -> Result<Self> {
        let client = Self::unchecked(base_url, model)?;
        let installed = client.installed_models().await?;
        if !installed.iter().any(|m| m == &client.model) {
            tracing::info!(target: "llm.ollama", model = %client.model, "llm.ollama.pulling_model");
            client.pull().await?;
        }
        Ok(client)
    }

    /// No server round-trip.
    pub fn unchecked(base_url: String, model: String) -> Result<Self> {
        let base = format!("{}/", base_url.trim_end_matches('/'));
        let client = HttpClient::new(&base)
            .map_err(|e| ProspectError::Agent(format!("HttpClient init failed: {e}")))?
            .with_timeout(Duration::from_secs(60));
        Ok(Self { client, model })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = self.client.with_timeout(timeout);
        self
    }

    async fn installed_models(&self) -> Result<Vec<String>> {
        let tags: TagList = self
            .client
            .get_json(
                "api/tags",
                RequestOpts {
                    retries: Some(0),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| match e {
                HttpError::Network(_) => ProspectError::Agent(NOT_RUNNING.into()),
                other => ProspectError::Agent(format!("listing models: {other}")),
            })?;
        Ok(tags.models.into_iter().map(|t| t.name).collect())
    }

    async fn pull(&self) -> Result<()> {
        let body = PullRequest {
            model: &self.model,
            stream: false,
        };
        // Pulls can take minutes.
        let opts = RequestOpts {
            timeout: Some(Duration::from_secs(600)),
            retries: Some(0),
            ..Default::default()
        };
        let _: serde_json::Value = self
            .client
            .post_json_opts("api/pull", &body, opts)
            .await
            .map_err(|e| ProspectError::Agent(format!("pulling {}: {e}", self.model)))?;
        tracing::info!(target: "llm.ollama", model = %self.model, "llm.ollama.pulled_model");
        Ok(())
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<LlmResponse> {
        let req = GenerateRequest {
            model: &self.model,
            prompt,
            system: system_prompt,
            stream: false,
            options: GenerateOptions {
                temperature,
                num_predict: max_tokens,
            },
        };
        let resp: GenerateResponse = self
            .client
            .post_json_opts("api/generate", &req, RequestOpts::default())
            .await
            .map_err(|e| ProspectError::Agent(format!("ollama generate: {e}")))?;

        tracing::debug!(
            target: "llm.ollama",
            model = %self.model,
            text_len = resp.response.len(),
            "llm.ollama.generated"
        );
        Ok(LlmResponse {
            text: resp.response,
            model: Some(self.model.clone()),
            tokens_used: resp.eval_count,
        })
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.installed_models().await.is_ok())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

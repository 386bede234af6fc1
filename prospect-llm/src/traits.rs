use async_trait::async_trait;
use prospect_common::Result;
use serde::{Deserialize, Serialize};

/// Raw completion text plus whatever accounting the provider returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub text: String,
    pub model: Option<String>,
    pub tokens_used: Option<u32>,
}

/// Single-turn text completion, provider-agnostic.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// `max_tokens` and `temperature` fall back to provider defaults when
    /// `None`.
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<LlmResponse>;

    /// `Ok(false)` for an unreachable or misconfigured provider.
    async fn health_check(&self) -> Result<bool>;

    fn model_name(&self) -> &str;
}

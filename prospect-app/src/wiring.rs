use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use prospect_common::NameAssistant;
use prospect_config::{default_config_path, LlmConfig, ProspectConfig, ProspectConfigLoader};
use prospect_llm::assist::LlmNameAssistant;
use prospect_llm::ollama::OllamaClient;
use prospect_llm::openai::OpenAiClient;
use prospect_llm::traits::LlmClient;
use prospect_store::SqliteStore;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const LOCAL_CONFIG: &str = "prospect.yaml";

/// An explicit path must exist. Otherwise the platform config file, then
/// `./prospect.yaml`, are layered when present.
pub fn load_config(explicit: Option<&Path>) -> Result<ProspectConfig> {
    let loader = match explicit {
        Some(path) => ProspectConfigLoader::new().with_file(path),
        None => {
            let mut loader = ProspectConfigLoader::new();
            if let Some(global) = default_config_path() {
                loader = loader.with_optional_file(global);
            }
            loader.with_optional_file(LOCAL_CONFIG)
        }
    };
    loader.load().context("loading configuration")
}

pub async fn build_llm_client(cfg: &LlmConfig, timeout: Duration) -> Result<Arc<dyn LlmClient>> {
    match cfg {
        LlmConfig::Openai {
            model,
            auth_token,
            endpoint,
            ..
        } => {
            let client = OpenAiClient::with_endpoint(endpoint, auth_token.clone(), model.clone())?
                .with_timeout(timeout);
            Ok(Arc::new(client))
        }
        LlmConfig::Ollama {
            model, endpoint, ..
        } => {
            let client = OllamaClient::new(endpoint.clone(), model.clone()).await?;
            Ok(Arc::new(client))
        }
    }
}

/// `None` unless AI was requested and an LLM is configured and reachable.
/// The pipeline falls back to pattern inference either way.
pub async fn build_assistant(cfg: &ProspectConfig, use_ai: bool) -> Option<Arc<dyn NameAssistant>> {
    if !use_ai {
        return None;
    }
    let Some(llm) = &cfg.llm else {
        warn!(target: "app", "inference.no_llm_configured");
        return None;
    };
    let timeout = Duration::from_secs(cfg.inference.ai_timeout_secs);
    match build_llm_client(llm, timeout).await {
        Ok(client) => {
            info!(target: "app", model = %client.model_name(), "inference.assistant_ready");
            let assistant: Arc<dyn NameAssistant> = Arc::new(
                LlmNameAssistant::new(client).with_generation(llm.max_tokens(), llm.temperature()),
            );
            Some(assistant)
        }
        Err(e) => {
            warn!(target: "app", error = %e, "inference.assistant_unavailable");
            None
        }
    }
}

pub async fn open_store(cfg: &ProspectConfig) -> Result<SqliteStore> {
    let store = SqliteStore::connect(&cfg.store.database_url)
        .await
        .with_context(|| format!("opening {}", cfg.store.database_url))?;
    Ok(store.allow_synthetic(cfg.store.save_synthetic))
}

/// Cancel `token` on Ctrl-C or, on Unix, SIGTERM.
pub fn cancel_on_signal(token: CancellationToken) {
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = terminate() => {}
            _ = token.cancelled() => return,
        }
        warn!(target: "app", "run.interrupted");
        token.cancel();
    });
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
        Ok(mut sig) => {
            sig.recv().await;
        }
        Err(_) => std::future::pending::<()>().await,
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await
}

//! Wiring the pipeline from a loaded [`ProspectConfig`].

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use prospect_common::NameAssistant;
use prospect_config::ProspectConfig;
use prospect_drivers::chrome::behavioral::Pacing;
use prospect_drivers::{BrowserConfig, BrowserResource, SharedBrowser, UserAgentPool};
use prospect_extract::{
    AssistSettings, AssistedInferencer, EmailExtractor, NameInferencer, PatternInferencer,
};
use prospect_web::{
    BraveSearch, DuckDuckGoSearch, FetchSettings, PageFetcher, RenderedSearch,
};
use tracing::info;

use crate::orchestrator::{DiscoveryOrchestrator, OrchestratorSettings};
use crate::query::QueryBuilder;

/// Pattern rules, decorated with `assistant` when one is supplied.
pub fn build_inferencer(
    cfg: &ProspectConfig,
    assistant: Option<Arc<dyn NameAssistant>>,
) -> Result<Arc<dyn NameInferencer>> {
    let base = PatternInferencer::new().context("compiling name rules")?;
    Ok(match assistant {
        Some(assistant) => {
            let settings = AssistSettings {
                threshold: cfg.inference.threshold,
                call_timeout: Duration::from_secs(cfg.inference.ai_timeout_secs),
                batch_size: cfg.inference.batch_size,
                batch_pause: Duration::from_millis(cfg.inference.batch_pause_ms),
            };
            Arc::new(AssistedInferencer::new(base, assistant, settings))
        }
        None => Arc::new(base),
    })
}

/// Every engine the configuration allows, sharing one lazily launched browser.
///
/// Nothing is launched here; the browser starts on the first rendered fetch.
pub fn build_orchestrator(
    cfg: &ProspectConfig,
    assistant: Option<Arc<dyn NameAssistant>>,
) -> Result<DiscoveryOrchestrator> {
    let fetch = &cfg.fetch;
    let agents = UserAgentPool::from_user_agents(&fetch.user_agents);

    let browser: Arc<dyn BrowserResource> = Arc::new(SharedBrowser::new(
        BrowserConfig {
            webdriver_url: fetch.webdriver_url.clone(),
            headless: fetch.headless,
            launch_timeout: Duration::from_secs(fetch.launch_timeout_secs),
            op_timeout: Duration::from_secs(fetch.render_timeout_secs),
            extra_args: Vec::new(),
        },
        agents.clone(),
    ));

    let extractor = EmailExtractor::new().context("compiling email patterns")?;
    let pages = PageFetcher::new(
        agents.clone(),
        extractor,
        Some(browser.clone()),
        FetchSettings {
            http_timeout: Duration::from_secs(fetch.http_timeout_secs),
            http_retries: fetch.http_retries,
            max_redirects: fetch.max_redirects,
            render_timeout: Duration::from_secs(fetch.render_timeout_secs),
            settle: Duration::from_millis(fetch.settle_ms),
        },
    )
    .context("building page fetcher")?;

    let nav_timeout = Duration::from_secs(fetch.render_timeout_secs);
    let pacing = Pacing::new(
        Duration::from_millis(fetch.settle_ms),
        Duration::from_millis(fetch.settle_ms + fetch.settle_jitter_ms),
    );
    let http_timeout = Duration::from_secs(fetch.http_timeout_secs);

    let search = &cfg.search;
    let mut orchestrator = DiscoveryOrchestrator::new(
        QueryBuilder::new(search.sites.iter().cloned(), search.providers.iter().cloned()),
        Arc::new(pages),
        build_inferencer(cfg, assistant)?,
        OrchestratorSettings {
            max_queries: search.max_queries,
            results_per_query: search.results_per_query,
            query_delay: search.query_delay(),
            fetch_concurrency: fetch.concurrency,
            filter_by_provider: search.filter_by_provider,
            demo_enabled: cfg.demo.enabled,
        },
    )
    .with_browser(browser.clone())
    .with_engine(Arc::new(RenderedSearch::google(browser.clone(), nav_timeout, pacing)))
    .with_engine(Arc::new(RenderedSearch::bing(browser, nav_timeout, pacing)))
    .with_engine(Arc::new(
        DuckDuckGoSearch::new(agents, http_timeout).context("building duckduckgo client")?,
    ));

    if let Some(token) = search.brave_token.as_deref().filter(|t| !t.trim().is_empty()) {
        orchestrator = orchestrator.with_engine(Arc::new(
            BraveSearch::new(token, http_timeout).context("building brave client")?,
        ));
    }

    info!(
        target: "core.assemble",
        engines = ?orchestrator.engines(),
        default_engine = %search.engine,
        "pipeline.ready"
    );
    Ok(orchestrator)
}

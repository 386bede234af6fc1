//! The discovery run: queries, search, fetch, extract, name, assemble.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::stream::{self, StreamExt};
use prospect_common::{
    CandidateUrl, DiscoveryResult, ExtractionResult, InferenceMethod, ProspectError, Query,
    Result, SearchEngineKind,
};
use prospect_drivers::BrowserResource;
use prospect_extract::NameInferencer;
use prospect_web::{FetchError, PageSource, SearchEngine, SearchError};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::query::QueryBuilder;
use crate::synthetic;

/// Per-run knobs supplied by the caller.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// Maximum unique URLs visited.
    pub limit: usize,
    pub search_engine: SearchEngineKind,
    pub use_ai: bool,
    /// Substitute demo rows if live discovery finds nothing.
    pub demo: bool,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            limit: 10,
            search_engine: SearchEngineKind::default(),
            use_ai: false,
            demo: false,
        }
    }
}

/// Fixed behaviour configured once per process.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub max_queries: usize,
    pub results_per_query: usize,
    pub query_delay: Duration,
    /// Parallel page fetches.
    pub fetch_concurrency: usize,
    /// Keep only addresses at the provider the query targeted.
    pub filter_by_provider: bool,
    /// Demo mode regardless of [`DiscoveryOptions::demo`].
    pub demo_enabled: bool,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            max_queries: 3,
            results_per_query: 10,
            query_delay: Duration::from_secs(2),
            fetch_concurrency: 4,
            filter_by_provider: false,
            demo_enabled: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NoResultsReason {
    /// No engine returned a usable URL.
    NoUrls,
    /// Pages were visited but none carried an address.
    NoEmails,
    /// The caller cancelled before anything was found.
    Cancelled,
}

/// Why a run came back empty, and what it tried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoResultsExplanation {
    pub reason: NoResultsReason,
    pub sites: Vec<String>,
    pub providers: Vec<String>,
    pub queries_run: Vec<String>,
    pub urls_visited: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum DiscoveryOutcome {
    Found,
    NoResults(NoResultsExplanation),
    /// Live discovery found nothing and demo rows were substituted.
    Synthetic(NoResultsExplanation),
}

#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryReport {
    pub profile: String,
    pub search_engine: SearchEngineKind,
    pub outcome: DiscoveryOutcome,
    pub results: Vec<DiscoveryResult>,
    pub cancelled: bool,
    pub elapsed_ms: u64,
}

impl DiscoveryReport {
    pub fn is_synthetic(&self) -> bool {
        matches!(self.outcome, DiscoveryOutcome::Synthetic(_))
    }
}

/// One address found on one page, before naming.
struct Sighting {
    email: String,
    extraction: Arc<ExtractionResult>,
    provider: String,
}

pub struct DiscoveryOrchestrator {
    queries: QueryBuilder,
    engines: HashMap<SearchEngineKind, Arc<dyn SearchEngine>>,
    pages: Arc<dyn PageSource>,
    inferencer: Arc<dyn NameInferencer>,
    browser: Option<Arc<dyn BrowserResource>>,
    settings: OrchestratorSettings,
}

impl DiscoveryOrchestrator {
    pub fn new(
        queries: QueryBuilder,
        pages: Arc<dyn PageSource>,
        inferencer: Arc<dyn NameInferencer>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            queries,
            engines: HashMap::new(),
            pages,
            inferencer,
            browser: None,
            settings,
        }
    }

    /// Register (or replace) the engine for its kind.
    pub fn with_engine(mut self, engine: Arc<dyn SearchEngine>) -> Self {
        self.engines.insert(engine.kind(), engine);
        self
    }

    /// The shared browser this orchestrator tears down in [`shutdown`](Self::shutdown).
    pub fn with_browser(mut self, browser: Arc<dyn BrowserResource>) -> Self {
        self.browser = Some(browser);
        self
    }

    pub fn engines(&self) -> Vec<SearchEngineKind> {
        let mut kinds: Vec<_> = self.engines.keys().copied().collect();
        kinds.sort_by_key(|k| k.as_str());
        kinds
    }

    pub fn inferencer(&self) -> &Arc<dyn NameInferencer> {
        &self.inferencer
    }

    /// Close the shared browser, if one was ever launched. Safe to call more
    /// than once.
    pub async fn shutdown(&self) -> Result<()> {
        let Some(browser) = &self.browser else {
            return Ok(());
        };
        if !browser.is_live() {
            return Ok(());
        }
        info!(target: "core.discovery", "discovery.browser_shutdown");
        browser
            .shutdown()
            .await
            .map_err(|e| ProspectError::Driver(anyhow::anyhow!(e)))
    }

    /// Run discovery for `profile`.
    ///
    /// Only a blank profile, a zero limit, an unregistered engine, or a
    /// browser launch failure are errors. Cancellation stops further work
    /// and returns what was gathered so far.
    pub async fn search_and_extract(
        &self,
        profile: &str,
        options: DiscoveryOptions,
        cancel: &CancellationToken,
    ) -> Result<DiscoveryReport> {
        let profile = profile.trim();
        if profile.is_empty() {
            return Err(ProspectError::InvalidInput("profile keyword is blank".into()));
        }
        if options.limit == 0 {
            return Err(ProspectError::InvalidInput("limit must be at least 1".into()));
        }
        let engine = self.engines.get(&options.search_engine).ok_or_else(|| {
            ProspectError::Config(format!(
                "search engine `{}` is not configured",
                options.search_engine
            ))
        })?;

        let started = Instant::now();
        info!(
            target: "core.discovery",
            %profile,
            engine = %options.search_engine,
            limit = options.limit,
            use_ai = options.use_ai,
            "discovery.start"
        );

        let mut queries = self.queries.build(profile);
        queries.truncate(self.settings.max_queries.max(1));

        let (candidates, queries_run) = self
            .collect_candidates(engine.as_ref(), &queries, options.limit, cancel)
            .await?;
        let urls_visited: Vec<String> = candidates.iter().map(|c| c.url.clone()).collect();

        let sightings = self.fetch_all(candidates, cancel).await?;
        let emails: Vec<String> = sightings.iter().map(|s| s.email.clone()).collect();

        let mut results = Vec::with_capacity(sightings.len());
        if !emails.is_empty() && !cancel.is_cancelled() {
            let names = self.inferencer.infer_many(&emails, options.use_ai).await;
            let now = Utc::now();
            for (s, name) in sightings.into_iter().zip(names) {
                results.push(DiscoveryResult {
                    profile: profile.to_string(),
                    name: name.name,
                    email: s.email,
                    platform: s.extraction.platform.clone(),
                    search_engine: options.search_engine.as_str().to_string(),
                    confidence: name.confidence,
                    ai_enhanced: name.method == InferenceMethod::AiEnhanced,
                    method: name.method,
                    source_url: s.extraction.source_url.clone(),
                    targeted_email_provider: Some(s.provider),
                    synthetic: false,
                    discovered_at: now,
                });
            }
        }

        let cancelled = cancel.is_cancelled();
        let outcome = if !results.is_empty() {
            DiscoveryOutcome::Found
        } else {
            let reason = if cancelled {
                NoResultsReason::Cancelled
            } else if urls_visited.is_empty() {
                NoResultsReason::NoUrls
            } else {
                NoResultsReason::NoEmails
            };
            let explanation = NoResultsExplanation {
                reason,
                sites: self.queries.sites().to_vec(),
                providers: self.queries.providers().to_vec(),
                queries_run,
                urls_visited,
            };
            if !cancelled && (options.demo || self.settings.demo_enabled) {
                results = self.synthesize(profile, options.limit).await;
                warn!(target: "core.discovery", %profile, count = results.len(), "discovery.synthetic_substituted");
                DiscoveryOutcome::Synthetic(explanation)
            } else {
                DiscoveryOutcome::NoResults(explanation)
            }
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        info!(
            target: "core.discovery",
            %profile,
            results = results.len(),
            cancelled,
            elapsed_ms,
            "discovery.done"
        );
        Ok(DiscoveryReport {
            profile: profile.to_string(),
            search_engine: options.search_engine,
            outcome,
            results,
            cancelled,
            elapsed_ms,
        })
    }

    /// Sequential resolution with a fixed pause between queries. Returns the
    /// unique candidates (at most `limit`) and the query texts actually run.
    async fn collect_candidates(
        &self,
        engine: &dyn SearchEngine,
        queries: &[Query],
        limit: usize,
        cancel: &CancellationToken,
    ) -> Result<(Vec<CandidateUrl>, Vec<String>)> {
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        let mut queries_run = Vec::new();

        for (i, query) in queries.iter().enumerate() {
            if i > 0 && !self.settings.query_delay.is_zero() {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(self.settings.query_delay) => {}
                }
            }
            let found = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                found = engine.resolve(query, self.settings.results_per_query) => found,
            };
            let found = found.map_err(|e| match e {
                SearchError::BrowserLaunch(msg) => ProspectError::BrowserLaunch(msg),
            })?;
            queries_run.push(query.text.clone());
            debug!(target: "core.discovery", query = %query.text, found = found.len(), "discovery.query");

            for c in found {
                if candidates.len() >= limit {
                    break;
                }
                if seen.insert(c.url.clone()) {
                    candidates.push(c);
                }
            }
            if candidates.len() >= limit {
                break;
            }
        }
        Ok((candidates, queries_run))
    }

    /// Fetch every candidate with bounded parallelism; first sighting of an
    /// address wins.
    async fn fetch_all(
        &self,
        candidates: Vec<CandidateUrl>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Sighting>> {
        let filter = self.settings.filter_by_provider;
        let pages = self.pages.clone();
        let mut fetches = stream::iter(candidates)
            .map(|c| {
                let pages = pages.clone();
                async move {
                    let provider = filter.then_some(c.email_provider.as_str());
                    let res = pages.fetch_and_extract(&c.url, provider).await;
                    (c, res)
                }
            })
            .buffered(self.settings.fetch_concurrency.max(1));

        let mut seen = HashSet::new();
        let mut sightings = Vec::new();
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                next = fetches.next() => next,
            };
            let Some((candidate, res)) = next else {
                break;
            };
            let extraction = match res {
                Ok(extraction) => Arc::new(extraction),
                Err(FetchError::BrowserLaunch(msg)) => {
                    return Err(ProspectError::BrowserLaunch(msg));
                }
            };
            debug!(
                target: "core.discovery",
                url = %candidate.url,
                emails = extraction.emails.len(),
                "discovery.page"
            );
            for email in &extraction.emails {
                if seen.insert(email.clone()) {
                    sightings.push(Sighting {
                        email: email.clone(),
                        extraction: extraction.clone(),
                        provider: candidate.email_provider.clone(),
                    });
                }
            }
        }
        Ok(sightings)
    }

    async fn synthesize(&self, profile: &str, limit: usize) -> Vec<DiscoveryResult> {
        let contacts = synthetic::demo_contacts(self.queries.sites(), self.queries.providers(), limit);
        let emails: Vec<String> = contacts.iter().map(|(e, _, _)| e.clone()).collect();
        let names = self.inferencer.infer_many(&emails, false).await;
        synthetic::assemble(profile, contacts, names, Utc::now())
    }
}

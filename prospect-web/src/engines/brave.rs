use std::borrow::Cow;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use prospect_common::{CandidateUrl, DiscoveryMethod, Query, SearchEngineKind};
use prospect_http::{Auth, HttpClient, HttpError, RequestOpts};
use reqwest::header::{HeaderName, HeaderValue};
use serde::Deserialize;
use tracing::{info, warn};

use crate::filter::{to_candidates, LinkFilter};
use crate::{SearchEngine, SearchError};

pub const DEFAULT_BASE: &str = "https://api.search.brave.com";

/// Brave caps `count` at 20 per page.
const BRAVE_PAGE_SIZE: usize = 20;

#[derive(Debug, Deserialize, Default)]
struct WebSearchApiResponse {
    #[serde(default)]
    web: Option<WebResults>,
}

#[derive(Debug, Deserialize, Default)]
struct WebResults {
    #[serde(default)]
    results: Vec<WebHit>,
}

#[derive(Debug, Deserialize)]
struct WebHit {
    url: String,
}

/// Brave Search API client (web vertical, first page only).
#[derive(Clone)]
pub struct BraveSearch {
    http: HttpClient,
    token: HeaderValue,
}

impl BraveSearch {
    pub fn new(subscription_token: &str, timeout: Duration) -> Result<Self, HttpError> {
        Self::with_base(DEFAULT_BASE, subscription_token, timeout)
    }

    pub fn with_base(
        base: &str,
        subscription_token: &str,
        timeout: Duration,
    ) -> Result<Self, HttpError> {
        let token = HeaderValue::from_str(subscription_token)
            .map_err(|e| HttpError::Build(e.to_string()))?;
        let http = HttpClient::new(base)?.with_timeout(timeout).with_retries(1);
        Ok(Self { http, token })
    }
}

#[async_trait]
impl SearchEngine for BraveSearch {
    fn kind(&self) -> SearchEngineKind {
        SearchEngineKind::Brave
    }

    async fn resolve(
        &self,
        query: &Query,
        max_results: usize,
    ) -> Result<Vec<CandidateUrl>, SearchError> {
        let count = max_results.clamp(1, BRAVE_PAGE_SIZE).to_string();
        let started = Instant::now();
        let resp: WebSearchApiResponse = match self
            .http
            .get_json(
                "res/v1/web/search",
                RequestOpts {
                    auth: Some(Auth::Header {
                        name: HeaderName::from_static("x-subscription-token"),
                        value: self.token.clone(),
                    }),
                    query: Some(vec![
                        ("q", Cow::Borrowed(query.text.as_str())),
                        ("count", Cow::Owned(count)),
                    ]),
                    ..Default::default()
                },
            )
            .await
        {
            Ok(r) => r,
            Err(e) => {
                let event = if e.is_blocked() { "search.blocked" } else { "search.failed" };
                warn!(target: "web.search", engine = "brave", query = %query.text, error = %e, "{event}");
                return Ok(Vec::new());
            }
        };

        let hrefs = resp
            .web
            .unwrap_or_default()
            .results
            .into_iter()
            .map(|hit| hit.url);
        let out = to_candidates(
            hrefs,
            &LinkFilter::new(["brave.com", "search.brave.com"], None),
            query,
            DiscoveryMethod::JsonApi,
            max_results,
        );
        info!(
            target: "web.search",
            engine = "brave",
            query = %query.text,
            count = out.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "search.resolved"
        );
        Ok(out)
    }
}

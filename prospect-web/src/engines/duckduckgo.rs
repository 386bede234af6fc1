use std::time::Duration;

use async_trait::async_trait;
use prospect_common::{CandidateUrl, DiscoveryMethod, Query, SearchEngineKind};
use prospect_drivers::UserAgentPool;
use prospect_http::{ClientOptions, HttpClient, HttpError, RequestOpts};
use scraper::Selector;
use tracing::{debug, info, warn};
use url::Url;

use super::{collect_hrefs, parse_selectors};
use crate::filter::{decode_uddg, to_candidates, LinkFilter};
use crate::{SearchEngine, SearchError};

pub const DEFAULT_ENDPOINT: &str = "https://html.duckduckgo.com/html/";

/// DuckDuckGo's JavaScript-free results page, fetched over plain HTTP.
pub struct DuckDuckGoSearch {
    http: HttpClient,
    endpoint: String,
    agents: UserAgentPool,
    selectors: Vec<Selector>,
}

impl DuckDuckGoSearch {
    pub fn new(agents: UserAgentPool, timeout: Duration) -> Result<Self, HttpError> {
        Self::with_endpoint(DEFAULT_ENDPOINT, agents, timeout)
    }

    pub fn with_endpoint(
        endpoint: &str,
        agents: UserAgentPool,
        timeout: Duration,
    ) -> Result<Self, HttpError> {
        Url::parse(endpoint).map_err(|e| HttpError::Url(e.to_string()))?;
        let http = HttpClient::unanchored(ClientOptions::default())?
            .with_timeout(timeout)
            .with_retries(1);
        Ok(Self {
            http,
            endpoint: endpoint.to_string(),
            agents,
            selectors: parse_selectors(&["a.result__a"]),
        })
    }

    fn filter(&self) -> LinkFilter {
        LinkFilter::new(["duckduckgo.com"], Url::parse(&self.endpoint).ok())
    }
}

#[async_trait]
impl SearchEngine for DuckDuckGoSearch {
    fn kind(&self) -> SearchEngineKind {
        SearchEngineKind::DuckDuckGo
    }

    async fn resolve(
        &self,
        query: &Query,
        max_results: usize,
    ) -> Result<Vec<CandidateUrl>, SearchError> {
        let ua = self.agents.random_user_agent();
        let opts = RequestOpts {
            user_agent: Some(&ua),
            ..Default::default()
        };
        let page = match self
            .http
            .post_form_text(&self.endpoint, &[("q", query.text.as_str())], opts)
            .await
        {
            Ok(page) => page,
            Err(e) if e.is_blocked() => {
                warn!(target: "web.search", engine = "duckduckgo", query = %query.text, error = %e, "search.blocked");
                return Ok(Vec::new());
            }
            Err(e) => {
                warn!(target: "web.search", engine = "duckduckgo", query = %query.text, error = %e, "search.failed");
                return Ok(Vec::new());
            }
        };

        let hrefs: Vec<String> = collect_hrefs(&page.body, &self.selectors)
            .into_iter()
            .map(|href| decode_uddg(&href).unwrap_or(href))
            .collect();
        debug!(target: "web.search", engine = "duckduckgo", raw = hrefs.len(), "search.links_found");

        let out = to_candidates(
            hrefs,
            &self.filter(),
            query,
            DiscoveryMethod::HtmlScrape,
            max_results,
        );
        info!(target: "web.search", engine = "duckduckgo", query = %query.text, count = out.len(), "search.resolved");
        Ok(out)
    }
}

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use prospect_common::{CandidateUrl, DiscoveryMethod, Query, SearchEngineKind};
use prospect_drivers::chrome::behavioral::Pacing;
use prospect_drivers::{render, BrowserError, BrowserResource};
use scraper::Selector;
use tracing::{debug, info, warn};
use url::Url;

use super::{collect_hrefs, parse_selectors};
use crate::filter::{to_candidates, LinkFilter};
use crate::{SearchEngine, SearchError};

const GOOGLE_SELECTORS: &[&str] = &[
    "div.yuRUbf > a",
    "div.g a[href^='http']",
    "a[href^='/url?q=']",
    "#search a[href]",
];
const GOOGLE_DOMAINS: &[&str] = &["google.com", "googleusercontent.com", "gstatic.com"];

const BING_SELECTORS: &[&str] = &[
    "li.b_algo h2 a",
    "li.b_algo a[href]",
    "#b_results a[href^='http']",
];
const BING_DOMAINS: &[&str] = &["bing.com", "bingj.com", "microsoft.com"];

/// Markers of interstitials we do not try to get past.
const BLOCK_MARKERS: &[&str] = &[
    "unusual traffic from your computer",
    "/sorry/index",
    "g-recaptcha",
    "captcha",
];

/// Google or Bing results loaded in the shared browser.
pub struct RenderedSearch {
    kind: SearchEngineKind,
    browser: Arc<dyn BrowserResource>,
    nav_timeout: Duration,
    pacing: Pacing,
    selectors: Vec<Selector>,
}

impl RenderedSearch {
    pub fn google(browser: Arc<dyn BrowserResource>, nav_timeout: Duration, pacing: Pacing) -> Self {
        Self::new(SearchEngineKind::Google, browser, nav_timeout, pacing)
    }

    pub fn bing(browser: Arc<dyn BrowserResource>, nav_timeout: Duration, pacing: Pacing) -> Self {
        Self::new(SearchEngineKind::Bing, browser, nav_timeout, pacing)
    }

    fn new(
        kind: SearchEngineKind,
        browser: Arc<dyn BrowserResource>,
        nav_timeout: Duration,
        pacing: Pacing,
    ) -> Self {
        let raw = match kind {
            SearchEngineKind::Bing => BING_SELECTORS,
            _ => GOOGLE_SELECTORS,
        };
        Self {
            kind,
            browser,
            nav_timeout,
            pacing,
            selectors: parse_selectors(raw),
        }
    }

    /// Results page URL for `query`.
    pub fn search_url(&self, query: &Query, max_results: usize) -> String {
        let num = max_results.clamp(1, 50).to_string();
        let (base, params): (&str, Vec<(&str, &str)>) = match self.kind {
            SearchEngineKind::Bing => (
                "https://www.bing.com/search",
                vec![("q", query.text.as_str()), ("count", num.as_str())],
            ),
            _ => (
                "https://www.google.com/search",
                vec![("q", query.text.as_str()), ("num", num.as_str()), ("hl", "en")],
            ),
        };
        match Url::parse_with_params(base, &params) {
            Ok(u) => u.to_string(),
            Err(_) => base.to_string(),
        }
    }

    fn filter(&self) -> LinkFilter {
        let (domains, base) = match self.kind {
            SearchEngineKind::Bing => (BING_DOMAINS, "https://www.bing.com/"),
            _ => (GOOGLE_DOMAINS, "https://www.google.com/"),
        };
        LinkFilter::new(domains.iter().copied(), Url::parse(base).ok())
    }
}

fn looks_blocked(html: &str) -> bool {
    let lower = html.to_ascii_lowercase();
    BLOCK_MARKERS.iter().any(|m| lower.contains(m))
}

#[async_trait]
impl SearchEngine for RenderedSearch {
    fn kind(&self) -> SearchEngineKind {
        self.kind
    }

    async fn resolve(
        &self,
        query: &Query,
        max_results: usize,
    ) -> Result<Vec<CandidateUrl>, SearchError> {
        let engine = self.kind.as_str();
        let url = self.search_url(query, max_results);
        let page = match render(
            self.browser.as_ref(),
            &url,
            self.nav_timeout,
            self.pacing.sample(),
        )
        .await
        {
            Ok(page) => page,
            Err(BrowserError::Launch(msg)) => return Err(SearchError::BrowserLaunch(msg)),
            Err(e) => {
                warn!(target: "web.search", engine, query = %query.text, error = %e, "search.failed");
                return Ok(Vec::new());
            }
        };

        let hrefs = collect_hrefs(&page.html, &self.selectors);
        if hrefs.is_empty() && looks_blocked(&page.html) {
            warn!(target: "web.search", engine, query = %query.text, "search.blocked");
            return Ok(Vec::new());
        }
        debug!(target: "web.search", engine, raw = hrefs.len(), "search.links_found");

        let out = to_candidates(
            hrefs,
            &self.filter(),
            query,
            DiscoveryMethod::Rendered,
            max_results,
        );
        info!(target: "web.search", engine, query = %query.text, count = out.len(), "search.resolved");
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocked_interstitials_are_recognised() {
        assert!(looks_blocked("<p>Our systems have detected Unusual traffic from your computer</p>"));
        assert!(!looks_blocked("<div class='g'><a href='https://github.com/x'>x</a></div>"));
    }
}

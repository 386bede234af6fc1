//! Two-tier page acquisition: plain HTTP, then the shared browser.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use prospect_common::ExtractionResult;
use prospect_drivers::{render, BrowserError, BrowserResource, UserAgentPool};
use prospect_extract::EmailExtractor;
use prospect_http::{ClientOptions, HttpClient, HttpError, RequestOpts};
use thiserror::Error;
use tracing::{debug, warn};

use crate::platform::platform_for_url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchTier {
    Http,
    Rendered,
}

#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Empty when neither tier produced a document.
    pub content: String,
    /// Derived from `final_url` when known, else from the requested URL.
    pub platform: String,
    /// Tier whose content was kept; `None` when both failed.
    pub tier: Option<FetchTier>,
    pub final_url: String,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("browser launch failed: {0}")]
    BrowserLaunch(String),
}

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub http_timeout: Duration,
    pub http_retries: usize,
    pub max_redirects: usize,
    pub render_timeout: Duration,
    /// Wait after DOMContentLoaded before reading the DOM.
    pub settle: Duration,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            http_timeout: Duration::from_secs(10),
            http_retries: 2,
            max_redirects: 10,
            render_timeout: Duration::from_secs(30),
            settle: Duration::from_millis(1500),
        }
    }
}

/// URL in, extracted addresses out.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_and_extract(
        &self,
        url: &str,
        provider: Option<&str>,
    ) -> Result<ExtractionResult, FetchError>;
}

pub struct PageFetcher {
    http: HttpClient,
    agents: UserAgentPool,
    extractor: EmailExtractor,
    browser: Option<Arc<dyn BrowserResource>>,
    settings: FetchSettings,
}

impl PageFetcher {
    /// `browser` of `None` disables the rendering tier.
    pub fn new(
        agents: UserAgentPool,
        extractor: EmailExtractor,
        browser: Option<Arc<dyn BrowserResource>>,
        settings: FetchSettings,
    ) -> Result<Self, HttpError> {
        let http = HttpClient::unanchored(ClientOptions {
            max_redirects: settings.max_redirects,
            ..Default::default()
        })?
        .with_timeout(settings.http_timeout)
        .with_retries(settings.http_retries);
        Ok(Self {
            http,
            agents,
            extractor,
            browser,
            settings,
        })
    }

    pub fn with_backoff(mut self, base: Duration) -> Self {
        self.http = self.http.with_backoff(base);
        self
    }

    /// Fetch `url`, escalating to the browser when the HTTP body has no
    /// addresses. Only a browser launch failure is an error.
    pub async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        self.fetch_for(url, None).await
    }

    /// As [`PageFetcher::fetch`], but the HTTP body only counts when it holds
    /// an address at `provider`.
    async fn fetch_for(&self, url: &str, provider: Option<&str>) -> Result<FetchedPage, FetchError> {
        let started = Instant::now();
        let mut kept: Option<(String, String)> = None;

        match self.fetch_http(url).await {
            Ok((body, final_url)) => {
                if !self.extractor.extract(&body, provider).is_empty() {
                    debug!(
                        target: "web.fetch",
                        %url,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "fetch.tier1.success"
                    );
                    return Ok(self.page(body, final_url, Some(FetchTier::Http)));
                }
                kept = Some((body, final_url));
            }
            Err(e) => {
                let event = if e.is_blocked() { "fetch.tier1.blocked" } else { "fetch.tier1.failed" };
                debug!(target: "web.fetch", %url, error = %e, "{event}");
            }
        }

        let Some(browser) = &self.browser else {
            return Ok(self.fallback(url, kept));
        };

        match render(
            browser.as_ref(),
            url,
            self.settings.render_timeout,
            self.settings.settle,
        )
        .await
        {
            Ok(page) => {
                let final_url = page.final_url.unwrap_or_else(|| url.to_string());
                debug!(
                    target: "web.fetch",
                    %url,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "fetch.tier2.success"
                );
                Ok(self.page(page.html, final_url, Some(FetchTier::Rendered)))
            }
            Err(BrowserError::Launch(msg)) => Err(FetchError::BrowserLaunch(msg)),
            Err(e) => {
                warn!(target: "web.fetch", %url, error = %e, "fetch.tier2.failed");
                Ok(self.fallback(url, kept))
            }
        }
    }

    async fn fetch_http(&self, url: &str) -> Result<(String, String), HttpError> {
        let ua = self.agents.random_user_agent();
        let resp = self
            .http
            .get_text(
                url,
                RequestOpts {
                    user_agent: Some(&ua),
                    ..Default::default()
                },
            )
            .await?;
        Ok((resp.body, resp.final_url.to_string()))
    }

    fn page(&self, content: String, final_url: String, tier: Option<FetchTier>) -> FetchedPage {
        FetchedPage {
            platform: platform_for_url(&final_url),
            content,
            tier,
            final_url,
        }
    }

    /// Keep the HTTP body, if any, when the browser could not help.
    fn fallback(&self, url: &str, kept: Option<(String, String)>) -> FetchedPage {
        match kept {
            Some((body, final_url)) => self.page(body, final_url, Some(FetchTier::Http)),
            None => self.page(String::new(), url.to_string(), None),
        }
    }
}

#[async_trait]
impl PageSource for PageFetcher {
    /// [`PageFetcher::fetch`] followed by extraction, optionally filtered to
    /// one provider.
    async fn fetch_and_extract(
        &self,
        url: &str,
        provider: Option<&str>,
    ) -> Result<ExtractionResult, FetchError> {
        let page = self.fetch_for(url, provider).await?;
        Ok(ExtractionResult {
            emails: self.extractor.extract(&page.content, provider),
            platform: page.platform,
            source_url: url.to_string(),
        })
    }
}

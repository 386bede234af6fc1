//! Search and acquisition for the discovery pipeline.
//!
//! - Search engine adapters (`engines`): rendered Google/Bing, DuckDuckGo's
//!   HTML endpoint, and the Brave Search API
//! - Result link cleaning (`filter`)
//! - Two-tier page fetching (`fetcher`): plain HTTP first, then the shared
//!   browser
//! - Host to platform naming (`platform`)

use async_trait::async_trait;
use prospect_common::{CandidateUrl, ProspectError, Query, SearchEngineKind};
use thiserror::Error;

pub mod engines;
pub mod fetcher;
pub mod filter;
pub mod platform;

pub use engines::{BraveSearch, DuckDuckGoSearch, RenderedSearch};
pub use fetcher::{FetchError, FetchSettings, FetchTier, FetchedPage, PageFetcher, PageSource};
pub use platform::platform_for_url;

/// Only failures the caller must act on. Blocked, empty, or unparseable
/// result pages are logged and reported as no results.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("browser launch failed: {0}")]
    BrowserLaunch(String),
}

impl From<SearchError> for ProspectError {
    fn from(e: SearchError) -> Self {
        match e {
            SearchError::BrowserLaunch(msg) => ProspectError::BrowserLaunch(msg),
        }
    }
}

/// Resolves one query into candidate result URLs.
#[async_trait]
pub trait SearchEngine: Send + Sync {
    fn kind(&self) -> SearchEngineKind;

    /// At most `max_results` URLs, in the engine's display order, tagged with
    /// the query's site and provider.
    async fn resolve(
        &self,
        query: &Query,
        max_results: usize,
    ) -> Result<Vec<CandidateUrl>, SearchError>;
}

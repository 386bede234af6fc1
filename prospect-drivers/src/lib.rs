//! Driver layer for the rendering tier.
//!
//! The rest of the workspace only sees the [`BrowserResource`] and
//! [`BrowserPage`] traits. The concrete Chrome/WebDriver implementation lives
//! in [`chrome`].
//!
//! - [`chrome::shared::SharedBrowser`]: one lazily launched WebDriver session
//!   shared by every fetch, with one short-lived tab per logical page
//! - [`chrome::fingerprint::UserAgentPool`]: desktop user-agent rotation
//! - [`chrome::behavioral::Pacing`]: jittered settle delays
//! - [`render`]: acquire, navigate, read, release in one call
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub mod chrome;

pub use chrome::fingerprint::{UserAgentPool, UserAgentProfile};
pub use chrome::shared::{BrowserConfig, SharedBrowser};

#[derive(Debug, Error)]
pub enum BrowserError {
    /// The browser could not be started. Callers treat this as fatal.
    #[error("browser launch failed: {0}")]
    Launch(String),
    /// `shutdown` already ran; the resource is never recreated.
    #[error("browser has been shut down")]
    ShutDown,
    #[error("page error: {0}")]
    Page(String),
    #[error("page operation timed out after {0:?}")]
    Timeout(Duration),
}

/// A short-lived page (tab) inside the shared browser.
#[async_trait]
pub trait BrowserPage: Send {
    /// Navigate and wait for DOMContentLoaded, bounded by `timeout`.
    async fn goto(&mut self, url: &str, timeout: Duration) -> Result<(), BrowserError>;

    /// Serialized DOM of the current document.
    async fn content(&mut self) -> Result<String, BrowserError>;

    async fn current_url(&mut self) -> Result<String, BrowserError>;

    /// Close the page. Implementations must tolerate being called on a page
    /// whose navigation failed.
    async fn close(self: Box<Self>) -> Result<(), BrowserError>;
}

/// Explicitly owned rendering resource.
///
/// Created lazily on the first `acquire`, never recreated while live, and torn
/// down by `shutdown`.
#[async_trait]
pub trait BrowserResource: Send + Sync {
    async fn acquire(&self) -> Result<Box<dyn BrowserPage>, BrowserError>;

    /// Close a page obtained from `acquire`. Errors are logged, not returned.
    async fn release(&self, page: Box<dyn BrowserPage>);

    async fn shutdown(&self) -> Result<(), BrowserError>;

    /// True once launched and until shut down.
    fn is_live(&self) -> bool;
}

/// What a rendered fetch returns.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub html: String,
    /// URL after redirects, when the driver could report it.
    pub final_url: Option<String>,
}

/// Acquire a page, navigate, wait `settle`, read the DOM, and release the page
/// on every exit path.
pub async fn render(
    resource: &dyn BrowserResource,
    url: &str,
    nav_timeout: Duration,
    settle: Duration,
) -> Result<RenderedPage, BrowserError> {
    let mut page = resource.acquire().await?;
    let outcome = async {
        page.goto(url, nav_timeout).await?;
        if !settle.is_zero() {
            tokio::time::sleep(settle).await;
        }
        let html = page.content().await?;
        let final_url = page.current_url().await.ok();
        Ok(RenderedPage { html, final_url })
    }
    .await;
    resource.release(page).await;
    outcome
}

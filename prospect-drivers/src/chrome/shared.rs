use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fantoccini::wd::WindowHandle;
use fantoccini::{Client, ClientBuilder};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::timeout;
use tracing::{debug, info, warn};
use webdriver::capabilities::Capabilities;

use super::fingerprint::UserAgentPool;
use super::launch::{capabilities, chrome_arguments};
use crate::{BrowserError, BrowserPage, BrowserResource};

/// Settings for the shared Chrome session.
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Chromedriver endpoint.
    pub webdriver_url: String,
    pub headless: bool,
    pub launch_timeout: Duration,
    /// Bound on each tab command (open, switch, read, close).
    pub op_timeout: Duration,
    pub extra_args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".to_string(),
            headless: true,
            launch_timeout: Duration::from_secs(20),
            op_timeout: Duration::from_secs(15),
            extra_args: Vec::new(),
        }
    }
}

struct Session {
    client: Client,
    home: WindowHandle,
}

/// Run one WebDriver command under `limit`.
async fn bounded<T, E, F>(limit: Duration, what: &str, op: F) -> Result<T, BrowserError>
where
    E: Display,
    F: Future<Output = Result<T, E>>,
{
    match timeout(limit, op).await {
        Ok(Ok(v)) => Ok(v),
        Ok(Err(e)) => Err(BrowserError::Page(format!("{what}: {e}"))),
        Err(_) => Err(BrowserError::Timeout(limit)),
    }
}

#[derive(Default)]
struct BrowserState {
    session: Option<Session>,
    shut_down: bool,
}

/// One WebDriver session shared by every rendered fetch in the process.
///
/// The session is launched on the first [`acquire`](BrowserResource::acquire)
/// and kept until [`shutdown`](BrowserResource::shutdown). Each page is a new
/// tab; the page holds the session lock until it is closed, so tab use and
/// launches are serialized.
pub struct SharedBrowser {
    config: BrowserConfig,
    agents: UserAgentPool,
    state: Arc<Mutex<BrowserState>>,
    live: Arc<AtomicBool>,
}

impl SharedBrowser {
    pub fn new(config: BrowserConfig, agents: UserAgentPool) -> Self {
        Self {
            config,
            agents,
            state: Arc::new(Mutex::new(BrowserState::default())),
            live: Arc::new(AtomicBool::new(false)),
        }
    }

    async fn launch(&self) -> Result<Session, BrowserError> {
        let profile = self.agents.random_profile();
        let args = chrome_arguments(&profile, self.config.headless, &self.config.extra_args);
        let caps: Capabilities = capabilities(args);

        info!(
            target: "browser.shared",
            webdriver = %self.config.webdriver_url,
            headless = self.config.headless,
            user_agent = %profile.user_agent,
            "browser.launch.start"
        );

        let mut builder = ClientBuilder::native();
        builder.capabilities(caps);
        let client = match timeout(
            self.config.launch_timeout,
            builder.connect(&self.config.webdriver_url),
        )
        .await
        {
            Ok(Ok(client)) => client,
            Ok(Err(e)) => return Err(BrowserError::Launch(e.to_string())),
            Err(_) => {
                return Err(BrowserError::Launch(format!(
                    "no session from {} within {:?}",
                    self.config.webdriver_url, self.config.launch_timeout
                )))
            }
        };
        let limit = self.config.op_timeout;
        let home = match bounded(limit, "reading initial window", client.window()).await {
            Ok(home) => home,
            Err(e) => {
                if let Err(close) = bounded(limit, "closing session", client.close()).await {
                    warn!(target: "browser.shared", error = %close, "browser.launch.close_failed");
                }
                return Err(BrowserError::Launch(e.to_string()));
            }
        };

        info!(target: "browser.shared", "browser.launch.ready");
        Ok(Session { client, home })
    }
}

#[async_trait]
impl BrowserResource for SharedBrowser {
    async fn acquire(&self) -> Result<Box<dyn BrowserPage>, BrowserError> {
        let mut guard = self.state.clone().lock_owned().await;
        if guard.shut_down {
            return Err(BrowserError::ShutDown);
        }
        if guard.session.is_none() {
            let session = self.launch().await?;
            guard.session = Some(session);
            self.live.store(true, Ordering::SeqCst);
        }
        let (client, home) = match guard.session.as_ref() {
            Some(s) => (s.client.clone(), s.home.clone()),
            None => return Err(BrowserError::Launch("session missing after launch".into())),
        };

        let limit = self.config.op_timeout;
        let tab = bounded(limit, "opening tab", client.new_window(true)).await?;
        let inner = PageInner {
            client,
            home,
            limit,
            _guard: guard,
        };
        let switched = bounded(
            limit,
            "switching to tab",
            inner.client.switch_to_window(tab.handle.clone()),
        )
        .await;
        if let Err(e) = switched {
            inner.discard(tab.handle).await;
            return Err(e);
        }
        debug!(target: "browser.shared", "browser.page.opened");

        Ok(Box::new(ChromePage { inner: Some(inner) }))
    }

    async fn release(&self, page: Box<dyn BrowserPage>) {
        if let Err(e) = page.close().await {
            warn!(target: "browser.shared", error = %e, "browser.page.close_failed");
        }
    }

    async fn shutdown(&self) -> Result<(), BrowserError> {
        let mut guard = self.state.lock().await;
        guard.shut_down = true;
        self.live.store(false, Ordering::SeqCst);
        match guard.session.take() {
            Some(session) => {
                info!(target: "browser.shared", "browser.shutdown");
                bounded(self.config.op_timeout, "closing session", session.client.close()).await
            }
            None => Ok(()),
        }
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}

struct PageInner {
    client: Client,
    home: WindowHandle,
    limit: Duration,
    _guard: OwnedMutexGuard<BrowserState>,
}

impl PageInner {
    async fn close_tab(self) -> Result<(), BrowserError> {
        let closed = bounded(self.limit, "closing tab", self.client.close_window()).await;
        let switched = bounded(
            self.limit,
            "returning to home window",
            self.client.switch_to_window(self.home.clone()),
        )
        .await;
        closed.and(switched)
    }

    /// Best-effort close of a tab that never became current.
    async fn discard(self, tab: WindowHandle) {
        let focused = bounded(self.limit, "focusing tab", self.client.switch_to_window(tab)).await;
        let result = match focused {
            Ok(()) => self.close_tab().await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            warn!(target: "browser.shared", error = %e, "browser.page.discard_failed");
        }
    }
}

/// One tab in the shared session.
struct ChromePage {
    inner: Option<PageInner>,
}

impl ChromePage {
    fn inner(&self) -> Result<&PageInner, BrowserError> {
        self.inner
            .as_ref()
            .ok_or_else(|| BrowserError::Page("page already closed".into()))
    }
}

#[async_trait]
impl BrowserPage for ChromePage {
    async fn goto(&mut self, url: &str, limit: Duration) -> Result<(), BrowserError> {
        let inner = self.inner()?;
        bounded(limit, "navigating", inner.client.goto(url)).await
    }

    async fn content(&mut self) -> Result<String, BrowserError> {
        let inner = self.inner()?;
        bounded(inner.limit, "reading source", inner.client.source()).await
    }

    async fn current_url(&mut self) -> Result<String, BrowserError> {
        let inner = self.inner()?;
        bounded(inner.limit, "reading url", inner.client.current_url())
            .await
            .map(|u| u.to_string())
    }

    async fn close(mut self: Box<Self>) -> Result<(), BrowserError> {
        match self.inner.take() {
            Some(inner) => inner.close_tab().await,
            None => Ok(()),
        }
    }
}

impl Drop for ChromePage {
    // A page dropped mid-await (cancelled fetch) still closes its tab; the
    // session lock is held until the cleanup finishes.
    fn drop(&mut self) {
        if let Some(inner) = self.inner.take() {
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    if let Err(e) = inner.close_tab().await {
                        warn!(target: "browser.shared", error = %e, "browser.page.drop_close_failed");
                    }
                });
            }
        }
    }
}

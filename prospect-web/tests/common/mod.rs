#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use prospect_drivers::{BrowserError, BrowserPage, BrowserResource};

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Script {
    Serve,
    FailLaunch,
    FailNavigation,
}

/// In-memory browser serving one fixed document for every URL.
pub struct FakeBrowser {
    script: Script,
    html: String,
    pub visited: Arc<Mutex<Vec<String>>>,
    pub closed: Arc<AtomicUsize>,
    live: AtomicBool,
}

impl FakeBrowser {
    pub fn serving(html: &str) -> Arc<Self> {
        Self::scripted(Script::Serve, html)
    }

    pub fn scripted(script: Script, html: &str) -> Arc<Self> {
        Arc::new(Self {
            script,
            html: html.to_string(),
            visited: Arc::new(Mutex::new(Vec::new())),
            closed: Arc::new(AtomicUsize::new(0)),
            live: AtomicBool::new(false),
        })
    }

    pub fn visits(&self) -> Vec<String> {
        self.visited.lock().unwrap().clone()
    }
}

struct FakePage {
    fail: bool,
    html: String,
    url: String,
    visited: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicUsize>,
}

#[async_trait]
impl BrowserPage for FakePage {
    async fn goto(&mut self, url: &str, timeout: Duration) -> Result<(), BrowserError> {
        self.visited.lock().unwrap().push(url.to_string());
        if self.fail {
            return Err(BrowserError::Timeout(timeout));
        }
        self.url = url.to_string();
        Ok(())
    }

    async fn content(&mut self) -> Result<String, BrowserError> {
        Ok(self.html.clone())
    }

    async fn current_url(&mut self) -> Result<String, BrowserError> {
        Ok(self.url.clone())
    }

    async fn close(self: Box<Self>) -> Result<(), BrowserError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl BrowserResource for FakeBrowser {
    async fn acquire(&self) -> Result<Box<dyn BrowserPage>, BrowserError> {
        if self.script == Script::FailLaunch {
            return Err(BrowserError::Launch("chromedriver not reachable".into()));
        }
        self.live.store(true, Ordering::SeqCst);
        Ok(Box::new(FakePage {
            fail: self.script == Script::FailNavigation,
            html: self.html.clone(),
            url: String::new(),
            visited: self.visited.clone(),
            closed: self.closed.clone(),
        }))
    }

    async fn release(&self, page: Box<dyn BrowserPage>) {
        let _ = page.close().await;
    }

    async fn shutdown(&self) -> Result<(), BrowserError> {
        self.live.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use prospect_common::{
    CandidateUrl, DiscoveryMethod, ExtractionResult, InferenceMethod, ProspectError, Query,
    SearchEngineKind, SYNTHETIC_ENGINE,
};
use prospect_core::{
    DiscoveryOptions, DiscoveryOrchestrator, DiscoveryOutcome, NoResultsReason,
    OrchestratorSettings, QueryBuilder,
};
use prospect_drivers::{BrowserError, BrowserPage, BrowserResource};
use prospect_extract::PatternInferencer;
use prospect_web::{FetchError, PageSource, SearchEngine, SearchError};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Engine returning canned URLs per query index.
struct ScriptedEngine {
    kind: SearchEngineKind,
    pages: Vec<Vec<&'static str>>,
    calls: AtomicUsize,
    resolved_at: Mutex<Vec<Instant>>,
    fail_launch: bool,
}

impl ScriptedEngine {
    fn new(pages: Vec<Vec<&'static str>>) -> Arc<Self> {
        Arc::new(Self {
            kind: SearchEngineKind::DuckDuckGo,
            pages,
            calls: AtomicUsize::new(0),
            resolved_at: Mutex::new(Vec::new()),
            fail_launch: false,
        })
    }

    fn failing_launch() -> Arc<Self> {
        Arc::new(Self {
            kind: SearchEngineKind::Google,
            pages: Vec::new(),
            calls: AtomicUsize::new(0),
            resolved_at: Mutex::new(Vec::new()),
            fail_launch: true,
        })
    }
}

#[async_trait]
impl SearchEngine for ScriptedEngine {
    fn kind(&self) -> SearchEngineKind {
        self.kind
    }

    async fn resolve(&self, query: &Query, max_results: usize) -> Result<Vec<CandidateUrl>, SearchError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        self.resolved_at.lock().unwrap().push(Instant::now());
        if self.fail_launch {
            return Err(SearchError::BrowserLaunch("no chromedriver".into()));
        }
        let urls = self.pages.get(n).cloned().unwrap_or_default();
        Ok(urls
            .into_iter()
            .take(max_results)
            .map(|u| CandidateUrl {
                url: u.to_string(),
                source_site: query.site.clone(),
                email_provider: query.email_provider.clone(),
                discovery_method: DiscoveryMethod::HtmlScrape,
            })
            .collect())
    }
}

/// Pages keyed by URL; unknown URLs have no addresses.
#[derive(Default)]
struct ScriptedPages {
    emails: HashMap<&'static str, Vec<&'static str>>,
    fetched: Mutex<Vec<String>>,
    providers: Mutex<Vec<Option<String>>>,
    fail_launch: bool,
}

#[async_trait]
impl PageSource for ScriptedPages {
    async fn fetch_and_extract(&self, url: &str, provider: Option<&str>) -> Result<ExtractionResult, FetchError> {
        self.fetched.lock().unwrap().push(url.to_string());
        self.providers.lock().unwrap().push(provider.map(str::to_string));
        if self.fail_launch {
            return Err(FetchError::BrowserLaunch("no chromedriver".into()));
        }
        let emails = self
            .emails
            .get(url)
            .map(|v| v.iter().map(|e| e.to_string()).collect())
            .unwrap_or_default();
        Ok(ExtractionResult {
            emails,
            platform: prospect_web::platform_for_url(url),
            source_url: url.to_string(),
        })
    }
}

struct IdleBrowser {
    live: AtomicBool,
    shutdowns: AtomicUsize,
}

#[async_trait]
impl BrowserResource for IdleBrowser {
    async fn acquire(&self) -> Result<Box<dyn BrowserPage>, BrowserError> {
        Err(BrowserError::Page("not used in these tests".into()))
    }

    async fn release(&self, _page: Box<dyn BrowserPage>) {}

    async fn shutdown(&self) -> Result<(), BrowserError> {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        self.live.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}

fn settings() -> OrchestratorSettings {
    OrchestratorSettings {
        max_queries: 3,
        results_per_query: 10,
        query_delay: Duration::ZERO,
        fetch_concurrency: 2,
        filter_by_provider: false,
        demo_enabled: false,
    }
}

fn orchestrator(engine: Arc<ScriptedEngine>, pages: Arc<ScriptedPages>, settings: OrchestratorSettings) -> DiscoveryOrchestrator {
    DiscoveryOrchestrator::new(
        QueryBuilder::default(),
        pages,
        Arc::new(PatternInferencer::new().unwrap()),
        settings,
    )
    .with_engine(engine)
}

fn ddg(limit: usize) -> DiscoveryOptions {
    DiscoveryOptions {
        limit,
        search_engine: SearchEngineKind::DuckDuckGo,
        use_ai: false,
        demo: false,
    }
}

fn pages_with(entries: Vec<(&'static str, Vec<&'static str>)>) -> Arc<ScriptedPages> {
    Arc::new(ScriptedPages {
        emails: entries.into_iter().collect(),
        ..Default::default()
    })
}

#[tokio::test(start_paused = true)]
async fn queries_are_spaced_by_the_query_delay() {
    let engine = ScriptedEngine::new(vec![
        vec!["https://github.com/a"],
        vec!["https://github.com/b"],
        vec!["https://github.com/c"],
    ]);
    let paced = OrchestratorSettings {
        query_delay: Duration::from_secs(2),
        ..settings()
    };
    let o = orchestrator(engine.clone(), pages_with(vec![]), paced);

    let started = Instant::now();
    o.search_and_extract("Jane Doe", ddg(10), &CancellationToken::new())
        .await
        .unwrap();

    let times = engine.resolved_at.lock().unwrap().clone();
    assert_eq!(times.len(), 3);
    assert_eq!(times[0], started);
    assert_eq!(times[1] - times[0], Duration::from_secs(2));
    assert_eq!(times[2] - times[1], Duration::from_secs(2));
}

#[tokio::test]
async fn blank_profile_is_rejected_before_any_work() {
    let engine = ScriptedEngine::new(vec![vec!["https://github.com/a"]]);
    let o = orchestrator(engine.clone(), pages_with(vec![]), settings());
    let err = o
        .search_and_extract("   ", ddg(5), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ProspectError::InvalidInput(_)));
    assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unregistered_engine_is_a_config_error() {
    let o = orchestrator(ScriptedEngine::new(vec![]), pages_with(vec![]), settings());
    let opts = DiscoveryOptions {
        search_engine: SearchEngineKind::Brave,
        ..ddg(5)
    };
    let err = o.search_and_extract("designer", opts, &CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, ProspectError::Config(_)));
}

#[tokio::test]
async fn results_are_assembled_and_deduplicated_by_email() {
    let engine = ScriptedEngine::new(vec![
        vec!["https://github.com/jane", "https://github.com/bob"],
        vec!["https://github.com/jane", "https://stackoverflow.com/users/3/carol"],
    ]);
    let pages = pages_with(vec![
        ("https://github.com/jane", vec!["john.doe@gmail.com"]),
        ("https://github.com/bob", vec!["john.doe@gmail.com", "jdoe@yahoo.com"]),
        ("https://stackoverflow.com/users/3/carol", vec!["sarahconnor@outlook.com"]),
    ]);
    let o = orchestrator(engine.clone(), pages.clone(), settings());

    let report = o
        .search_and_extract("designer", ddg(10), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.outcome, DiscoveryOutcome::Found);
    let emails: Vec<_> = report.results.iter().map(|r| r.email.as_str()).collect();
    assert_eq!(emails, ["john.doe@gmail.com", "jdoe@yahoo.com", "sarahconnor@outlook.com"]);

    let john = &report.results[0];
    assert_eq!(john.name, "John Doe");
    assert_eq!(john.method, InferenceMethod::PatternMatching);
    assert_eq!(john.platform, "GitHub");
    assert_eq!(john.source_url, "https://github.com/jane");
    assert_eq!(john.search_engine, "duckduckgo");
    assert_eq!(john.targeted_email_provider.as_deref(), Some("@gmail.com"));
    assert!(!john.synthetic);
    assert!(report.results.iter().all(|r| r.profile == "designer"));

    // Three unique URLs fetched; the repeated one only once.
    assert_eq!(pages.fetched.lock().unwrap().len(), 3);
    assert_eq!(engine.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn url_limit_stops_search_early() {
    let engine = ScriptedEngine::new(vec![
        vec!["https://github.com/a", "https://github.com/b", "https://github.com/c"],
        vec!["https://github.com/d"],
    ]);
    let pages = pages_with(vec![]);
    let o = orchestrator(engine.clone(), pages.clone(), settings());

    let report = o
        .search_and_extract("designer", ddg(2), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(engine.calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        *pages.fetched.lock().unwrap(),
        vec!["https://github.com/a".to_string(), "https://github.com/b".to_string()]
    );
    match report.outcome {
        DiscoveryOutcome::NoResults(why) => {
            assert_eq!(why.reason, NoResultsReason::NoEmails);
            assert_eq!(why.urls_visited.len(), 2);
            assert_eq!(why.queries_run.len(), 1);
        }
        other => panic!("expected no results, got {other:?}"),
    }
}

#[tokio::test]
async fn query_list_is_bounded_to_a_prefix() {
    let engine = ScriptedEngine::new(vec![]);
    let o = orchestrator(engine.clone(), pages_with(vec![]), OrchestratorSettings { max_queries: 2, ..settings() });
    let report = o
        .search_and_extract("designer", ddg(5), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(engine.calls.load(Ordering::SeqCst), 2);
    match report.outcome {
        DiscoveryOutcome::NoResults(why) => {
            assert_eq!(why.reason, NoResultsReason::NoUrls);
            assert_eq!(why.sites, vec!["linkedin.com", "github.com", "stackoverflow.com"]);
            assert_eq!(why.providers.len(), 5);
            assert_eq!(
                why.queries_run,
                vec![
                    "site:linkedin.com \"designer\" \"@gmail.com\"".to_string(),
                    "site:linkedin.com \"designer\" \"@yahoo.com\"".to_string(),
                ]
            );
        }
        other => panic!("expected no results, got {other:?}"),
    }
}

#[tokio::test]
async fn provider_filter_is_passed_through_when_enabled() {
    let engine = ScriptedEngine::new(vec![vec!["https://github.com/a"]]);
    let pages = pages_with(vec![]);
    let o = orchestrator(
        engine,
        pages.clone(),
        OrchestratorSettings { filter_by_provider: true, ..settings() },
    );
    o.search_and_extract("designer", ddg(1), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(*pages.providers.lock().unwrap(), vec![Some("@gmail.com".to_string())]);
}

#[tokio::test]
async fn browser_launch_failure_in_search_is_fatal() {
    let o = orchestrator(ScriptedEngine::failing_launch(), pages_with(vec![]), settings());
    let opts = DiscoveryOptions {
        search_engine: SearchEngineKind::Google,
        ..ddg(5)
    };
    let err = o.search_and_extract("designer", opts, &CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, ProspectError::BrowserLaunch(_)));
}

#[tokio::test]
async fn browser_launch_failure_in_fetch_is_fatal() {
    let engine = ScriptedEngine::new(vec![vec!["https://github.com/a"]]);
    let pages = Arc::new(ScriptedPages {
        fail_launch: true,
        ..Default::default()
    });
    let o = orchestrator(engine, pages, settings());
    let err = o
        .search_and_extract("designer", ddg(5), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ProspectError::BrowserLaunch(_)));
}

#[tokio::test]
async fn demo_rows_only_when_asked_and_clearly_tagged() {
    let o = orchestrator(ScriptedEngine::new(vec![]), pages_with(vec![]), settings());

    let live = o
        .search_and_extract("designer", ddg(3), &CancellationToken::new())
        .await
        .unwrap();
    assert!(live.results.is_empty());
    assert!(!live.is_synthetic());

    let demo = o
        .search_and_extract("designer", DiscoveryOptions { demo: true, ..ddg(3) }, &CancellationToken::new())
        .await
        .unwrap();
    assert!(demo.is_synthetic());
    assert_eq!(demo.results.len(), 3);
    assert!(demo.results.iter().all(|r| r.synthetic && r.search_engine == SYNTHETIC_ENGINE));
    assert_eq!(demo.results[0].name, "John Smith");

    let json = serde_json::to_value(&demo).unwrap();
    assert_eq!(json["outcome"]["kind"], "synthetic");
    assert_eq!(json["outcome"]["reason"], "no-urls");
}

#[tokio::test]
async fn configured_demo_mode_never_replaces_live_results() {
    let engine = ScriptedEngine::new(vec![vec!["https://github.com/a"]]);
    let pages = pages_with(vec![("https://github.com/a", vec!["mary.jones@gmail.com"])]);
    let o = orchestrator(engine, pages, OrchestratorSettings { demo_enabled: true, ..settings() });
    let report = o
        .search_and_extract("designer", ddg(5), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.outcome, DiscoveryOutcome::Found);
    assert!(report.results.iter().all(|r| !r.synthetic));
}

#[tokio::test]
async fn cancelled_run_returns_partial_report() {
    let engine = ScriptedEngine::new(vec![vec!["https://github.com/a"]]);
    let o = orchestrator(engine.clone(), pages_with(vec![]), settings());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = o
        .search_and_extract("designer", DiscoveryOptions { demo: true, ..ddg(5) }, &cancel)
        .await
        .unwrap();
    assert!(report.cancelled);
    assert!(report.results.is_empty());
    match report.outcome {
        DiscoveryOutcome::NoResults(why) => assert_eq!(why.reason, NoResultsReason::Cancelled),
        other => panic!("expected cancelled no-results, got {other:?}"),
    }
}

#[tokio::test]
async fn shutdown_only_touches_a_live_browser() {
    let browser = Arc::new(IdleBrowser {
        live: AtomicBool::new(false),
        shutdowns: AtomicUsize::new(0),
    });
    let o = orchestrator(ScriptedEngine::new(vec![]), pages_with(vec![]), settings()).with_browser(browser.clone());

    o.shutdown().await.unwrap();
    assert_eq!(browser.shutdowns.load(Ordering::SeqCst), 0);

    browser.live.store(true, Ordering::SeqCst);
    o.shutdown().await.unwrap();
    o.shutdown().await.unwrap();
    assert_eq!(browser.shutdowns.load(Ordering::SeqCst), 1);
}

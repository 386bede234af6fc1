//! Loader for Prospect configuration with YAML + environment overlays.
//!
//! Precedence, lowest first: built-in defaults, YAML sources in the order
//! they were added, then `PROSPECT__`-prefixed environment variables
//! (`PROSPECT__SEARCH__LIMIT=25`, `PROSPECT__FETCH__HEADLESS=false`).
//! `${VAR}` placeholders in string values are expanded after merging.
//!
//! ```yaml
//! search:
//!   engine: duckduckgo
//!   limit: 20
//!   sites: [github.com]
//! inference:
//!   use_ai: true
//! llm:
//!   provider: openai
//!   model: gpt-4o-mini
//!   auth_token: ${OPENAI_API_KEY}
//! store:
//!   database_url: sqlite://prospect.db
//! ```
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use prospect_common::observability::LogFormat;
use prospect_common::{DEFAULT_PROVIDERS, DEFAULT_SITES, SearchEngineKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

pub const ENV_PREFIX: &str = "PROSPECT";

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error(transparent)]
    Source(#[from] config::ConfigError),
    #[error("config does not match schema: {0}")]
    Schema(String),
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error("cannot render config: {0}")]
    Render(String),
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ProspectConfig {
    pub search: SearchConfig,
    pub fetch: FetchConfig,
    pub inference: InferenceConfig,
    /// Absent means no AI collaborator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm: Option<LlmConfig>,
    pub store: StoreConfig,
    pub demo: DemoConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SearchConfig {
    pub engine: SearchEngineKind,
    /// Maximum unique URLs visited per run.
    pub limit: usize,
    /// Only this many queries of the site x provider product are run.
    pub max_queries: usize,
    pub results_per_query: usize,
    pub query_delay_ms: u64,
    pub sites: Vec<String>,
    pub providers: Vec<String>,
    /// Keep only addresses at the provider the query targeted.
    pub filter_by_provider: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brave_token: Option<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            engine: SearchEngineKind::default(),
            limit: 10,
            max_queries: 3,
            results_per_query: 10,
            query_delay_ms: 2000,
            sites: DEFAULT_SITES.iter().map(|s| s.to_string()).collect(),
            providers: DEFAULT_PROVIDERS.iter().map(|s| s.to_string()).collect(),
            filter_by_provider: false,
            brave_token: None,
        }
    }
}

impl SearchConfig {
    pub fn query_delay(&self) -> Duration {
        Duration::from_millis(self.query_delay_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FetchConfig {
    pub http_timeout_secs: u64,
    pub http_retries: usize,
    pub max_redirects: usize,
    /// Parallel tier-1 page fetches.
    pub concurrency: usize,
    pub render_timeout_secs: u64,
    pub settle_ms: u64,
    /// Jitter ceiling for the settle wait on search result pages.
    pub settle_jitter_ms: u64,
    pub webdriver_url: String,
    pub headless: bool,
    pub launch_timeout_secs: u64,
    /// Overrides the built-in desktop user-agent rotation.
    pub user_agents: Vec<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            http_timeout_secs: 10,
            http_retries: 2,
            max_redirects: 10,
            concurrency: 4,
            render_timeout_secs: 30,
            settle_ms: 1500,
            settle_jitter_ms: 1000,
            webdriver_url: "http://localhost:9515".into(),
            headless: true,
            launch_timeout_secs: 20,
            user_agents: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub use_ai: bool,
    pub threshold: f64,
    pub batch_size: usize,
    pub batch_pause_ms: u64,
    pub ai_timeout_secs: u64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            use_ai: false,
            threshold: 0.80,
            batch_size: 5,
            batch_pause_ms: 1000,
            ai_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum LlmConfig {
    Openai {
        model: String,
        auth_token: String,
        #[serde(default)]
        temperature: Option<f32>,
        #[serde(default)]
        max_tokens: Option<u32>,
        #[serde(default = "default_openai_endpoint")]
        endpoint: String,
    },
    Ollama {
        model: String,
        #[serde(default = "default_ollama_endpoint")]
        endpoint: String,
        #[serde(default)]
        temperature: Option<f32>,
        #[serde(default)]
        max_tokens: Option<u32>,
    },
}

fn default_openai_endpoint() -> String {
    "https://api.openai.com/v1".into()
}
fn default_ollama_endpoint() -> String {
    "http://localhost:11434".into()
}

impl LlmConfig {
    pub fn model(&self) -> &str {
        match self {
            LlmConfig::Openai { model, .. } | LlmConfig::Ollama { model, .. } => model,
        }
    }

    pub fn temperature(&self) -> Option<f32> {
        match self {
            LlmConfig::Openai { temperature, .. } | LlmConfig::Ollama { temperature, .. } => {
                *temperature
            }
        }
    }

    pub fn max_tokens(&self) -> Option<u32> {
        match self {
            LlmConfig::Openai { max_tokens, .. } | LlmConfig::Ollama { max_tokens, .. } => {
                *max_tokens
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    pub database_url: String,
    /// Persist demo rows (still tagged synthetic).
    pub save_synthetic: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://prospect.db".into(),
            save_synthetic: false,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DemoConfig {
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub stderr: bool,
    pub filter: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            stderr: false,
            filter: "info".into(),
            dir: None,
        }
    }
}

impl ProspectConfig {
    /// Reject values no run could work with.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.search.sites.iter().all(|s| s.trim().is_empty()) {
            return Err(ConfigLoadError::Invalid("search.sites is empty".into()));
        }
        if self.search.providers.iter().all(|p| p.trim().is_empty()) {
            return Err(ConfigLoadError::Invalid("search.providers is empty".into()));
        }
        if self.fetch.concurrency == 0 {
            return Err(ConfigLoadError::Invalid("fetch.concurrency must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.inference.threshold) {
            return Err(ConfigLoadError::Invalid(
                "inference.threshold must be within 0..=1".into(),
            ));
        }
        Ok(())
    }

    /// YAML rendering with secrets masked, for `prospect config`.
    pub fn to_redacted_yaml(&self) -> Result<String, ConfigLoadError> {
        let mut shown = self.clone();
        if shown.search.brave_token.is_some() {
            shown.search.brave_token = Some("<redacted>".into());
        }
        if let Some(LlmConfig::Openai { auth_token, .. }) = &mut shown.llm {
            *auth_token = "<redacted>".into();
        }
        serde_yaml::to_string(&shown).map_err(|e| ConfigLoadError::Render(e.to_string()))
    }
}

/// `<config dir>/prospect/prospect.yaml`, when the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("prospect").join("prospect.yaml"))
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hides the `config` crate wiring (YAML + env overrides).
pub struct ProspectConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
    env: bool,
}

impl Default for ProspectConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ProspectConfigLoader {
    /// Empty sources; every field falls back to its default.
    ///
    /// ```
    /// use prospect_config::ProspectConfigLoader;
    ///
    /// let config = ProspectConfigLoader::new()
    ///     .with_yaml_str("search:\n  limit: 3")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.search.limit, 3);
    /// assert_eq!(config.search.sites.len(), 3);
    /// assert!(config.llm.is_none());
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
            env: true,
        }
    }

    /// Skip the `PROSPECT__` environment overlay.
    pub fn without_env(mut self) -> Self {
        self.env = false;
        self
    }

    /// Attach a required YAML/TOML/JSON file; format is inferred by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that may be absent.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Merge an inline YAML snippet.
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Merge sources, expand `${VAR}` placeholders, deserialize, validate.
    ///
    /// ```
    /// use prospect_config::{LlmConfig, ProspectConfigLoader};
    ///
    /// unsafe { std::env::set_var("PROSPECT_DOC_KEY", "injected-from-env"); }
    ///
    /// let config = ProspectConfigLoader::new()
    ///     .with_yaml_str(r#"
    /// llm:
    ///   provider: openai
    ///   model: gpt-4o-mini
    ///   auth_token: "${PROSPECT_DOC_KEY}"
    /// "#)
    ///     .load()
    ///     .expect("valid configuration");
    ///
    /// match config.llm {
    ///     Some(LlmConfig::Openai { auth_token, endpoint, .. }) => {
    ///         assert_eq!(auth_token, "injected-from-env");
    ///         assert_eq!(endpoint, "https://api.openai.com/v1");
    ///     }
    ///     other => panic!("expected OpenAI configuration, got {other:?}"),
    /// }
    ///
    /// unsafe { std::env::remove_var("PROSPECT_DOC_KEY"); }
    /// ```
    pub fn load(self) -> Result<ProspectConfig, ConfigLoadError> {
        let mut builder = self.builder;
        if self.env {
            builder = builder.add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("search.sites")
                    .with_list_parse_key("search.providers")
                    .with_list_parse_key("fetch.user_agents"),
            );
        }
        let cfg = builder.build()?;

        let mut v: Value = cfg.try_deserialize()?;
        if v.is_null() {
            v = Value::Object(Default::default());
        }
        expand_env_in_value(&mut v);

        let typed: ProspectConfig =
            serde_json::from_value(v).map_err(|e| ConfigLoadError::Schema(e.to_string()))?;
        typed.validate()?;
        Ok(typed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn expands_simple_string() {
        temp_env::with_var("FOO", Some("bar"), || {
            let mut v = json!("prefix-${FOO}-suffix");
            expand_env_in_value(&mut v);
            assert_eq!(v, json!("prefix-bar-suffix"));
        });
    }

    #[test]
    fn expands_in_array_and_object() {
        temp_env::with_vars([("SITE", Some("github.com")), ("TLD", Some("io"))], || {
            let mut v = json!(["site:$SITE", { "host": "${SITE}.${TLD}" }, 42, true, null]);
            expand_env_in_value(&mut v);
            assert_eq!(
                v,
                json!(["site:github.com", { "host": "github.com.io" }, 42, true, null])
            );
        });
    }

    #[test]
    fn expands_recursively_across_env_values() {
        temp_env::with_vars(
            [
                ("BAZ", Some("qux")),
                ("BAR", Some("mid-${BAZ}")),
                ("FOO", Some("start-${BAR}-end")),
            ],
            || {
                let mut v = json!("X=${FOO}");
                expand_env_in_value(&mut v);
                assert_eq!(v, json!("X=start-mid-qux-end"));
            },
        );
    }

    #[test]
    fn cycles_terminate() {
        temp_env::with_vars([("A", Some("${B}")), ("B", Some("${A}"))], || {
            let mut v = json!("x=${A}-y");
            expand_env_in_value(&mut v);
            let s = v.as_str().unwrap_or_default();
            assert!(s.starts_with("x=") && s.ends_with("-y"));
            assert!(s.contains("${"));
        });
    }

    #[test]
    fn unknown_vars_are_left_as_is() {
        let mut v = json!("hi-${PROSPECT_DOES_NOT_EXIST}");
        expand_env_in_value(&mut v);
        assert_eq!(v, json!("hi-${PROSPECT_DOES_NOT_EXIST}"));
    }

    #[test]
    fn defaults_are_valid() {
        let cfg = ProspectConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.search.engine, SearchEngineKind::Google);
        assert_eq!(cfg.search.providers.len(), 5);
        assert_eq!(cfg.inference.batch_size, 5);
        assert!(!cfg.demo.enabled);
    }

    #[test]
    fn validation_rejects_unusable_values() {
        let mut cfg = ProspectConfig::default();
        cfg.search.sites.clear();
        assert!(matches!(cfg.validate(), Err(ConfigLoadError::Invalid(_))));

        let mut cfg = ProspectConfig::default();
        cfg.inference.threshold = 1.5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn redacted_yaml_hides_secrets() {
        let mut cfg = ProspectConfig::default();
        cfg.search.brave_token = Some("brave-secret".into());
        cfg.llm = Some(LlmConfig::Openai {
            model: "gpt-4o-mini".into(),
            auth_token: "sk-secret".into(),
            temperature: None,
            max_tokens: None,
            endpoint: default_openai_endpoint(),
        });
        let yaml = cfg.to_redacted_yaml().unwrap_or_default();
        assert!(!yaml.contains("brave-secret"));
        assert!(!yaml.contains("sk-secret"));
        assert!(yaml.contains("provider: openai"));
    }
}

//! Data model flowing through the discovery pipeline.
//!
//! Everything here is created per run and discarded afterwards; nothing in
//! this module owns I/O or shared state.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `search_engine` tag carried by demo results.
pub const SYNTHETIC_ENGINE: &str = "synthetic";

/// Sites targeted when none are configured.
pub const DEFAULT_SITES: &[&str] = &["linkedin.com", "github.com", "stackoverflow.com"];

/// Webmail providers targeted when none are configured.
pub const DEFAULT_PROVIDERS: &[&str] = &[
    "@gmail.com",
    "@yahoo.com",
    "@outlook.com",
    "@hotmail.com",
    "@protonmail.com",
];

/// One site-scoped, provider-scoped search for a profile keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub text: String,
    pub site: String,
    pub email_provider: String,
    pub profile: String,
}

/// How a candidate URL was discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiscoveryMethod {
    /// Parsed from a static HTML results page.
    HtmlScrape,
    /// Returned by a JSON search API.
    JsonApi,
    /// Read from a browser-rendered results page.
    Rendered,
}

/// A URL produced by a search engine for a given query. Never carries
/// email data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateUrl {
    pub url: String,
    pub source_site: String,
    pub email_provider: String,
    pub discovery_method: DiscoveryMethod,
}

/// Emails found on one fetched page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Lowercased, deduplicated, first-seen order.
    pub emails: Vec<String>,
    /// Derived from the host actually fetched.
    pub platform: String,
    pub source_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InferenceMethod {
    PatternMatching,
    AiEnhanced,
    Fallback,
}

impl InferenceMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PatternMatching => "pattern-matching",
            Self::AiEnhanced => "ai-enhanced",
            Self::Fallback => "fallback",
        }
    }
}

impl fmt::Display for InferenceMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InferenceMethod {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "pattern-matching" => Ok(Self::PatternMatching),
            "ai-enhanced" => Ok(Self::AiEnhanced),
            "fallback" => Ok(Self::Fallback),
            other => Err(format!("unknown inference method `{other}`")),
        }
    }
}

/// A probable person name for an email address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameInference {
    pub name: String,
    /// Always within `[0, 1]`.
    pub confidence: f64,
    pub method: InferenceMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    /// Pattern result that an AI answer replaced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_fallback: Option<Box<NameInference>>,
}

impl NameInference {
    pub fn pattern(name: impl Into<String>, confidence: f64) -> Self {
        Self::new(name, confidence, InferenceMethod::PatternMatching)
    }

    pub fn fallback(name: impl Into<String>, confidence: f64) -> Self {
        Self::new(name, confidence, InferenceMethod::Fallback)
    }

    fn new(name: impl Into<String>, confidence: f64, method: InferenceMethod) -> Self {
        Self {
            name: name.into(),
            confidence: clamp_confidence(confidence),
            method,
            reasoning: None,
            pattern_fallback: None,
        }
    }

    /// Replace this pattern result with an AI answer, keeping `self` as the
    /// recorded fallback.
    pub fn enhanced_by(self, name: impl Into<String>, confidence: f64, reasoning: String) -> Self {
        Self {
            name: name.into(),
            confidence: clamp_confidence(confidence),
            method: InferenceMethod::AiEnhanced,
            reasoning: Some(reasoning),
            pattern_fallback: Some(Box::new(self)),
        }
    }
}

pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Search backends the pipeline can resolve queries against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchEngineKind {
    #[default]
    Google,
    Bing,
    #[serde(rename = "duckduckgo")]
    DuckDuckGo,
    Brave,
}

impl SearchEngineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Bing => "bing",
            Self::DuckDuckGo => "duckduckgo",
            Self::Brave => "brave",
        }
    }
}

impl fmt::Display for SearchEngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchEngineKind {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "google" => Ok(Self::Google),
            "bing" => Ok(Self::Bing),
            "duckduckgo" | "ddg" => Ok(Self::DuckDuckGo),
            "brave" => Ok(Self::Brave),
            other => Err(format!("unknown search engine `{other}`")),
        }
    }
}

/// Final record emitted by a discovery run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryResult {
    pub profile: String,
    pub name: String,
    pub email: String,
    pub platform: String,
    /// Engine name, or [`SYNTHETIC_ENGINE`] for demo rows.
    pub search_engine: String,
    pub confidence: f64,
    pub ai_enhanced: bool,
    pub method: InferenceMethod,
    pub source_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub targeted_email_provider: Option<String>,
    #[serde(default)]
    pub synthetic: bool,
    pub discovered_at: DateTime<Utc>,
}

//! Common types shared across the Prospect crates.
//!
//! This crate holds the pipeline data model, the shared error type, and the
//! tracing initialiser. It stays dependency-light so that every other crate
//! can depend on it.
//!
//! # Overview
//!
//! - [`model`]: queries, candidate URLs, extraction results, name inferences,
//!   and the assembled [`DiscoveryResult`]
//! - [`assist`]: the optional AI naming collaborator interface
//! - [`observability`]: centralised tracing/logging initialisation
//! - [`ProspectError`] and [`Result`]: shared error handling
//!
//! # Examples
//!
//! ```rust
//! use prospect_common::{InferenceMethod, NameInference};
//!
//! let inference = NameInference::pattern("John Doe", 0.9);
//! assert_eq!(inference.method, InferenceMethod::PatternMatching);
//! ```

pub mod assist;
pub mod model;
pub mod observability;

pub use assist::{AssistedName, NameAssistant, MAX_ASSIST_BATCH};
pub use model::{
    CandidateUrl, DiscoveryMethod, DiscoveryResult, ExtractionResult, InferenceMethod,
    NameInference, Query, SearchEngineKind, DEFAULT_PROVIDERS, DEFAULT_SITES, SYNTHETIC_ENGINE,
};

/// Error types used across the Prospect pipeline.
#[derive(thiserror::Error, Debug)]
pub enum ProspectError {
    /// Caller supplied input that cannot start a run.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The AI collaborator failed.
    #[error("Agent error: {0}")]
    Agent(String),

    /// The shared browser could not be started. Fatal for the run.
    #[error("Browser launch failed: {0}")]
    BrowserLaunch(String),

    /// A driver (browser, network, etc.) reported an error.
    #[error("Driver error: {0}")]
    Driver(#[from] anyhow::Error),

    /// The result store rejected an operation.
    #[error("Store error: {0}")]
    Store(String),

    /// Operation exceeded the configured timeout.
    #[error("Timeout occurred")]
    Timeout,

    /// The run was cancelled before it finished.
    #[error("Cancelled")]
    Cancelled,
}

/// Convenient alias for results that use [`ProspectError`].
pub type Result<T> = std::result::Result<T, ProspectError>;

//! The discovery pipeline.
//!
//! [`QueryBuilder`] expands a profile keyword into site x provider queries,
//! [`DiscoveryOrchestrator`] drives them through a search engine, the page
//! fetcher, extraction, and naming, and [`assemble`] wires all of it from a
//! [`ProspectConfig`](prospect_config::ProspectConfig).
pub mod assemble;
pub mod orchestrator;
pub mod query;
pub mod synthetic;

pub use assemble::{build_inferencer, build_orchestrator};
pub use orchestrator::{
    DiscoveryOptions, DiscoveryOrchestrator, DiscoveryOutcome, DiscoveryReport,
    NoResultsExplanation, NoResultsReason, OrchestratorSettings,
};
pub use query::QueryBuilder;

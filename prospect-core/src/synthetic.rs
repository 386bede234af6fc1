//! Demo result sets for runs where live discovery found nothing.
//!
//! Only reachable when demo mode is switched on. Every row carries
//! `synthetic = true` and `search_engine = "synthetic"`, and its source URL
//! uses the `synthetic://` scheme.

use chrono::{DateTime, Utc};
use prospect_common::{DiscoveryResult, InferenceMethod, NameInference, SYNTHETIC_ENGINE};
use prospect_web::platform_for_url;

const DEMO_HANDLES: &[&str] = &[
    "john.smith",
    "sarah.johnson",
    "mike.chen",
    "emily.davis",
    "alex_rodriguez",
    "jessica.brown",
    "dwilson",
    "lisa.anderson",
];

/// Deterministic `(email, site, provider)` triples, rotating through both lists.
pub fn demo_contacts(sites: &[String], providers: &[String], count: usize) -> Vec<(String, String, String)> {
    if sites.is_empty() || providers.is_empty() {
        return Vec::new();
    }
    (0..count.min(DEMO_HANDLES.len()))
        .map(|i| {
            let provider = &providers[i % providers.len()];
            let site = &sites[i % sites.len()];
            let domain = provider.trim_start_matches('@');
            (
                format!("{}@{}", DEMO_HANDLES[i], domain),
                site.clone(),
                provider.clone(),
            )
        })
        .collect()
}

/// Assemble demo rows from already inferred names, in the order given.
pub fn assemble(
    profile: &str,
    contacts: Vec<(String, String, String)>,
    names: Vec<NameInference>,
    at: DateTime<Utc>,
) -> Vec<DiscoveryResult> {
    let slug = profile.trim().replace(char::is_whitespace, "-").to_lowercase();
    contacts
        .into_iter()
        .zip(names)
        .map(|((email, site, provider), name)| DiscoveryResult {
            profile: profile.to_string(),
            name: name.name,
            email,
            platform: platform_for_url(&format!("https://{site}/")),
            search_engine: SYNTHETIC_ENGINE.to_string(),
            confidence: name.confidence,
            ai_enhanced: name.method == InferenceMethod::AiEnhanced,
            method: name.method,
            source_url: format!("synthetic://{site}/{slug}"),
            targeted_email_provider: Some(provider),
            synthetic: true,
            discovered_at: at,
        })
        .collect()
}

//! Site x provider query construction.

use prospect_common::{Query, DEFAULT_PROVIDERS, DEFAULT_SITES};

#[derive(Debug, Clone)]
pub struct QueryBuilder {
    sites: Vec<String>,
    providers: Vec<String>,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new(
            DEFAULT_SITES.iter().map(|s| s.to_string()),
            DEFAULT_PROVIDERS.iter().map(|p| p.to_string()),
        )
    }
}

impl QueryBuilder {
    /// Blank entries are dropped; empty lists fall back to the defaults.
    pub fn new<S, P>(sites: S, providers: P) -> Self
    where
        S: IntoIterator<Item = String>,
        P: IntoIterator<Item = String>,
    {
        let sites = clean(sites, DEFAULT_SITES);
        let providers = clean(providers, DEFAULT_PROVIDERS);
        Self { sites, providers }
    }

    pub fn sites(&self) -> &[String] {
        &self.sites
    }

    pub fn providers(&self) -> &[String] {
        &self.providers
    }

    /// Every site x provider pair, site-major, as
    /// `site:<site> "<profile>" "<provider>"`.
    pub fn build(&self, profile: &str) -> Vec<Query> {
        let keyword = profile.trim().replace('"', "");
        let mut out = Vec::with_capacity(self.sites.len() * self.providers.len());
        for site in &self.sites {
            for provider in &self.providers {
                out.push(Query {
                    text: format!("site:{site} \"{keyword}\" \"{provider}\""),
                    site: site.clone(),
                    email_provider: provider.clone(),
                    profile: keyword.clone(),
                });
            }
        }
        out
    }
}

fn clean<I: IntoIterator<Item = String>>(raw: I, fallback: &[&str]) -> Vec<String> {
    let items: Vec<String> = raw
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if items.is_empty() {
        fallback.iter().map(|s| s.to_string()).collect()
    } else {
        items
    }
}

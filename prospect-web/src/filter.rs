//! Cleaning of result links scraped from search pages.

use std::collections::HashSet;

use percent_encoding::percent_decode_str;
use prospect_common::{CandidateUrl, DiscoveryMethod, Query};
use url::Url;

/// First path segments of sign-in pages, compared whole (`/author` is kept).
const AUTH_PATH_SEGMENTS: &[&str] = &[
    "login",
    "signin",
    "sign-in",
    "signup",
    "sign-up",
    "auth",
    "oauth",
    "servicelogin",
    "checkpoint",
    "uas",
];

const AUTH_HOST_PREFIXES: &[&str] = &["accounts.", "login.", "auth.", "signin."];

/// Turns raw `href`s into result URLs, dropping anything that is not a
/// third-party page.
#[derive(Debug, Clone)]
pub struct LinkFilter {
    own_domains: Vec<String>,
    base: Option<Url>,
}

impl LinkFilter {
    /// `own_domains` are the engine's domains; `base` resolves relative hrefs.
    pub fn new<I, S>(own_domains: I, base: Option<Url>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            own_domains: own_domains.into_iter().map(Into::into).collect(),
            base,
        }
    }

    pub fn clean(&self, href: &str) -> Option<String> {
        let href = href.trim();
        if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
            return None;
        }
        let parsed = match &self.base {
            Some(base) => base.join(href).ok()?,
            None => Url::parse(href).ok()?,
        };
        let mut url = unwrap_redirect(&parsed).unwrap_or(parsed);
        if url.scheme() != "http" && url.scheme() != "https" {
            return None;
        }
        let host = url.host_str()?.to_ascii_lowercase();
        if self.is_own(&host) || is_cache_or_amp(&host, url.path()) || is_auth(&host, url.path()) {
            return None;
        }
        url.set_fragment(None);
        Some(url.to_string())
    }

    fn is_own(&self, host: &str) -> bool {
        self.own_domains
            .iter()
            .any(|d| host == d || host.ends_with(&format!(".{d}")))
    }
}

/// Unwrap engine redirect links (`/url?q=`, `/l/?uddg=`).
fn unwrap_redirect(url: &Url) -> Option<Url> {
    let path = url.path();
    let key = if path == "/url" {
        ["q", "url"].as_slice()
    } else if path.starts_with("/l/") || path == "/l" {
        ["uddg"].as_slice()
    } else {
        return None;
    };
    let target = url
        .query_pairs()
        .find(|(k, _)| key.contains(&k.as_ref()))
        .map(|(_, v)| v.into_owned())?;
    Url::parse(&target).ok()
}

/// Decode a DuckDuckGo `uddg=` redirect value taken from a raw href.
pub fn decode_uddg(href: &str) -> Option<String> {
    let start = href.find("uddg=")? + 5;
    let end = href[start..]
        .find('&')
        .map(|i| start + i)
        .unwrap_or(href.len());
    let encoded = &href[start..end];
    (!encoded.is_empty()).then(|| percent_decode_str(encoded).decode_utf8_lossy().into_owned())
}

fn is_cache_or_amp(host: &str, path: &str) -> bool {
    host.starts_with("webcache.")
        || host.starts_with("cc.bingj.")
        || host.ends_with("ampproject.org")
        || host.ends_with("cdn.ampproject.org")
        || path.starts_with("/amp/")
        || path.contains("/cache.aspx")
}

fn is_auth(host: &str, path: &str) -> bool {
    if AUTH_HOST_PREFIXES.iter().any(|p| host.starts_with(p)) {
        return true;
    }
    let first = path
        .trim_start_matches('/')
        .split('/')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    // `login.php` counts as `login`.
    let stem = first.split('.').next().unwrap_or_default();
    AUTH_PATH_SEGMENTS.contains(&stem)
}

/// Clean, deduplicate (first wins), and cap links as candidates for `query`.
pub fn to_candidates<I>(
    hrefs: I,
    filter: &LinkFilter,
    query: &Query,
    method: DiscoveryMethod,
    max_results: usize,
) -> Vec<CandidateUrl>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for href in hrefs {
        if out.len() >= max_results {
            break;
        }
        let Some(url) = filter.clean(&href) else {
            continue;
        };
        if seen.insert(url.clone()) {
            out.push(CandidateUrl {
                url,
                source_site: query.site.clone(),
                email_provider: query.email_provider.clone(),
                discovery_method: method,
            });
        }
    }
    out
}

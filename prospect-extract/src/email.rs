//! Email extraction from fetched pages.

use std::collections::HashSet;

use percent_encoding::percent_decode_str;
use regex::Regex;
use validator::ValidateEmail;

/// Placeholder domains that never belong to a real person.
pub const EXCLUDED_DOMAINS: &[&str] = &[
    "example.com",
    "test.com",
    "placeholder.com",
    "sample.com",
    "domain.com",
];

/// Asset file names that look like addresses (`logo@2x.png`).
pub const EXCLUDED_SUFFIXES: &[&str] = &[".png", ".jpg", ".gif", ".svg"];

const EMAIL_PATTERN: &str = r"[A-Za-z0-9._+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}";
const SCRIPT_PATTERN: &str = r"(?is)<script\b[^>]*>.*?</script\s*>";
const STYLE_PATTERN: &str = r"(?is)<style\b[^>]*>.*?</style\s*>";

/// Finds, validates, and filters email addresses in page content.
#[derive(Debug, Clone)]
pub struct EmailExtractor {
    email: Regex,
    script: Regex,
    style: Regex,
}

impl EmailExtractor {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            email: Regex::new(EMAIL_PATTERN)?,
            script: Regex::new(SCRIPT_PATTERN)?,
            style: Regex::new(STYLE_PATTERN)?,
        })
    }

    /// Extract from HTML. `<script>` and `<style>` blocks are removed and
    /// percent-escapes (as in `mailto:%20jane@...`) decoded first.
    ///
    /// `provider` (e.g. `"@gmail.com"`) keeps only addresses whose domain
    /// ends with it, case-insensitively.
    pub fn extract(&self, html: &str, provider: Option<&str>) -> Vec<String> {
        let without_scripts = self.script.replace_all(html, " ");
        let visible = self.style.replace_all(&without_scripts, " ");
        let decoded = percent_decode_str(&visible).decode_utf8_lossy();
        self.extract_text(&decoded, provider)
    }

    /// Extract from plain text; nothing is stripped.
    pub fn extract_text(&self, text: &str, provider: Option<&str>) -> Vec<String> {
        let provider = provider.map(normalize_provider).filter(|p| !p.is_empty());
        let mut seen = HashSet::new();
        let mut out = Vec::new();

        for m in self.email.find_iter(text) {
            let candidate = m.as_str().trim().to_lowercase();
            if !is_acceptable(&candidate) {
                continue;
            }
            if let Some(p) = &provider {
                if !matches_provider(&candidate, p) {
                    continue;
                }
            }
            if seen.insert(candidate.clone()) {
                out.push(candidate);
            }
        }
        out
    }
}

/// Syntax-valid and not a known placeholder or asset name.
pub fn is_acceptable(email: &str) -> bool {
    if !email.validate_email() {
        return false;
    }
    if EXCLUDED_SUFFIXES.iter().any(|s| email.ends_with(s)) {
        return false;
    }
    let domain = match email.rsplit_once('@') {
        Some((_, d)) => d,
        None => return false,
    };
    !EXCLUDED_DOMAINS
        .iter()
        .any(|d| domain == *d || domain.ends_with(&format!(".{d}")))
}

fn normalize_provider(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn matches_provider(email: &str, provider: &str) -> bool {
    if provider.starts_with('@') {
        return email.ends_with(provider);
    }
    match email.rsplit_once('@') {
        Some((_, domain)) => domain == provider || domain.ends_with(&format!(".{provider}")),
        None => false,
    }
}

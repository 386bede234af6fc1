//! Pattern-based name inference from email local parts.
//!
//! Rules are data: an ordered table of (pattern, formatter, base confidence).
//! The first rule whose pattern matches and whose formatter produces a name
//! wins. A plausibility bonus is applied afterwards.

use async_trait::async_trait;
use prospect_common::NameInference;
use regex::{Captures, Regex};

pub const PLAUSIBILITY_BONUS: f64 = 0.10;
pub const FALLBACK_CONFIDENCE: f64 = 0.30;

/// First names recognised for the bonus and for splitting `johnsmith`.
pub const COMMON_FIRST_NAMES: &[&str] = &[
    "aaron", "adam", "alex", "alice", "amanda", "amy", "andrew", "anna", "anthony", "ashley",
    "ben", "brian", "carlos", "chris", "daniel", "david", "emily", "emma", "eric", "george",
    "grace", "hannah", "jack", "james", "jane", "jason", "jennifer", "jessica", "john", "jose",
    "joseph", "julia", "karen", "kevin", "laura", "lisa", "maria", "mark", "mary", "matt",
    "michael", "mike", "nancy", "nick", "olivia", "paul", "peter", "rachel", "robert", "ryan",
    "sam", "sarah", "scott", "sophia", "steven", "thomas", "tom", "william",
];

/// Endings that make `johnson` a surname, not `John Son`.
const PATRONYMIC_SUFFIXES: &[&str] = &["son", "sen"];

type Formatter = fn(&Captures<'_>) -> Option<String>;

struct NameRule {
    label: &'static str,
    pattern: Regex,
    format: Formatter,
    confidence: f64,
}

fn rule(label: &'static str, pattern: &str, format: Formatter, confidence: f64) -> Result<NameRule, regex::Error> {
    Ok(NameRule {
        label,
        pattern: Regex::new(pattern)?,
        format,
        confidence,
    })
}

/// Title-case one word: `doe` -> `Doe`.
pub fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn two_words(caps: &Captures<'_>) -> Option<String> {
    Some(format!("{} {}", title_case(&caps[1]), title_case(&caps[2])))
}

fn concatenated(caps: &Captures<'_>) -> Option<String> {
    let local = &caps[0];
    // Longest known first name wins so `johnathan` is not split as `john`.
    let mut names: Vec<&str> = COMMON_FIRST_NAMES.to_vec();
    names.sort_by_key(|n| std::cmp::Reverse(n.len()));
    names.into_iter().find_map(|first| {
        let rest = local.strip_prefix(first)?;
        ((3..=15).contains(&rest.len()) && !PATRONYMIC_SUFFIXES.contains(&rest))
            .then(|| format!("{} {}", title_case(first), title_case(rest)))
    })
}

fn initial_and_surname(caps: &Captures<'_>) -> Option<String> {
    Some(format!("{}. {}", caps[1].to_uppercase(), title_case(&caps[2])))
}

fn single_word(caps: &Captures<'_>) -> Option<String> {
    Some(title_case(&caps[1]))
}

fn is_common_first_name(token: &str) -> bool {
    let token = token.trim_end_matches('.').to_lowercase();
    COMMON_FIRST_NAMES.contains(&token.as_str())
}

/// Length 3 to 30 and more than 80% alphabetic.
pub fn is_plausible_name(name: &str) -> bool {
    let total = name.chars().count();
    if !(3..=30).contains(&total) {
        return false;
    }
    let alpha = name.chars().filter(|c| c.is_alphabetic()).count();
    (alpha as f64) / (total as f64) > 0.8
}

/// Local part of an address, lowercased, without `+tag` sub-addressing.
pub fn local_part(email: &str) -> String {
    let lower = email.trim().to_lowercase();
    let local = lower.split('@').next().unwrap_or_default();
    local.split('+').next().unwrap_or_default().to_string()
}

/// Title-case with `.`, `_`, `-` treated as spaces.
pub fn fallback_name(local: &str) -> String {
    local
        .split(['.', '_', '-'])
        .filter(|w| !w.is_empty())
        .map(title_case)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Infers a name from an email address.
#[async_trait]
pub trait NameInferencer: Send + Sync {
    async fn infer(&self, email: &str, use_ai: bool) -> NameInference;

    async fn infer_many(&self, emails: &[String], use_ai: bool) -> Vec<NameInference> {
        let mut out = Vec::with_capacity(emails.len());
        for email in emails {
            out.push(self.infer(email, use_ai).await);
        }
        out
    }
}

/// The pure rule-table inferencer. Ignores `use_ai`.
pub struct PatternInferencer {
    rules: Vec<NameRule>,
}

impl PatternInferencer {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            rules: vec![
                rule("first.last", r"^([a-z]{2,})\.([a-z]{2,})$", two_words, 0.90)?,
                rule("first_last", r"^([a-z]{2,})_([a-z]{2,})$", two_words, 0.85)?,
                rule("firstlast", r"^[a-z]{4,30}$", concatenated, 0.50)?,
                rule("f.last", r"^([a-z])\.([a-z]{2,})$", initial_and_surname, 0.70)?,
                rule("word", r"^([a-z]{2,})$", single_word, 0.60)?,
            ],
        })
    }

    /// Run the rule table.
    pub fn infer_pattern(&self, email: &str) -> NameInference {
        let local = local_part(email);

        for r in &self.rules {
            let Some(caps) = r.pattern.captures(&local) else {
                continue;
            };
            let Some(name) = (r.format)(&caps) else {
                continue;
            };
            let first = name.split_whitespace().next().unwrap_or_default();
            let bonus = if is_common_first_name(first) || is_plausible_name(&name) {
                PLAUSIBILITY_BONUS
            } else {
                0.0
            };
            tracing::trace!(target: "extract.name", rule = r.label, %name, "name.rule_matched");
            return NameInference::pattern(name, r.confidence + bonus);
        }

        NameInference::fallback(fallback_name(&local), FALLBACK_CONFIDENCE)
    }
}

#[async_trait]
impl NameInferencer for PatternInferencer {
    async fn infer(&self, email: &str, _use_ai: bool) -> NameInference {
        self.infer_pattern(email)
    }

    async fn infer_many(&self, emails: &[String], _use_ai: bool) -> Vec<NameInference> {
        emails.iter().map(|e| self.infer_pattern(e)).collect()
    }
}

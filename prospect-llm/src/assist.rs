//! Prompt-driven [`NameAssistant`] backed by any [`LlmClient`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use prospect_common::{AssistedName, NameAssistant, ProspectError, Result, MAX_ASSIST_BATCH};
use serde::Deserialize;
use serde_json::Value;

use crate::json::extract_json_block;
use crate::traits::LlmClient;

const SYSTEM_PROMPT: &str = r#"
You infer the most likely real person name behind an email address.
Use only the local part (before '@'). Expand initials only when the local part
makes the expansion obvious; otherwise keep the initial. Return strict JSON only.
"#;

pub struct LlmNameAssistant {
    client: Arc<dyn LlmClient>,
    enabled: bool,
    max_tokens: u32,
    temperature: f32,
}

impl LlmNameAssistant {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self {
            client,
            enabled: true,
            max_tokens: 200,
            temperature: 0.1,
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Override the per-email token budget and sampling temperature.
    pub fn with_generation(mut self, max_tokens: Option<u32>, temperature: Option<f32>) -> Self {
        if let Some(max_tokens) = max_tokens {
            self.max_tokens = max_tokens;
        }
        if let Some(temperature) = temperature {
            self.temperature = temperature;
        }
        self
    }

    pub fn model_name(&self) -> &str {
        self.client.model_name()
    }
}

#[derive(Debug, Deserialize)]
struct RawAnswer {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    confidence: Value,
    #[serde(default)]
    reasoning: Option<String>,
}

impl RawAnswer {
    fn into_assisted(self) -> Option<AssistedName> {
        let name = self.name?.trim().to_string();
        if name.is_empty() || name.eq_ignore_ascii_case("unknown") {
            return None;
        }
        let confidence = match &self.confidence {
            Value::Number(n) => n.as_f64()?,
            Value::String(s) => s.trim().trim_end_matches('%').parse::<f64>().ok()?,
            _ => return None,
        };
        // Some models answer in percent.
        let confidence = if confidence > 1.0 { confidence / 100.0 } else { confidence };
        if !(0.0..=1.0).contains(&confidence) {
            return None;
        }
        Some(AssistedName {
            name,
            confidence,
            reasoning: self.reasoning.unwrap_or_default(),
        })
    }
}

fn single_prompt(email: &str) -> String {
    format!(
        r#"Email: {email}

Return STRICT JSON ONLY with exactly this shape:
{{"name": "<First Last>" | null, "confidence": <0.0-1.0>, "reasoning": "<one sentence>"}}"#
    )
}

fn batch_prompt(emails: &[String]) -> String {
    let list = emails
        .iter()
        .map(|e| format!("- {e}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        r#"Emails:
{list}

Return STRICT JSON ONLY: an array with one object per email, in any order:
[{{"email": "<email>", "name": "<First Last>" | null, "confidence": <0.0-1.0>, "reasoning": "<one sentence>"}}]"#
    )
}

fn parse_single(text: &str) -> Option<AssistedName> {
    let json = extract_json_block(text)?;
    serde_json::from_str::<RawAnswer>(&json).ok()?.into_assisted()
}

fn parse_batch(text: &str, emails: &[String]) -> Vec<Option<AssistedName>> {
    let answers: Vec<RawAnswer> = extract_json_block(text)
        .and_then(|json| serde_json::from_str(&json).ok())
        .unwrap_or_default();

    let mut by_email: HashMap<String, AssistedName> = HashMap::new();
    let mut positional = Vec::new();
    for answer in answers {
        let key = answer.email.as_ref().map(|e| e.trim().to_ascii_lowercase());
        let assisted = answer.into_assisted();
        match key {
            Some(k) => {
                if let Some(a) = assisted {
                    by_email.insert(k, a);
                }
            }
            None => positional.push(assisted),
        }
    }

    emails
        .iter()
        .enumerate()
        .map(|(i, email)| {
            by_email
                .remove(&email.to_ascii_lowercase())
                .or_else(|| positional.get(i).cloned().flatten())
        })
        .collect()
}

#[async_trait]
impl NameAssistant for LlmNameAssistant {
    fn is_enabled(&self) -> bool {
        self.enabled
    }

    async fn infer_name_from_email(&self, email: &str) -> Result<Option<AssistedName>> {
        let resp = self
            .client
            .generate(
                &single_prompt(email),
                Some(SYSTEM_PROMPT),
                Some(self.max_tokens),
                Some(self.temperature),
            )
            .await?;
        let parsed = parse_single(&resp.text);
        if parsed.is_none() {
            tracing::debug!(
                target: "llm.assist",
                %email,
                response_len = resp.text.len(),
                "llm.assist.unparsable"
            );
        }
        Ok(parsed)
    }

    async fn batch_infer(&self, emails: &[String]) -> Result<Vec<Option<AssistedName>>> {
        if emails.is_empty() {
            return Ok(Vec::new());
        }
        if emails.len() > MAX_ASSIST_BATCH {
            return Err(ProspectError::InvalidInput(format!(
                "batch of {} exceeds limit of {MAX_ASSIST_BATCH}",
                emails.len()
            )));
        }
        let resp = self
            .client
            .generate(
                &batch_prompt(emails),
                Some(SYSTEM_PROMPT),
                Some(self.max_tokens * emails.len() as u32),
                Some(self.temperature),
            )
            .await?;
        Ok(parse_batch(&resp.text, emails))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fenced_answer() {
        let got = parse_single(
            "```json\n{\"name\": \"John Doe\", \"confidence\": 0.92, \"reasoning\": \"j + doe\"}\n```",
        )
        .unwrap();
        assert_eq!(got.name, "John Doe");
        assert!((got.confidence - 0.92).abs() < 1e-9);
    }

    #[test]
    fn percent_and_string_confidence_are_normalised() {
        let got = parse_single(r#"{"name": "Ann Lee", "confidence": "85"}"#).unwrap();
        assert!((got.confidence - 0.85).abs() < 1e-9);
        assert_eq!(got.reasoning, "");
    }

    #[test]
    fn null_or_unknown_names_are_no_answer() {
        assert!(parse_single(r#"{"name": null, "confidence": 0.9}"#).is_none());
        assert!(parse_single(r#"{"name": "Unknown", "confidence": 0.9}"#).is_none());
        assert!(parse_single("I can't tell").is_none());
    }

    #[test]
    fn batch_answers_map_back_by_email() {
        let emails = vec!["a@x.io".to_string(), "b@x.io".to_string(), "c@x.io".to_string()];
        let text = r#"[
            {"email": "B@x.io", "name": "Bea", "confidence": 0.7},
            {"email": "a@x.io", "name": "Al", "confidence": 0.6}
        ]"#;
        let got = parse_batch(text, &emails);
        assert_eq!(got.len(), 3);
        assert_eq!(got[0].as_ref().unwrap().name, "Al");
        assert_eq!(got[1].as_ref().unwrap().name, "Bea");
        assert!(got[2].is_none());
    }

    #[test]
    fn malformed_batch_yields_empty_slots() {
        let emails = vec!["a@x.io".to_string()];
        assert_eq!(parse_batch("nope", &emails), vec![None]);
    }
}

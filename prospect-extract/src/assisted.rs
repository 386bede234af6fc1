//! AI re-inference layered over the pattern rules.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use prospect_common::{AssistedName, NameAssistant, NameInference, MAX_ASSIST_BATCH};
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::name::{NameInferencer, PatternInferencer};

#[derive(Debug, Clone)]
pub struct AssistSettings {
    /// The assistant is consulted only below this pattern confidence.
    pub threshold: f64,
    pub call_timeout: Duration,
    /// Emails per assistant request in batch mode.
    pub batch_size: usize,
    pub batch_pause: Duration,
}

impl Default for AssistSettings {
    fn default() -> Self {
        Self {
            threshold: 0.80,
            call_timeout: Duration::from_secs(10),
            batch_size: 5,
            batch_pause: Duration::from_millis(1000),
        }
    }
}

/// Wraps [`PatternInferencer`] and asks a [`NameAssistant`] for a better
/// answer when the pattern result is weak. Assistant failures never surface.
pub struct AssistedInferencer {
    base: PatternInferencer,
    assistant: Arc<dyn NameAssistant>,
    settings: AssistSettings,
}

impl AssistedInferencer {
    pub fn new(
        base: PatternInferencer,
        assistant: Arc<dyn NameAssistant>,
        settings: AssistSettings,
    ) -> Self {
        let batch_size = settings.batch_size.clamp(1, MAX_ASSIST_BATCH);
        Self {
            base,
            assistant,
            settings: AssistSettings {
                batch_size,
                ..settings
            },
        }
    }

    fn wants_assist(&self, use_ai: bool, pattern: &NameInference) -> bool {
        use_ai && self.assistant.is_enabled() && pattern.confidence < self.settings.threshold
    }

    async fn ask_one(&self, email: &str) -> Option<AssistedName> {
        match timeout(
            self.settings.call_timeout,
            self.assistant.infer_name_from_email(email),
        )
        .await
        {
            Ok(Ok(answer)) => answer,
            Ok(Err(e)) => {
                warn!(target: "extract.assist", %email, error = %e, "assist.call_failed");
                None
            }
            Err(_) => {
                warn!(target: "extract.assist", %email, "assist.call_timed_out");
                None
            }
        }
    }

    async fn ask_batch(&self, emails: &[String]) -> Vec<Option<AssistedName>> {
        match timeout(self.settings.call_timeout, self.assistant.batch_infer(emails)).await {
            Ok(Ok(mut answers)) => {
                answers.resize(emails.len(), None);
                answers
            }
            Ok(Err(e)) => {
                warn!(target: "extract.assist", count = emails.len(), error = %e, "assist.batch_failed");
                vec![None; emails.len()]
            }
            Err(_) => {
                warn!(target: "extract.assist", count = emails.len(), "assist.batch_timed_out");
                vec![None; emails.len()]
            }
        }
    }
}

/// Adopt the assistant's answer only when it is strictly more confident.
fn merge(pattern: NameInference, answer: Option<AssistedName>) -> NameInference {
    match answer {
        Some(a) if a.confidence > pattern.confidence => {
            debug!(
                target: "extract.assist",
                pattern_confidence = pattern.confidence,
                ai_confidence = a.confidence,
                "assist.adopted"
            );
            pattern.enhanced_by(a.name, a.confidence, a.reasoning)
        }
        _ => pattern,
    }
}

#[async_trait]
impl NameInferencer for AssistedInferencer {
    async fn infer(&self, email: &str, use_ai: bool) -> NameInference {
        let pattern = self.base.infer_pattern(email);
        if !self.wants_assist(use_ai, &pattern) {
            return pattern;
        }
        let answer = self.ask_one(email).await;
        merge(pattern, answer)
    }

    async fn infer_many(&self, emails: &[String], use_ai: bool) -> Vec<NameInference> {
        let mut results: Vec<NameInference> =
            emails.iter().map(|e| self.base.infer_pattern(e)).collect();
        if !use_ai || !self.assistant.is_enabled() {
            return results;
        }

        let pending: Vec<usize> = (0..emails.len())
            .filter(|&i| self.wants_assist(use_ai, &results[i]))
            .collect();

        for (n, group) in pending.chunks(self.settings.batch_size).enumerate() {
            if n > 0 && !self.settings.batch_pause.is_zero() {
                sleep(self.settings.batch_pause).await;
            }
            let batch: Vec<String> = group.iter().map(|&i| emails[i].clone()).collect();
            let answers = self.ask_batch(&batch).await;
            for (&i, answer) in group.iter().zip(answers) {
                let pattern = std::mem::replace(&mut results[i], NameInference::fallback("", 0.0));
                results[i] = merge(pattern, answer);
            }
        }
        results
    }
}

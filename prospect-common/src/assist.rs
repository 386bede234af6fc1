//! Interface to the optional AI naming collaborator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Largest batch a collaborator accepts in one call.
pub const MAX_ASSIST_BATCH: usize = 10;

/// A collaborator's answer for one address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistedName {
    pub name: String,
    pub confidence: f64,
    pub reasoning: String,
}

/// Optional collaborator that proposes a person name for an email address.
///
/// Callers must treat every error as "no answer".
#[async_trait]
pub trait NameAssistant: Send + Sync {
    fn is_enabled(&self) -> bool;

    async fn infer_name_from_email(&self, email: &str) -> Result<Option<AssistedName>>;

    /// At most [`MAX_ASSIST_BATCH`] emails; one slot per input, in order.
    async fn batch_infer(&self, emails: &[String]) -> Result<Vec<Option<AssistedName>>>;
}

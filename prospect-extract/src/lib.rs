//! Email extraction and name inference.
//!
//! - [`email::EmailExtractor`]: HTML/text to a validated, ordered email set
//! - [`name::PatternInferencer`]: ordered rule table over the local part
//! - [`assisted::AssistedInferencer`]: consults a
//!   [`NameAssistant`](prospect_common::NameAssistant) when the rules are unsure
pub mod assisted;
pub mod email;
pub mod name;

pub use assisted::{AssistSettings, AssistedInferencer};
pub use email::EmailExtractor;
pub use name::{NameInferencer, PatternInferencer};

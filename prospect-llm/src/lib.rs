//! LLM integration for Prospect.
//!
//! [`traits::LlmClient`] is the provider-agnostic interface, with OpenAI and
//! Ollama implementations. [`assist::LlmNameAssistant`] adapts any client to
//! the pipeline's [`prospect_common::NameAssistant`] collaborator.
//!
//! # Examples
//! ```no_run
//! use std::sync::Arc;
//! use prospect_common::NameAssistant;
//! use prospect_llm::{assist::LlmNameAssistant, openai::OpenAiClient};
//!
//! # #[tokio::main]
//! # async fn main() -> prospect_common::Result<()> {
//! let client = OpenAiClient::new("sk-...".into(), prospect_llm::DEFAULT_OPENAI_MODEL.into())?;
//! let assistant = LlmNameAssistant::new(Arc::new(client));
//! let guess = assistant.infer_name_from_email("jdoe@firm.io").await?;
//! # Ok(())
//! # }
//! ```
pub mod assist;
pub mod json;
pub mod ollama;
pub mod openai;
pub mod traits;

pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.2:3b";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

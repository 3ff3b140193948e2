//! Answer generation: the external text-generation boundary.
//!
//! The pipeline only sees the [`AnswerGenerator`] trait. [`GroqGenerator`]
//! talks to an OpenAI-compatible chat completion API.

mod groq;
mod models;
#[cfg(test)]
pub(crate) mod stub;

pub use groq::GroqGenerator;
pub use models::{fallback_models, format_model_name, ModelInfo};

use crate::error::GenerationError;
use async_trait::async_trait;
use std::time::Duration;

/// Model used when the caller does not pick one.
pub const DEFAULT_MODEL: &str = "llama3-8b-8192";

/// One answer request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// Model identifier understood by the generation service.
    pub model_id: String,
    /// The user's question.
    pub question: String,
    /// Transcript excerpts the answer must be based on.
    pub context: String,
    /// Upper bound for the whole call.
    pub timeout: Duration,
}

/// Trait for answer generation services.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// Produce an answer to `request.question` from `request.context`.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;

    /// Short name used in logs.
    fn name(&self) -> &str;
}

//! Error types for VideoMind.

use std::time::Duration;
use thiserror::Error;

/// Application-level error type (configuration, IO, transport setup).
#[derive(Error, Debug)]
pub enum VideomindError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// Result type alias for application-level operations.
pub type Result<T> = std::result::Result<T, VideomindError>;

/// The step of a query at which a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStage {
    Retrieval,
    Assembly,
    Generation,
}

impl std::fmt::Display for QueryStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryStage::Retrieval => write!(f, "retrieval"),
            QueryStage::Assembly => write!(f, "assembly"),
            QueryStage::Generation => write!(f, "generation"),
        }
    }
}

/// Failures surfaced by an answer generator.
///
/// Transport-specific detail is folded into these kinds so callers of the
/// pipeline never have to inspect HTTP errors.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("invalid model '{model}': {message}")]
    InvalidModel { model: String, message: String },

    #[error("network unreachable: {0}")]
    Network(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("empty response from model '{0}'")]
    EmptyResponse(String),

    #[error("{0}")]
    Other(String),
}

/// Errors returned by the retrieval pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("invalid transcript: {0}")]
    InvalidTranscript(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("no transcript loaded; initialize the pipeline first")]
    NotInitialized,

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("no context available for this transcript")]
    NoContextAvailable,

    #[error("answer generation timed out during {stage} after {timeout:?}")]
    GenerationTimeout { stage: QueryStage, timeout: Duration },

    #[error("answer generation failed during {stage}: {source}")]
    GenerationFailure {
        stage: QueryStage,
        #[source]
        source: GenerationError,
    },

    #[error("query cancelled")]
    Cancelled,
}

impl PipelineError {
    /// Short machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::InvalidTranscript(_) => "invalid_transcript",
            PipelineError::InvalidParameter(_) => "invalid_parameter",
            PipelineError::NotInitialized => "not_initialized",
            PipelineError::InvalidQuery(_) => "invalid_query",
            PipelineError::NoContextAvailable => "no_context_available",
            PipelineError::GenerationTimeout { .. } => "generation_timeout",
            PipelineError::GenerationFailure { .. } => "generation_failure",
            PipelineError::Cancelled => "cancelled",
        }
    }

    /// Map a generator failure onto the pipeline taxonomy.
    pub(crate) fn from_generation(stage: QueryStage, err: GenerationError) -> Self {
        match err {
            GenerationError::Timeout(timeout) => {
                PipelineError::GenerationTimeout { stage, timeout }
            }
            source => PipelineError::GenerationFailure { stage, source },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_generator_timeout_maps_to_generation_timeout() {
        let err = PipelineError::from_generation(
            QueryStage::Generation,
            GenerationError::Timeout(Duration::from_secs(30)),
        );
        assert!(matches!(
            err,
            PipelineError::GenerationTimeout { stage: QueryStage::Generation, .. }
        ));
        assert_eq!(err.kind(), "generation_timeout");
    }

    #[test]
    fn test_generation_failure_preserves_source() {
        let err = PipelineError::from_generation(
            QueryStage::Generation,
            GenerationError::RateLimited("slow down".to_string()),
        );
        assert_eq!(err.kind(), "generation_failure");
        let source = err.source().expect("source should be preserved");
        assert_eq!(source.to_string(), "rate limited: slow down");
        assert!(err.to_string().contains("during generation"));
    }
}

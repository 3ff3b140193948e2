//! Test-only answer generator.

use super::{AnswerGenerator, GenerationRequest};
use crate::error::GenerationError;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Records every request and answers with a fixed string.
#[derive(Debug, Clone)]
pub(crate) struct StubGenerator {
    requests: Arc<Mutex<Vec<GenerationRequest>>>,
    pub answer: String,
    pub delay: Duration,
    pub fail_with_rate_limit: bool,
}

impl Default for StubGenerator {
    fn default() -> Self {
        Self {
            requests: Arc::new(Mutex::new(Vec::new())),
            answer: "stub answer".to_string(),
            delay: Duration::ZERO,
            fail_with_rate_limit: false,
        }
    }
}

impl StubGenerator {
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn rate_limited() -> Self {
        Self {
            fail_with_rate_limit: true,
            ..Self::default()
        }
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnswerGenerator for StubGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        self.requests.lock().unwrap().push(request.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail_with_rate_limit {
            return Err(GenerationError::RateLimited("stub limit".to_string()));
        }
        Ok(self.answer.clone())
    }

    fn name(&self) -> &str {
        "stub"
    }
}

//! Groq (OpenAI-compatible) answer generator.

use super::models::sort_newest_first;
use super::{fallback_models, AnswerGenerator, GenerationRequest, ModelInfo};
use crate::config::{GenerationSettings, Prompts};
use crate::error::{GenerationError, Result};
use crate::openai::create_client;
use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Answer generator backed by an OpenAI-compatible chat completion API.
pub struct GroqGenerator {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    has_api_key: bool,
    prompts: Prompts,
    temperature: f32,
    max_tokens: u32,
    models_timeout: Duration,
}

impl GroqGenerator {
    /// Create a generator from settings, reading the API key from the environment.
    pub fn from_settings(settings: &GenerationSettings) -> Result<Self> {
        let generator = Self::new(
            &settings.api_base,
            settings.api_key(),
            settings.timeout(),
        )?
        .with_sampling(settings.temperature, settings.max_tokens)
        .with_models_timeout(settings.models_timeout());
        Ok(generator)
    }

    /// Create a generator for `api_base`.
    ///
    /// A missing key is not an error here; calls fail with
    /// [`GenerationError::Authentication`] instead.
    pub fn new(api_base: &str, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let has_api_key = api_key.is_some();
        let client = create_client(api_base, api_key.as_deref().unwrap_or_default(), timeout)?;

        Ok(Self {
            client,
            has_api_key,
            prompts: Prompts::default(),
            temperature: 0.1,
            max_tokens: 1024,
            models_timeout: Duration::from_secs(10),
        })
    }

    /// Set custom prompts (with user-defined variables).
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// Set temperature and answer length.
    pub fn with_sampling(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    /// Set the timeout used by [`GroqGenerator::list_models`].
    pub fn with_models_timeout(mut self, timeout: Duration) -> Self {
        self.models_timeout = timeout;
        self
    }

    /// Fetch available models, newest first.
    pub async fn fetch_models(&self) -> std::result::Result<Vec<ModelInfo>, GenerationError> {
        self.ensure_api_key()?;

        let response = tokio::time::timeout(self.models_timeout, self.client.models().list())
            .await
            .map_err(|_| GenerationError::Timeout(self.models_timeout))?
            .map_err(|e| map_openai_error(e, "", self.models_timeout))?;

        let mut models: Vec<ModelInfo> = response
            .data
            .iter()
            .map(|m| ModelInfo::from_api(&m.id, u64::from(m.created), &m.owned_by))
            .collect();
        sort_newest_first(&mut models);
        Ok(models)
    }

    /// Fetch available models, falling back to a built-in list on any failure.
    pub async fn list_models(&self) -> Vec<ModelInfo> {
        match self.fetch_models().await {
            Ok(models) if !models.is_empty() => models,
            Ok(_) => {
                warn!("Model list was empty, using fallback models");
                fallback_models()
            }
            Err(e) => {
                warn!("Failed to fetch models, using fallback models: {}", e);
                fallback_models()
            }
        }
    }

    fn ensure_api_key(&self) -> std::result::Result<(), GenerationError> {
        if self.has_api_key {
            Ok(())
        } else {
            Err(GenerationError::Authentication(
                "API key is not set".to_string(),
            ))
        }
    }

    fn build_messages(
        &self,
        request: &GenerationRequest,
    ) -> std::result::Result<Vec<ChatCompletionRequestMessage>, GenerationError> {
        let (system, user) = self.prompts.render_answer(&request.question, &request.context);

        Ok(vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system)
                .build()
                .map_err(|e| GenerationError::Other(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user)
                .build()
                .map_err(|e| GenerationError::Other(e.to_string()))?
                .into(),
        ])
    }
}

#[async_trait]
impl AnswerGenerator for GroqGenerator {
    #[instrument(
        skip(self, request),
        fields(model = %request.model_id, context_len = request.context.len())
    )]
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> std::result::Result<String, GenerationError> {
        self.ensure_api_key()?;

        let chat_request = CreateChatCompletionRequestArgs::default()
            .model(&request.model_id)
            .messages(self.build_messages(request)?)
            .temperature(self.temperature)
            .max_completion_tokens(self.max_tokens)
            .build()
            .map_err(|e| GenerationError::Other(e.to_string()))?;

        let chat = self.client.chat();
        let call = chat.create(chat_request);
        let response = tokio::time::timeout(request.timeout, call)
            .await
            .map_err(|_| GenerationError::Timeout(request.timeout))?
            .map_err(|e| map_openai_error(e, &request.model_id, request.timeout))?;

        let answer = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| GenerationError::EmptyResponse(request.model_id.clone()))?
            .clone();

        debug!("Generated answer of {} characters", answer.len());
        Ok(answer)
    }

    fn name(&self) -> &str {
        "groq"
    }
}

/// Fold a client error into the generation taxonomy.
fn map_openai_error(err: OpenAIError, model: &str, timeout: Duration) -> GenerationError {
    match err {
        OpenAIError::Reqwest(e) if e.is_timeout() => GenerationError::Timeout(timeout),
        OpenAIError::Reqwest(e) if e.is_connect() || e.is_request() => {
            GenerationError::Network(e.to_string())
        }
        OpenAIError::Reqwest(e) => GenerationError::Other(e.to_string()),
        OpenAIError::ApiError(api) => classify_api_error(&api.to_string(), &api.message, model),
        other => GenerationError::Other(other.to_string()),
    }
}

fn classify_api_error(description: &str, message: &str, model: &str) -> GenerationError {
    let lowered = description.to_lowercase();

    if lowered.contains("api key")
        || lowered.contains("api_key")
        || lowered.contains("unauthorized")
        || lowered.contains("authentication")
    {
        GenerationError::Authentication(message.to_string())
    } else if lowered.contains("rate limit")
        || lowered.contains("rate_limit")
        || lowered.contains("too many requests")
    {
        GenerationError::RateLimited(message.to_string())
    } else if lowered.contains("model")
        && (lowered.contains("does not exist")
            || lowered.contains("not found")
            || lowered.contains("model_not_found")
            || lowered.contains("decommissioned"))
    {
        GenerationError::InvalidModel {
            model: model.to_string(),
            message: message.to_string(),
        }
    } else {
        GenerationError::Other(message.to_string())
    }
}

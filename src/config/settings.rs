//! Configuration settings for VideoMind.

use crate::chunking::{
    ChunkingConfig, DEFAULT_BOUNDARY_LOOKBACK, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE,
};
use crate::generation::DEFAULT_MODEL;
use crate::index::DEFAULT_MIN_KEYWORD_LEN;
use crate::pipeline::{PipelineConfig, DEFAULT_GENERATION_TIMEOUT_SECS, DEFAULT_TOP_K};
use crate::rag::DEFAULT_FALLBACK_COUNT;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub retrieval: RetrievalSettings,
    pub generation: GenerationSettings,
    pub server: ServerSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
        }
    }
}

/// Chunking and ranking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Chunk size in characters.
    pub chunk_size: usize,
    /// Characters shared by consecutive chunks.
    pub chunk_overlap: usize,
    /// How far back the splitter looks for a sentence or word break.
    pub boundary_lookback: usize,
    /// Number of ranked chunks retrieved per question.
    pub top_k: usize,
    /// Number of leading chunks used when no chunk matches.
    pub fallback_count: usize,
    /// Query words shorter than this are ignored.
    pub min_keyword_len: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            boundary_lookback: DEFAULT_BOUNDARY_LOOKBACK,
            top_k: DEFAULT_TOP_K,
            fallback_count: DEFAULT_FALLBACK_COUNT,
            min_keyword_len: DEFAULT_MIN_KEYWORD_LEN,
        }
    }
}

/// Answer generation settings (OpenAI-compatible API).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// API base URL.
    pub api_base: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    /// Model used when none is given.
    pub default_model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum tokens in an answer.
    pub max_tokens: u32,
    /// Timeout for one answer request, in seconds.
    pub timeout_secs: u64,
    /// Timeout for fetching the model list, in seconds.
    pub models_timeout_secs: u64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.groq.com/openai/v1".to_string(),
            api_key_env: "GROQ_API_KEY".to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            temperature: 0.1,
            max_tokens: 1024,
            timeout_secs: DEFAULT_GENERATION_TIMEOUT_SECS,
            models_timeout_secs: 10,
        }
    }
}

impl GenerationSettings {
    /// Read the API key from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn models_timeout(&self) -> Duration {
        Duration::from_secs(self.models_timeout_secs)
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Maximum number of open sessions.
    pub max_sessions: usize,
    /// Seconds without a request after which a session is dropped.
    pub session_idle_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            max_sessions: 100,
            session_idle_secs: 3600,
        }
    }
}

impl ServerSettings {
    pub fn session_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.session_idle_secs)
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::VideomindError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("videomind")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Per-instance pipeline parameters derived from these settings.
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            chunking: ChunkingConfig {
                chunk_size: self.retrieval.chunk_size,
                chunk_overlap: self.retrieval.chunk_overlap,
                boundary_lookback: self.retrieval.boundary_lookback,
            },
            top_k: self.retrieval.top_k,
            fallback_count: self.retrieval.fallback_count,
            min_keyword_len: self.retrieval.min_keyword_len,
            generation_timeout: self.generation.timeout(),
        }
    }
}

//! Configuration module for VideoMind.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AnswerPrompts, Prompts};
pub use settings::{
    GeneralSettings, GenerationSettings, PromptSettings, RetrievalSettings, ServerSettings,
    Settings,
};

//! CLI command implementations.

mod ask;
mod chat;
mod config;
mod models;
mod search;
mod serve;

pub use ask::run_ask;
pub use chat::run_chat;
pub use config::run_config;
pub use models::run_models;
pub use search::run_search;
pub use serve::run_serve;

use crate::cli::Output;
use crate::config::{Prompts, Settings};
use crate::generation::{AnswerGenerator, GroqGenerator};
use crate::pipeline::RetrievalPipeline;
use anyhow::{Context, Result};
use std::io::Read;
use std::sync::Arc;

/// Read a transcript from a file, or from stdin when `path` is `-`.
pub(crate) fn read_transcript(path: &str) -> Result<String> {
    if path == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read transcript from stdin")?;
        return Ok(text);
    }

    let expanded = Settings::expand_path(path);
    std::fs::read_to_string(&expanded)
        .with_context(|| format!("Failed to read transcript {}", expanded.display()))
}

/// Build the Groq generator with the configured prompts.
pub(crate) fn build_generator(settings: &Settings) -> Result<GroqGenerator> {
    let prompts = Prompts::load(
        settings.prompts.custom_dir.as_deref(),
        Some(&settings.prompts.variables),
    )?;
    Ok(GroqGenerator::from_settings(&settings.generation)?.with_prompts(prompts))
}

/// Create a pipeline and load the transcript at `path` into it.
pub(crate) fn load_pipeline(
    path: &str,
    settings: &Settings,
    generator: Arc<dyn AnswerGenerator>,
) -> Result<RetrievalPipeline> {
    let pipeline = RetrievalPipeline::with_config(settings.pipeline_config(), generator);
    let transcript = read_transcript(path)?;

    let summary = pipeline.initialize(&transcript)?;
    Output::info(&format!(
        "Loaded transcript: {} characters in {} chunks",
        summary.character_count, summary.chunk_count
    ));

    Ok(pipeline)
}

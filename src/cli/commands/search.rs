//! Search command implementation.

use super::load_pipeline;
use crate::cli::Output;
use crate::config::Settings;
use crate::generation::GroqGenerator;
use anyhow::Result;
use std::sync::Arc;

/// Run the search command.
///
/// Retrieval only: the generator is never called, so no API key is needed.
pub fn run_search(
    query: &str,
    transcript: &str,
    limit: Option<usize>,
    mut settings: Settings,
) -> Result<()> {
    if let Some(limit) = limit {
        settings.retrieval.top_k = limit;
    }

    let generator = Arc::new(GroqGenerator::from_settings(&settings.generation)?);
    let pipeline = load_pipeline(transcript, &settings, generator)?;

    match pipeline.search(query) {
        Ok(results) => {
            let matched: Vec<_> = results.into_iter().filter(|r| r.score > 0).collect();
            if matched.is_empty() {
                Output::warning("No passages matched your query.");
            } else {
                Output::success(&format!("Found {} matching passages", matched.len()));

                for result in &matched {
                    Output::search_result(result.ordinal(), result.score, result.text());
                }
            }
        }
        Err(e) => {
            Output::error(&format!("Search failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}

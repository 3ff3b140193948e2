//! Ask command implementation.

use super::{build_generator, load_pipeline};
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;
use std::sync::Arc;

/// Run the ask command.
pub async fn run_ask(
    question: &str,
    transcript: &str,
    model: Option<String>,
    settings: Settings,
) -> Result<()> {
    // Pre-flight checks
    if let Err(e) = preflight::check(Operation::Ask, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let model = model.unwrap_or_else(|| settings.generation.default_model.clone());
    let generator = Arc::new(build_generator(&settings)?);
    let pipeline = load_pipeline(transcript, &settings, generator)?;

    let spinner = Output::spinner(&format!("Asking {}...", model));

    match pipeline.query(question, &model).await {
        Ok(answer) => {
            spinner.finish_and_clear();
            println!("\n{}\n", answer);
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to generate answer: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}

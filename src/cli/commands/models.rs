//! Models command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::generation::GroqGenerator;
use anyhow::Result;

/// Run the models command.
pub async fn run_models(settings: Settings) -> Result<()> {
    let generator = GroqGenerator::from_settings(&settings.generation)?;

    let spinner = Output::spinner("Fetching models...");
    let models = generator.list_models().await;
    spinner.finish_and_clear();

    Output::header("Available models");
    for model in &models {
        Output::model_entry(&model.id, &model.name, model.owned_by.as_deref());
    }

    println!();
    Output::kv("Default", &settings.generation.default_model);

    Ok(())
}

//! Config command implementation.

use crate::cli::{ConfigAction, Output};
use crate::config::Settings;
use crate::error::{Result, VideomindError};
use std::path::{Path, PathBuf};

/// Run the config command against `config_path` (or the default location).
pub fn run_config(
    action: &ConfigAction,
    config_path: Option<&str>,
    settings: Settings,
) -> anyhow::Result<()> {
    let path = config_path
        .map(Settings::expand_path)
        .unwrap_or_else(Settings::default_config_path);

    match action {
        ConfigAction::Show => {
            let toml_str = toml::to_string_pretty(&settings)
                .map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))?;
            println!("{}", toml_str);

            let key_state = match settings.generation.api_key() {
                Some(_) => "set",
                None => "not set",
            };
            Output::kv(&settings.generation.api_key_env, key_state);
        }

        ConfigAction::Edit => {
            if !path.exists() {
                settings.save_to(&path)?;
                Output::info(&format!("Created default config at {}", path.display()));
            }

            let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vim".to_string());
            Output::info(&format!("Opening config in {}...", editor));

            match std::process::Command::new(&editor).arg(&path).status() {
                Ok(s) if s.success() => report_check(&path),
                Ok(_) => Output::warning("Editor exited with non-zero status."),
                Err(e) => {
                    Output::error(&format!("Failed to open editor: {}", e));
                    Output::info(&format!("Config file is at: {}", path.display()));
                }
            }
        }

        ConfigAction::Path => {
            println!("{}", path.display());
            if !path.exists() {
                Output::info("File does not exist yet; defaults are in use.");
            }
        }
    }

    Ok(())
}

/// Reload `path` and check that a pipeline could be built from it.
pub(crate) fn check_config(path: &Path) -> Result<Settings> {
    let settings = Settings::load_from(Some(&PathBuf::from(path)))?;
    let pipeline = settings.pipeline_config();

    pipeline.chunking.validate()?;
    if pipeline.generation_timeout.is_zero() {
        return Err(VideomindError::Config(
            "generation.timeout_secs must be greater than zero".to_string(),
        ));
    }
    if settings.generation.default_model.trim().is_empty() {
        return Err(VideomindError::Config(
            "generation.default_model must not be empty".to_string(),
        ));
    }

    Ok(settings)
}

fn report_check(path: &Path) {
    match check_config(path) {
        Ok(settings) => Output::success(&format!(
            "Config saved: chunks of {} characters with {} overlap, top {} passages, model {}.",
            settings.retrieval.chunk_size,
            settings.retrieval.chunk_overlap,
            settings.retrieval.top_k,
            settings.generation.default_model
        )),
        Err(e) => Output::error(&format!("Config saved but is not usable: {}", e)),
    }
}

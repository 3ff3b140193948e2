//! Pre-flight checks before expensive operations.
//!
//! Validates that required configuration is available before loading a
//! transcript for an operation that would otherwise fail at the first query.

use crate::config::Settings;
use crate::error::{Result, VideomindError};

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Asking a single question requires an API key.
    Ask,
    /// Chat requires an API key.
    Chat,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Ask | Operation::Chat => {
            check_api_key(&settings.generation.api_key_env)?;
        }
    }
    Ok(())
}

/// Check that the API key variable is set and non-empty.
fn check_api_key(var: &str) -> Result<()> {
    match std::env::var(var) {
        Ok(key) if !key.trim().is_empty() => Ok(()),
        Ok(_) => Err(VideomindError::Config(format!(
            "{var} is empty. Set it with: export {var}='gsk_...'"
        ))),
        Err(_) => Err(VideomindError::Config(format!(
            "{var} not set. Set it with: export {var}='gsk_...'"
        ))),
    }
}

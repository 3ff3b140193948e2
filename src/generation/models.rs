//! Model catalog helpers.

use serde::{Deserialize, Serialize};

/// A generation model offered by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model identifier passed to the API.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Creation time (Unix seconds), when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<u64>,
    /// Owning organization, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owned_by: Option<String>,
}

impl ModelInfo {
    /// Build from an API model entry, deriving the display name.
    pub fn from_api(id: &str, created: u64, owned_by: &str) -> Self {
        Self {
            id: id.to_string(),
            name: format_model_name(id),
            created: Some(created),
            owned_by: Some(owned_by.to_string()),
        }
    }

    fn fallback(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            created: None,
            owned_by: None,
        }
    }
}

/// Models offered when the API cannot be reached.
pub fn fallback_models() -> Vec<ModelInfo> {
    vec![
        ModelInfo::fallback("llama3-8b-8192", "Llama 3 8B (Default)"),
        ModelInfo::fallback("llama3-70b-8192", "Llama 3 70B"),
        ModelInfo::fallback("mixtral-8x7b-32768", "Mixtral 8x7B"),
        ModelInfo::fallback("gemma-7b-it", "Gemma 7B IT"),
    ]
}

/// Turn a model id into a readable name.
pub fn format_model_name(model_id: &str) -> String {
    if model_id.contains("llama3-8b") {
        return "Llama 3 8B".to_string();
    }
    if model_id.contains("llama3-70b") {
        return "Llama 3 70B".to_string();
    }
    if model_id.contains("mixtral-8x7b") {
        return "Mixtral 8x7B".to_string();
    }
    if model_id.contains("gemma-7b") {
        return "Gemma 7B IT".to_string();
    }

    model_id
        .split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Sort models newest first; entries without a creation time go last.
pub(crate) fn sort_newest_first(models: &mut [ModelInfo]) {
    models.sort_by(|a, b| b.created.cmp(&a.created));
}

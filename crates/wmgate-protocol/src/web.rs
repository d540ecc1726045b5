use serde::{Deserialize, Serialize};

/// Body of `/gemini`, `/gemini-chat` and `/translate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebPromptRequest {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Local paths of files to attach.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<String>>,
}

impl WebPromptRequest {
    pub fn validate(&self, known_models: &[&str]) -> Vec<String> {
        let mut issues = Vec::new();
        if self.message.is_empty() {
            issues.push("message must contain at least 1 character".to_string());
        }
        if let Some(model) = &self.model
            && !known_models.contains(&model.as_str())
        {
            issues.push(format!(
                "model must be one of {}, got '{model}'",
                known_models.join(", ")
            ));
        }
        issues
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebPromptResponse {
    pub response: String,
}

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::errors::ProviderResult;

/// Opaque state a backend needs on the next turn of the same conversation:
/// `[conversation id, response id, candidate id]`, all absent before the
/// first turn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContinuationMetadata {
    pub conversation_id: Option<String>,
    pub response_id: Option<String>,
    pub candidate_id: Option<String>,
}

impl ContinuationMetadata {
    /// State after a successful turn. Empty strings are treated as absent.
    pub fn after_turn(output: &ProviderOutput) -> Self {
        let pick = |value: Option<&String>| value.filter(|v| !v.is_empty()).cloned();
        Self {
            conversation_id: pick(output.metadata.first()),
            response_id: pick(output.metadata.get(1)),
            candidate_id: pick(output.candidate_id.as_ref()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &ContinuationMetadata::default()
    }

    /// Positional JSON form threaded into the next request.
    pub fn to_json(&self) -> Value {
        let entry = |value: &Option<String>| match value {
            Some(value) => Value::String(value.clone()),
            None => Value::Null,
        };
        Value::Array(vec![
            entry(&self.conversation_id),
            entry(&self.response_id),
            entry(&self.candidate_id),
        ])
    }
}

/// Result of one generation call, independent of backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderOutput {
    pub text: String,
    /// Backend continuation entries in wire order (may be empty).
    pub metadata: Vec<String>,
    pub candidate_id: Option<String>,
}

impl ProviderOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

/// One logical conversation on a backend. Turns must be awaited in order,
/// which `&mut self` enforces.
#[async_trait]
pub trait ChatSession: Send {
    fn model(&self) -> &str;

    async fn send_message(&mut self, prompt: &str, files: &[String])
    -> ProviderResult<ProviderOutput>;
}

#[async_trait]
pub trait WebModelProvider: Send + Sync {
    fn id(&self) -> &str;

    fn label(&self) -> &str;

    fn is_enabled(&self) -> bool;

    fn last_error(&self) -> Option<String>;

    /// Probes the backend; failures are recorded for [`Self::last_error`].
    async fn initialize(&self) -> bool;

    async fn generate_content(
        &self,
        prompt: &str,
        model: &str,
        files: &[String],
        metadata: Option<&ContinuationMetadata>,
    ) -> ProviderResult<ProviderOutput>;

    fn start_chat(&self, model: &str) -> ProviderResult<Box<dyn ChatSession>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_advances_from_output() {
        let output = ProviderOutput {
            text: "hi".to_string(),
            metadata: vec!["c_1".to_string(), String::new(), "extra".to_string()],
            candidate_id: Some("rc_9".to_string()),
        };
        let next = ContinuationMetadata::after_turn(&output);
        assert_eq!(next.conversation_id.as_deref(), Some("c_1"));
        assert_eq!(next.response_id, None);
        assert_eq!(next.candidate_id.as_deref(), Some("rc_9"));
        assert_eq!(next.to_json(), serde_json::json!(["c_1", null, "rc_9"]));
    }

    #[test]
    fn initial_metadata_is_three_nulls() {
        let metadata = ContinuationMetadata::default();
        assert!(metadata.is_empty());
        assert_eq!(metadata.to_json(), serde_json::json!([null, null, null]));
    }
}

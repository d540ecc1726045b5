use serde::{Deserialize, Serialize};

use crate::openai::types::AssistantRole;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResponseObjectType {
    #[serde(rename = "response")]
    Response,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputMessageType {
    #[serde(rename = "message")]
    Message,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputTextType {
    #[serde(rename = "output_text")]
    OutputText,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseObject {
    pub id: String,
    pub object: ResponseObjectType,
    pub created_at: i64,
    pub status: ResponseStatus,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Vec<OutputMessage>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputMessage {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: OutputMessageType,
    pub role: AssistantRole,
    pub content: Vec<OutputContent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputContent {
    #[serde(rename = "type")]
    pub kind: OutputTextType,
    pub text: String,
}

impl ResponseObject {
    /// Header object announced before any output exists.
    pub fn in_progress(id: &str, created_at: i64, model: &str) -> Self {
        Self {
            id: id.to_string(),
            object: ResponseObjectType::Response,
            created_at,
            status: ResponseStatus::InProgress,
            model: model.to_string(),
            output: None,
            output_text: None,
        }
    }

    pub fn completed(id: &str, created_at: i64, model: &str, message_id: &str, text: String) -> Self {
        Self {
            id: id.to_string(),
            object: ResponseObjectType::Response,
            created_at,
            status: ResponseStatus::Completed,
            model: model.to_string(),
            output: Some(vec![OutputMessage {
                id: message_id.to_string(),
                kind: OutputMessageType::Message,
                role: AssistantRole::Assistant,
                content: vec![OutputContent {
                    kind: OutputTextType::OutputText,
                    text: text.clone(),
                }],
            }]),
            output_text: Some(text),
        }
    }
}

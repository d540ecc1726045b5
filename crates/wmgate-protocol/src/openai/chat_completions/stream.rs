use serde::{Deserialize, Serialize};

use crate::openai::types::FinishReason;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChatCompletionChunkObjectType {
    #[serde(rename = "chat.completion.chunk")]
    ChatCompletionChunk,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatCompletionChunk {
    pub id: String,
    pub object: ChatCompletionChunkObjectType,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkChoice {
    pub index: u32,
    pub delta: ChunkDelta,
    /// Serialized as `null` on every chunk but the last.
    pub finish_reason: Option<FinishReason>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl ChatCompletionChunk {
    pub fn delta(id: &str, created: i64, model: &str, content: String) -> Self {
        Self::with_choice(id, created, model, ChunkDelta { content: Some(content) }, None)
    }

    pub fn finish(id: &str, created: i64, model: &str) -> Self {
        Self::with_choice(
            id,
            created,
            model,
            ChunkDelta::default(),
            Some(FinishReason::Stop),
        )
    }

    fn with_choice(
        id: &str,
        created: i64,
        model: &str,
        delta: ChunkDelta,
        finish_reason: Option<FinishReason>,
    ) -> Self {
        Self {
            id: id.to_string(),
            object: ChatCompletionChunkObjectType::ChatCompletionChunk,
            created,
            model: model.to_string(),
            choices: vec![ChunkChoice {
                index: 0,
                delta,
                finish_reason,
            }],
        }
    }
}

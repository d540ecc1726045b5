pub mod request;
pub mod response;
pub mod stream;

pub use request::{ChatCompletionRequest, ChatMessage, KNOWN_ROLES};
pub use response::{AssistantMessage, ChatChoice, ChatCompletion, ChatCompletionObjectType, ChatUsage};
pub use stream::{ChatCompletionChunk, ChatCompletionChunkObjectType, ChunkChoice, ChunkDelta};

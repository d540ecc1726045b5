use serde::Serialize;
use wmgate_provider_core::ProviderError;

/// Slice width used when replaying a finished answer as a stream.
pub const CHUNK_CHARS: usize = 48;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl Usage {
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub text: String,
    pub usage: Usage,
}

/// Frames produced by a streaming generation, in order. `Finish` and `Error`
/// are terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamPart {
    Delta(String),
    Finish(Usage),
    Error(ProviderError),
}

/// Splits `text` into consecutive slices of at most `size` characters.
/// Empty text yields a single empty slice.
pub fn chunk_text(text: &str, size: usize) -> Vec<String> {
    let size = size.max(1);
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return vec![String::new()];
    }
    chars
        .chunks(size)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

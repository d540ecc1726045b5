//! Decoder for the positional, undocumented generate response.
//!
//! The body arrives as framing markers interleaved with JSON lines. The first
//! JSON array line is an envelope whose entries may carry the real body as a
//! JSON-encoded string. Every position used below lives in [`layout`].

use serde_json::Value;
use wmgate_provider_core::{ProviderError, ProviderOutput};

/// Positions inside the response. Protocol drift is fixed here.
pub(crate) mod layout {
    /// `envelope[i][2]`: JSON-encoded body string.
    pub const ENVELOPE_BODY: &[usize] = &[2];
    pub const BODY_METADATA: &[usize] = &[1];
    pub const BODY_CANDIDATES: &[usize] = &[4];
    pub const CANDIDATE_ID: &[usize] = &[0];
    pub const CANDIDATE_TEXT: &[usize] = &[1, 0];
    /// Replacement text when the primary text is a card placeholder URL.
    pub const CANDIDATE_CARD_TEXT: &[usize] = &[22, 0];
    pub const CANDIDATE_THOUGHTS: &[usize] = &[37, 0, 0];
    /// Deepest nesting visited by the fallback body search.
    pub const MAX_SEARCH_DEPTH: usize = 7;
    pub const CARD_CONTENT_PREFIX: &str = "http://googleusercontent.com/card_content/";
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("no JSON array line in response")]
    PayloadParseFailed,
    #[error("no body with candidates in response")]
    ResponseBodyNotFound,
    #[error("response body holds no candidates")]
    NoCandidates,
}

impl From<DecodeError> for ProviderError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::PayloadParseFailed => ProviderError::PayloadParseFailed,
            DecodeError::ResponseBodyNotFound => ProviderError::ResponseBodyNotFound,
            DecodeError::NoCandidates => ProviderError::NoCandidates,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub id: String,
    pub text: String,
    pub thoughts: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelOutput {
    pub metadata: Vec<String>,
    pub candidates: Vec<Candidate>,
    pub chosen: usize,
    pub text: String,
    pub candidate_id: String,
}

impl From<ModelOutput> for ProviderOutput {
    fn from(output: ModelOutput) -> Self {
        ProviderOutput {
            text: output.text,
            metadata: output.metadata,
            candidate_id: Some(output.candidate_id),
        }
    }
}

/// Bounds-checked positional lookup. Any miss, or a final `null`, is `None`.
pub(crate) fn nested<'a>(value: &'a Value, path: &[usize]) -> Option<&'a Value> {
    let mut cursor = value;
    for &index in path {
        cursor = cursor.as_array()?.get(index)?;
    }
    (!cursor.is_null()).then_some(cursor)
}

/// Scalar text at `path`; anything else reads as empty.
fn nested_text(value: &Value, path: &[usize]) -> String {
    match nested(value, path) {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(number)) => number.to_string(),
        Some(Value::Bool(flag)) => flag.to_string(),
        _ => String::new(),
    }
}

/// First line of `raw` that parses as a JSON array.
pub(crate) fn extract_envelope(raw: &str) -> Result<Vec<Value>, DecodeError> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .find_map(|line| match serde_json::from_str::<Value>(line) {
            Ok(Value::Array(items)) => Some(items),
            _ => None,
        })
        .ok_or(DecodeError::PayloadParseFailed)
}

/// A non-empty array where at least one item has a non-empty id and text.
fn is_candidate_list(value: Option<&Value>) -> bool {
    let Some(items) = value.and_then(Value::as_array) else {
        return false;
    };
    items.iter().any(|item| {
        item.is_array()
            && !nested_text(item, layout::CANDIDATE_ID).is_empty()
            && !nested_text(item, layout::CANDIDATE_TEXT).is_empty()
    })
}

fn direct_body(envelope: &[Value]) -> Option<Value> {
    envelope.iter().find_map(|part| {
        let raw = nested(part, layout::ENVELOPE_BODY)?.as_str()?;
        let body: Value = serde_json::from_str(raw).ok()?;
        is_candidate_list(nested(&body, layout::BODY_CANDIDATES)).then_some(body)
    })
}

fn search_body(node: &Value, depth: usize) -> Option<&Value> {
    if depth > layout::MAX_SEARCH_DEPTH {
        return None;
    }
    let children = node.as_array()?;
    if is_candidate_list(nested(node, layout::BODY_CANDIDATES)) {
        return Some(node);
    }
    children
        .iter()
        .find_map(|child| search_body(child, depth + 1))
}

fn decode_candidate(item: &Value) -> Option<Candidate> {
    if !item.is_array() {
        return None;
    }
    let id = nested_text(item, layout::CANDIDATE_ID);
    if id.is_empty() {
        return None;
    }
    let mut text = nested_text(item, layout::CANDIDATE_TEXT);
    if is_card_placeholder(&text) {
        let card = nested_text(item, layout::CANDIDATE_CARD_TEXT);
        if !card.is_empty() {
            text = card;
        }
    }
    let thoughts = Some(nested_text(item, layout::CANDIDATE_THOUGHTS)).filter(|t| !t.is_empty());
    Some(Candidate { id, text, thoughts })
}

fn is_card_placeholder(text: &str) -> bool {
    text.strip_prefix(layout::CARD_CONTENT_PREFIX)
        .and_then(|rest| rest.chars().next())
        .is_some_and(|first| first.is_ascii_digit())
}

/// Decodes a raw generate response into candidates and continuation
/// metadata. The first candidate is chosen.
pub fn decode_candidates(raw: &str) -> Result<ModelOutput, DecodeError> {
    let envelope = extract_envelope(raw)?;
    let body = match direct_body(&envelope) {
        Some(body) => body,
        None => {
            let root = Value::Array(envelope);
            search_body(&root, 0)
                .cloned()
                .ok_or(DecodeError::ResponseBodyNotFound)?
        }
    };

    let candidates: Vec<Candidate> = nested(&body, layout::BODY_CANDIDATES)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(decode_candidate).collect())
        .unwrap_or_default();
    let Some(chosen_candidate) = candidates.first().cloned() else {
        return Err(DecodeError::NoCandidates);
    };

    let metadata = nested(&body, layout::BODY_METADATA)
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .map(|entry| entry.as_str().unwrap_or_default().to_string())
                .collect()
        })
        .unwrap_or_default();

    Ok(ModelOutput {
        metadata,
        candidates,
        chosen: 0,
        text: chosen_candidate.text,
        candidate_id: chosen_candidate.id,
    })
}

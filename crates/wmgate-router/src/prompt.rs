//! Flattening of role-tagged message lists into one prompt string.

use serde_json::Value;
use wmgate_protocol::openai::chat_completions::ChatMessage;
use wmgate_protocol::openai::responses::{ResponsesInput, ResponsesRequest};
use wmgate_protocol::openai::types::MessageContent;

const MESSAGE_SEPARATOR: &str = "\n\n";

/// Plain text of a message body. Parts contribute their non-empty `text`,
/// one per line.
pub fn content_text(content: &MessageContent) -> String {
    match content {
        MessageContent::Text(text) => text.clone(),
        MessageContent::Parts(parts) => join_part_texts(
            parts
                .iter()
                .filter_map(|part| part.text.as_deref()),
        ),
    }
}

fn join_part_texts<'a>(texts: impl Iterator<Item = &'a str>) -> String {
    texts
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Unknown roles are treated as the user.
pub fn prompt_line(role: &str, text: &str) -> String {
    let prefix = match role {
        "system" => "System",
        "developer" => "Developer",
        "assistant" => "Assistant",
        "tool" => "Tool",
        _ => "User",
    };
    format!("{prefix}: {text}")
}

pub fn chat_prompt(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .map(|message| prompt_line(&message.role, &content_text(&message.content)))
        .collect::<Vec<_>>()
        .join(MESSAGE_SEPARATOR)
}

/// Text carried by a free-form `input`: bare strings verbatim, objects by
/// their `content`. Trimmed.
pub fn input_text(input: &ResponsesInput) -> String {
    match input {
        ResponsesInput::Text(text) => text.trim().to_string(),
        ResponsesInput::Items(items) => {
            let texts: Vec<String> = items
                .iter()
                .filter_map(|item| match item {
                    Value::String(text) => Some(text.clone()),
                    Value::Object(fields) => {
                        Some(value_content_text(fields.get("content")?)).filter(|t| !t.is_empty())
                    }
                    _ => None,
                })
                .collect();
            texts.join(MESSAGE_SEPARATOR).trim().to_string()
        }
    }
}

fn value_content_text(content: &Value) -> String {
    match content {
        Value::String(text) => text.clone(),
        Value::Array(parts) => join_part_texts(
            parts
                .iter()
                .filter_map(|part| part.get("text").and_then(Value::as_str)),
        ),
        _ => String::new(),
    }
}

/// `messages` win over `input` whenever they are non-empty. An empty result
/// means the request carried no usable prompt.
pub fn responses_prompt(request: &ResponsesRequest) -> String {
    match request.messages.as_deref() {
        Some(messages) if !messages.is_empty() => messages
            .iter()
            .map(|message| {
                let text = message.content.as_ref().map(content_text).unwrap_or_default();
                prompt_line(message.role.as_deref().unwrap_or("user"), &text)
            })
            .collect::<Vec<_>>()
            .join(MESSAGE_SEPARATOR),
        _ => request.input.as_ref().map(input_text).unwrap_or_default(),
    }
}

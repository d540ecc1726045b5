use serde::{Deserialize, Serialize};

use crate::openai::types::MessageContent;

/// Roles accepted in a chat-completions message list.
pub const KNOWN_ROLES: [&str; 5] = ["system", "developer", "user", "assistant", "tool"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: MessageContent,
}

impl ChatCompletionRequest {
    /// Semantic checks serde cannot express. Each issue is one message.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.messages.is_empty() {
            issues.push("messages must contain at least 1 item".to_string());
        }
        for (index, message) in self.messages.iter().enumerate() {
            if !KNOWN_ROLES.contains(&message.role.as_str()) {
                issues.push(format!(
                    "messages[{index}].role must be one of {}, got '{}'",
                    KNOWN_ROLES.join(", "),
                    message.role
                ));
            }
            if let MessageContent::Text(text) = &message.content
                && text.is_empty()
            {
                issues.push(format!(
                    "messages[{index}].content must contain at least 1 character"
                ));
            }
        }
        issues
    }

    pub fn is_stream(&self) -> bool {
        self.stream.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openai::types::ContentPart;

    #[test]
    fn accepts_string_and_part_content() {
        let request: ChatCompletionRequest = serde_json::from_str(
            r#"{"messages":[{"role":"user","content":"hi"},{"role":"user","content":[{"type":"text","text":"a"}]}]}"#,
        )
        .unwrap();
        assert!(request.validate().is_empty());
        assert_eq!(
            request.messages[1].content,
            MessageContent::Parts(vec![ContentPart::text("a")])
        );
    }

    #[test]
    fn validation_aggregates_issues() {
        let request = ChatCompletionRequest {
            model: None,
            stream: None,
            messages: vec![ChatMessage {
                role: "robot".to_string(),
                content: MessageContent::Text(String::new()),
            }],
        };
        let issues = request.validate();
        assert_eq!(issues.len(), 2);
        assert!(issues[0].contains("role"));
        assert!(issues[1].contains("content"));
    }

    #[test]
    fn empty_message_list_is_rejected() {
        let request: ChatCompletionRequest = serde_json::from_str(r#"{"messages":[]}"#).unwrap();
        assert_eq!(request.validate(), vec!["messages must contain at least 1 item"]);
    }
}

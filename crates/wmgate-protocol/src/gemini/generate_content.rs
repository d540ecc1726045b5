use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    #[serde(default)]
    pub contents: Vec<Content>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Only text parts are understood; other part kinds read as empty text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default)]
    pub text: String,
}

impl GenerateContentRequest {
    /// All text parts, in order, concatenated without separators.
    pub fn prompt_text(&self) -> String {
        self.contents
            .iter()
            .flat_map(|content| content.parts.iter())
            .map(|part| part.text.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinishReason {
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HarmCategory {
    #[serde(rename = "HARM_CATEGORY_SEXUALLY_EXPLICIT")]
    SexuallyExplicit,
    #[serde(rename = "HARM_CATEGORY_HATE_SPEECH")]
    HateSpeech,
    #[serde(rename = "HARM_CATEGORY_HARASSMENT")]
    Harassment,
    #[serde(rename = "HARM_CATEGORY_DANGEROUS_CONTENT")]
    DangerousContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HarmProbability {
    Negligible,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyRating {
    pub category: HarmCategory,
    pub probability: HarmProbability,
}

impl SafetyRating {
    /// Static ratings reported for every answer; the web backend exposes none.
    pub fn all_negligible() -> Vec<SafetyRating> {
        [
            HarmCategory::SexuallyExplicit,
            HarmCategory::HateSpeech,
            HarmCategory::Harassment,
            HarmCategory::DangerousContent,
        ]
        .into_iter()
        .map(|category| SafetyRating {
            category,
            probability: HarmProbability::Negligible,
        })
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Content,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
    pub index: u32,
    pub safety_ratings: Vec<SafetyRating>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    pub safety_ratings: Vec<SafetyRating>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    pub candidates: Vec<Candidate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_feedback: Option<PromptFeedback>,
}

impl GenerateContentResponse {
    /// Complete answer: one model candidate plus prompt feedback.
    pub fn from_text(text: String) -> Self {
        Self {
            candidates: vec![Self::candidate(text, Some(FinishReason::Stop))],
            prompt_feedback: Some(PromptFeedback {
                safety_ratings: SafetyRating::all_negligible(),
            }),
        }
    }

    /// Streaming frame; only the final frame carries a finish reason.
    pub fn chunk(text: String, finish_reason: Option<FinishReason>) -> Self {
        Self {
            candidates: vec![Self::candidate(text, finish_reason)],
            prompt_feedback: None,
        }
    }

    fn candidate(text: String, finish_reason: Option<FinishReason>) -> Candidate {
        Candidate {
            content: Content {
                parts: vec![Part { text }],
                role: Some("model".to_string()),
            },
            finish_reason,
            index: 0,
            safety_ratings: SafetyRating::all_negligible(),
        }
    }

    pub fn text(&self) -> Option<&str> {
        self.candidates
            .first()
            .and_then(|candidate| candidate.content.parts.first())
            .map(|part| part.text.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_joins_parts_without_separator() {
        let request: GenerateContentRequest = serde_json::from_str(
            r#"{"contents":[{"parts":[{"text":"a"},{"inlineData":{}}]},{"role":"user","parts":[{"text":"b"}]}]}"#,
        )
        .unwrap();
        assert_eq!(request.prompt_text(), "ab");
    }

    #[test]
    fn missing_contents_default_to_empty() {
        let request: GenerateContentRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request.prompt_text(), "");
    }

    #[test]
    fn response_shape_matches_generate_content() {
        let value = serde_json::to_value(GenerateContentResponse::from_text("hi".into())).unwrap();
        let candidate = &value["candidates"][0];
        assert_eq!(candidate["content"]["parts"][0]["text"], "hi");
        assert_eq!(candidate["content"]["role"], "model");
        assert_eq!(candidate["finishReason"], "STOP");
        assert_eq!(candidate["index"], 0);
        assert_eq!(candidate["safetyRatings"].as_array().unwrap().len(), 4);
        assert_eq!(
            candidate["safetyRatings"][0]["category"],
            "HARM_CATEGORY_SEXUALLY_EXPLICIT"
        );
        assert_eq!(
            value["promptFeedback"]["safetyRatings"][3]["probability"],
            "NEGLIGIBLE"
        );
    }
}

use serde::{Deserialize, Serialize};

use crate::openai::responses::response::ResponseObject;

/// Named events of the responses streaming dialect. The SSE `event:` line
/// repeats the `type` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ResponseStreamEvent {
    #[serde(rename = "response.created")]
    Created { response: ResponseObject },
    #[serde(rename = "response.output_text.delta")]
    OutputTextDelta {
        response_id: String,
        output_index: u32,
        content_index: u32,
        delta: String,
    },
    #[serde(rename = "response.completed")]
    Completed { response: ResponseObject },
}

impl ResponseStreamEvent {
    pub fn event_name(&self) -> &'static str {
        match self {
            ResponseStreamEvent::Created { .. } => "response.created",
            ResponseStreamEvent::OutputTextDelta { .. } => "response.output_text.delta",
            ResponseStreamEvent::Completed { .. } => "response.completed",
        }
    }

    pub fn text_delta(response_id: &str, delta: String) -> Self {
        ResponseStreamEvent::OutputTextDelta {
            response_id: response_id.to_string(),
            output_index: 0,
            content_index: 0,
            delta,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_tag_matches_event_name() {
        let event = ResponseStreamEvent::text_delta("resp-1", "abc".to_string());
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], event.event_name());
        assert_eq!(value["response_id"], "resp-1");
        assert_eq!(value["output_index"], 0);
        assert_eq!(value["content_index"], 0);
        assert_eq!(value["delta"], "abc");
    }
}

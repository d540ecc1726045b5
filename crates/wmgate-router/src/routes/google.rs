use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use wmgate_core::{GatewayContext, Usage};
use wmgate_protocol::gemini::{FinishReason, GenerateContentRequest, GenerateContentResponse};
use wmgate_protocol::sse::SseEvent;

use crate::error::GatewayError;
use crate::extract::parse_json;
use crate::sse::{FrameEncoder, Frames, stream_response};

const STREAM_ACTION: &str = "streamGenerateContent";

/// `gemini-2.5-pro:generateContent` -> (`gemini-2.5-pro`, Some(`generateContent`)).
fn split_model_action(name: &str) -> (&str, Option<&str>) {
    let name = name.trim().trim_start_matches('/');
    match name.split_once(':') {
        Some((model, action)) => (model.trim(), Some(action.trim())),
        None => (name, None),
    }
}

pub(crate) async fn generate_content(
    State(context): State<Arc<GatewayContext>>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Response, GatewayError> {
    let request: GenerateContentRequest = parse_json(&body)?;
    let (model_id, action) = split_model_action(&name);
    let model_id = if model_id.is_empty() {
        context.default_model()
    } else {
        model_id.to_string()
    };
    let model = context.resolve_model(Some(model_id.as_str()));
    let prompt = request.prompt_text();

    if action == Some(STREAM_ACTION) {
        return stream_response(model.stream(&prompt), GoogleFrames::default()).await;
    }

    let generation = model.generate(&prompt).await?;
    let payload = GenerateContentResponse::from_text(generation.text);
    Ok((StatusCode::OK, Json(payload)).into_response())
}

/// Holds one delta back so the final frame can carry the finish reason.
#[derive(Default)]
struct GoogleFrames {
    pending: Option<String>,
}

impl FrameEncoder for GoogleFrames {
    fn delta(&mut self, text: String) -> Frames {
        match self.pending.replace(text) {
            Some(previous) => Ok(vec![SseEvent::json(&GenerateContentResponse::chunk(
                previous, None,
            ))?]),
            None => Ok(Vec::new()),
        }
    }

    fn finish(&mut self, _usage: Usage) -> Frames {
        let last = self.pending.take().unwrap_or_default();
        Ok(vec![SseEvent::json(&GenerateContentResponse::chunk(
            last,
            Some(FinishReason::Stop),
        ))?])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_and_action_are_split() {
        assert_eq!(
            split_model_action("gemini-2.5-pro:generateContent"),
            ("gemini-2.5-pro", Some("generateContent"))
        );
        assert_eq!(split_model_action("gemini-2.5-pro"), ("gemini-2.5-pro", None));
        assert_eq!(
            split_model_action(":streamGenerateContent"),
            ("", Some("streamGenerateContent"))
        );
    }

    #[test]
    fn last_frame_carries_stop() {
        let mut frames = GoogleFrames::default();
        assert!(frames.delta("a".into()).unwrap().is_empty());
        let first = frames.delta("b".into()).unwrap();
        assert_eq!(first.len(), 1);
        assert!(!first[0].data.contains("finishReason"));
        let last = frames.finish(Usage::default()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&last[0].data).unwrap();
        assert_eq!(value["candidates"][0]["content"]["parts"][0]["text"], "b");
        assert_eq!(value["candidates"][0]["finishReason"], "STOP");
    }
}

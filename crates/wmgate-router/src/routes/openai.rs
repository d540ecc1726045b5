use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use uuid::Uuid;
use wmgate_core::{GatewayContext, Usage};
use wmgate_protocol::error::OpenAiErrorBody;
use wmgate_protocol::openai::chat_completions::{
    ChatCompletion, ChatCompletionChunk, ChatCompletionRequest, ChatUsage,
};
use wmgate_protocol::openai::models::{ListModelsResponse, ListObjectType, Model, ModelObjectType};
use wmgate_protocol::openai::responses::{ResponseObject, ResponseStreamEvent, ResponsesRequest};
use wmgate_protocol::sse::SseEvent;

use crate::error::GatewayError;
use crate::extract::{ensure_valid, parse_json};
use crate::prompt::{chat_prompt, responses_prompt};
use crate::routes::meta::SERVICE_NAME;
use crate::sse::{FrameEncoder, Frames, stream_response};
use crate::unix_now;

fn model_entry(id: &str, created: i64, root: Option<String>) -> Model {
    Model {
        id: id.to_string(),
        object: ModelObjectType::Model,
        created,
        owned_by: SERVICE_NAME.to_string(),
        root,
    }
}

pub(crate) async fn list_models(State(context): State<Arc<GatewayContext>>) -> Response {
    let created = unix_now();
    let data = context
        .models()
        .ids()
        .into_iter()
        .map(|id| model_entry(id, created, None))
        .collect();
    let payload = ListModelsResponse {
        object: ListObjectType::List,
        data,
    };
    (StatusCode::OK, Json(payload)).into_response()
}

pub(crate) async fn get_model(
    State(context): State<Arc<GatewayContext>>,
    Path(model): Path<String>,
) -> Response {
    if !context.models().contains(&model) {
        return (
            StatusCode::NOT_FOUND,
            Json(OpenAiErrorBody::model_not_found(&model)),
        )
            .into_response();
    }
    let entry = model_entry(&model, unix_now(), Some(context.default_model()));
    (StatusCode::OK, Json(entry)).into_response()
}

pub(crate) async fn chat_completions(
    State(context): State<Arc<GatewayContext>>,
    body: Bytes,
) -> Result<Response, GatewayError> {
    let request: ChatCompletionRequest = parse_json(&body)?;
    ensure_valid(request.validate())?;

    let model_id = request
        .model
        .clone()
        .unwrap_or_else(|| context.default_model());
    let model = context.resolve_model(Some(model_id.as_str()));
    let prompt = chat_prompt(&request.messages);
    let id = format!("chatcmpl-{}", Uuid::new_v4().simple());
    let created = unix_now();

    if !request.is_stream() {
        let generation = model.generate(&prompt).await?;
        let usage = ChatUsage::new(
            generation.usage.input_tokens,
            generation.usage.output_tokens,
        );
        let completion = ChatCompletion::single(id, created, model_id, generation.text, usage);
        return Ok((StatusCode::OK, Json(completion)).into_response());
    }

    let frames = ChatFrames {
        id,
        created,
        model: model_id,
    };
    stream_response(model.stream(&prompt), frames).await
}

struct ChatFrames {
    id: String,
    created: i64,
    model: String,
}

impl FrameEncoder for ChatFrames {
    fn delta(&mut self, text: String) -> Frames {
        let chunk = ChatCompletionChunk::delta(&self.id, self.created, &self.model, text);
        Ok(vec![SseEvent::json(&chunk)?])
    }

    fn finish(&mut self, _usage: Usage) -> Frames {
        let chunk = ChatCompletionChunk::finish(&self.id, self.created, &self.model);
        Ok(vec![SseEvent::json(&chunk)?, SseEvent::done()])
    }
}

pub(crate) async fn responses(
    State(context): State<Arc<GatewayContext>>,
    body: Bytes,
) -> Result<Response, GatewayError> {
    let request: ResponsesRequest = parse_json(&body)?;

    let prompt = responses_prompt(&request);
    if prompt.is_empty() {
        return Err(GatewayError::BadRequest(
            "No valid prompt found. Provide input or messages.".to_string(),
        ));
    }

    let model_id = request
        .model
        .clone()
        .unwrap_or_else(|| context.default_model());
    let model = context.resolve_model(Some(model_id.as_str()));
    let suffix = Uuid::new_v4().simple().to_string();
    let frames = ResponseFrames {
        id: format!("resp-{suffix}"),
        message_id: format!("msg-{suffix}"),
        created_at: unix_now(),
        model: model_id,
        text: String::new(),
    };

    if !request.is_stream() {
        let generation = model.generate(&prompt).await?;
        return Ok((StatusCode::OK, Json(frames.completed(generation.text))).into_response());
    }

    stream_response(model.stream(&prompt), frames).await
}

struct ResponseFrames {
    id: String,
    message_id: String,
    created_at: i64,
    model: String,
    /// Accumulated output, repeated in `response.completed`.
    text: String,
}

impl ResponseFrames {
    fn completed(&self, text: String) -> ResponseObject {
        ResponseObject::completed(
            &self.id,
            self.created_at,
            &self.model,
            &self.message_id,
            text,
        )
    }

    fn event(event: &ResponseStreamEvent) -> Result<SseEvent, serde_json::Error> {
        SseEvent::named_json(event.event_name(), event)
    }
}

impl FrameEncoder for ResponseFrames {
    fn opening(&mut self) -> Frames {
        let created = ResponseStreamEvent::Created {
            response: ResponseObject::in_progress(&self.id, self.created_at, &self.model),
        };
        Ok(vec![Self::event(&created)?])
    }

    fn delta(&mut self, text: String) -> Frames {
        self.text.push_str(&text);
        Ok(vec![Self::event(&ResponseStreamEvent::text_delta(
            &self.id, text,
        ))?])
    }

    fn finish(&mut self, _usage: Usage) -> Frames {
        let text = std::mem::take(&mut self.text);
        let completed = ResponseStreamEvent::Completed {
            response: self.completed(text),
        };
        Ok(vec![Self::event(&completed)?, SseEvent::done()])
    }
}

//! Drives the full router in-process against a recording provider.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use bytes::Bytes;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use wmgate_common::AppConfig;
use wmgate_core::{GatewayContext, RuntimeMode};
use wmgate_protocol::sse::SseEvent;
use wmgate_provider_core::ProviderRegistry;
use wmgate_provider_core::testing::{FakeProvider, upstream_failure};
use wmgate_router::gateway_router;

mod support;

use support::{SseParser, is_done};

struct Gateway {
    app: Router,
    provider: Arc<FakeProvider>,
    context: Arc<GatewayContext>,
}

async fn gateway(provider: FakeProvider) -> Gateway {
    let provider = Arc::new(provider);
    let mut registry = ProviderRegistry::new("<memory>");
    registry.register(provider.clone());
    registry.initialize_providers().await;
    let context = Arc::new(GatewayContext::new(
        Arc::new(registry),
        &AppConfig::default(),
    ));
    Gateway {
        app: gateway_router(context.clone()),
        provider,
        context,
    }
}

struct Reply {
    status: StatusCode,
    content_type: String,
    body: Bytes,
}

impl Reply {
    fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    fn events(&self) -> Vec<SseEvent> {
        let mut parser = SseParser::new();
        let mut events = parser.push_bytes(&self.body);
        events.extend(parser.finish());
        events
    }
}

async fn send(app: &Router, request: Request<Body>) -> Reply {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    Reply {
        status,
        content_type,
        body,
    }
}

async fn get(app: &Router, uri: &str) -> Reply {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

async fn post_raw(app: &Router, uri: &str, body: &str) -> Reply {
    let request = Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

async fn post(app: &Router, uri: &str, body: Value) -> Reply {
    post_raw(app, uri, &body.to_string()).await
}

fn gemini_web() -> FakeProvider {
    FakeProvider::new("gemini-web")
}

#[tokio::test]
async fn chat_completion_flattens_messages() {
    let gw = gateway(gemini_web().replying("assistant answer")).await;
    let reply = post(
        &gw.app,
        "/v1/chat/completions",
        json!({
            "model": "gemini-2.5-flash",
            "messages": [
                {"role": "system", "content": "be concise"},
                {"role": "user", "content": [
                    {"type": "text", "text": "hello"},
                    {"type": "text", "text": "world"}
                ]}
            ]
        }),
    )
    .await;

    assert_eq!(reply.status, StatusCode::OK);
    let body = reply.json();
    assert_eq!(body["object"], "chat.completion");
    assert_eq!(body["model"], "gemini-2.5-flash");
    assert_eq!(body["choices"][0]["message"]["content"], "assistant answer");
    assert_eq!(body["choices"][0]["finish_reason"], "stop");
    assert_eq!(body["usage"]["completion_tokens"], 16);
    assert!(body["id"].as_str().unwrap().starts_with("chatcmpl-"));

    let calls = gw.provider.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].prompt, "System: be concise\n\nUser: hello\nworld");
    assert_eq!(calls[0].model, "gemini-2.5-flash");
    assert_eq!(calls[0].session, None);
}

#[tokio::test]
async fn chat_completion_stream_ends_with_done() {
    let reply_text = "x".repeat(100);
    let gw = gateway(gemini_web().replying(reply_text.clone())).await;
    let reply = post(
        &gw.app,
        "/v1/chat/completions",
        json!({"stream": true, "messages": [{"role": "user", "content": "hi"}]}),
    )
    .await;

    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.content_type.starts_with("text/event-stream"));
    let events = reply.events();
    assert!(is_done(events.last().unwrap()));

    let chunks: Vec<Value> = events[..events.len() - 1]
        .iter()
        .map(|event| serde_json::from_str(&event.data).unwrap())
        .collect();
    let text: String = chunks
        .iter()
        .filter_map(|chunk| chunk["choices"][0]["delta"]["content"].as_str())
        .collect();
    assert_eq!(text, reply_text);
    let last = chunks.last().unwrap();
    assert_eq!(last["object"], "chat.completion.chunk");
    assert_eq!(last["choices"][0]["finish_reason"], "stop");
    assert_eq!(last["model"], "gemini-2.5-flash");
    assert!(chunks.iter().all(|chunk| chunk["id"] == chunks[0]["id"]));
}

#[tokio::test]
async fn failing_stream_is_reported_before_headers() {
    let gw = gateway(gemini_web()).await;
    gw.provider.set_reply(Err(upstream_failure()));
    let reply = post(
        &gw.app,
        "/v1/chat/completions",
        json!({"stream": true, "messages": [{"role": "user", "content": "hi"}]}),
    )
    .await;

    assert_eq!(reply.status, StatusCode::BAD_GATEWAY);
    assert!(reply.content_type.starts_with("application/json"));
    assert_eq!(reply.json()["detail"], "Fake request failed with status 500");
}

#[tokio::test]
async fn request_errors_are_detail_bodies() {
    let gw = gateway(gemini_web()).await;

    let reply = post_raw(&gw.app, "/v1/chat/completions", "{broken").await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.json(), json!({"detail": "Invalid JSON body"}));

    let reply = post(
        &gw.app,
        "/v1/chat/completions",
        json!({"messages": [{"role": "robot", "content": ""}]}),
    )
    .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    let detail = reply.json()["detail"].as_str().unwrap().to_string();
    assert!(detail.starts_with("Invalid request: "));
    assert!(detail.contains("; "));

    assert!(gw.provider.calls().is_empty());
}

#[tokio::test]
async fn responses_prefer_messages_over_input() {
    let gw = gateway(gemini_web().replying("done")).await;
    let reply = post(
        &gw.app,
        "/v1/responses",
        json!({
            "input": "from input",
            "messages": [{"role": "user", "content": "from messages"}]
        }),
    )
    .await;

    assert_eq!(reply.status, StatusCode::OK);
    let body = reply.json();
    assert_eq!(body["object"], "response");
    assert_eq!(body["status"], "completed");
    assert_eq!(body["output_text"], "done");
    assert_eq!(body["output"][0]["content"][0]["text"], "done");
    assert_eq!(gw.provider.prompts(), vec!["User: from messages"]);
}

#[tokio::test]
async fn responses_without_prompt_are_rejected() {
    let gw = gateway(gemini_web()).await;
    let reply = post(&gw.app, "/v1/responses", json!({"input": "   "})).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        reply.json()["detail"],
        "No valid prompt found. Provide input or messages."
    );
}

#[tokio::test]
async fn responses_stream_has_lifecycle_events() {
    let gw = gateway(gemini_web().replying("streamed text")).await;
    let reply = post(
        &gw.app,
        "/v1/responses",
        json!({"stream": true, "model": "gemini-2.5-pro", "input": ["hi"]}),
    )
    .await;

    assert_eq!(reply.status, StatusCode::OK);
    let events = reply.events();
    let names: Vec<Option<&str>> = events.iter().map(|event| event.event.as_deref()).collect();
    assert_eq!(
        names,
        vec![
            Some("response.created"),
            Some("response.output_text.delta"),
            Some("response.completed"),
            None
        ]
    );
    assert!(is_done(&events[3]));

    let created: Value = serde_json::from_str(&events[0].data).unwrap();
    assert_eq!(created["type"], "response.created");
    assert_eq!(created["response"]["status"], "in_progress");
    let completed: Value = serde_json::from_str(&events[2].data).unwrap();
    assert_eq!(completed["response"]["output_text"], "streamed text");
    assert_eq!(completed["response"]["id"], created["response"]["id"]);
    assert_eq!(completed["response"]["model"], "gemini-2.5-pro");
}

#[tokio::test]
async fn model_listing_and_lookup() {
    let gw = gateway(gemini_web()).await;

    let reply = get(&gw.app, "/v1/models").await;
    assert_eq!(reply.status, StatusCode::OK);
    let body = reply.json();
    assert_eq!(body["object"], "list");
    let ids: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|model| model["id"].as_str().unwrap())
        .collect();
    assert!(ids.contains(&"onetest-model"));
    assert!(ids.contains(&"gemini-2.5-flash"));
    assert!(ids.contains(&"gpt-4o"));
    assert_eq!(body["data"][0]["owned_by"], "web-model-api-gateway");

    let reply = get(&gw.app, "/v1/models/gemini-2.5-pro").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()["root"], "gemini-2.5-flash");

    let reply = get(&gw.app, "/v1/models/unknown-model").await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    let body = reply.json();
    assert_eq!(body["error"]["code"], "model_not_found");
    assert_eq!(body["error"]["type"], "invalid_request_error");
    assert_eq!(body["error"]["param"], "model");
}

#[tokio::test]
async fn google_generate_content_uses_path_model() {
    let gw = gateway(gemini_web().replying("google answer")).await;
    let reply = post(
        &gw.app,
        "/v1beta/models/gemini-2.5-pro:generateContent",
        json!({"contents": [{"role": "user", "parts": [{"text": "a"}, {"text": "b"}]}]}),
    )
    .await;

    assert_eq!(reply.status, StatusCode::OK);
    let body = reply.json();
    assert_eq!(
        body["candidates"][0]["content"]["parts"][0]["text"],
        "google answer"
    );
    assert_eq!(body["candidates"][0]["finishReason"], "STOP");
    assert!(body["promptFeedback"]["safetyRatings"].is_array());

    let calls = gw.provider.calls();
    assert_eq!(calls[0].prompt, "ab");
    assert_eq!(calls[0].model, "gemini-2.5-pro");
}

#[tokio::test]
async fn google_stream_marks_last_frame() {
    let gw = gateway(gemini_web().replying("y".repeat(60))).await;
    let reply = post(
        &gw.app,
        "/v1beta/models/gemini-2.5-flash:streamGenerateContent",
        json!({"contents": [{"parts": [{"text": "hi"}]}]}),
    )
    .await;

    assert_eq!(reply.status, StatusCode::OK);
    let events = reply.events();
    assert!(events.iter().all(|event| !is_done(event)));
    let frames: Vec<Value> = events
        .iter()
        .map(|event| serde_json::from_str(&event.data).unwrap())
        .collect();
    let text: String = frames
        .iter()
        .map(|frame| frame["candidates"][0]["content"]["parts"][0]["text"].as_str().unwrap())
        .collect();
    assert_eq!(text, "y".repeat(60));
    let (last, rest) = frames.split_last().unwrap();
    assert_eq!(last["candidates"][0]["finishReason"], "STOP");
    assert!(rest.iter().all(|frame| frame["candidates"][0].get("finishReason").is_none()));
}

#[tokio::test]
async fn gemini_endpoint_is_stateless() {
    let gw = gateway(gemini_web().replying("plain")).await;
    for _ in 0..2 {
        let reply = post(&gw.app, "/gemini", json!({"message": "hi"})).await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.json(), json!({"response": "plain"}));
    }
    assert_eq!(gw.provider.chats_started(), 0);
    assert!(gw.provider.calls().iter().all(|call| call.metadata.is_empty()));
}

#[tokio::test]
async fn translate_switches_session_on_model_change() {
    let gw = gateway(gemini_web()).await;
    for model in ["gemini-2.5-pro", "gemini-2.5-flash"] {
        let reply = post(
            &gw.app,
            "/translate",
            json!({"message": "bonjour", "model": model}),
        )
        .await;
        assert_eq!(reply.status, StatusCode::OK);
    }
    assert_eq!(gw.provider.chats_started(), 2);
}

#[tokio::test]
async fn chat_slot_keeps_its_session() {
    let gw = gateway(gemini_web()).await;
    for message in ["one", "two"] {
        let reply = post(&gw.app, "/gemini-chat", json!({"message": message})).await;
        assert_eq!(reply.status, StatusCode::OK);
    }
    post(&gw.app, "/translate", json!({"message": "three"})).await;

    assert_eq!(gw.provider.chats_started(), 2);
    let calls = gw.provider.calls();
    assert_eq!(calls[0].session, calls[1].session);
    assert_ne!(calls[1].session, calls[2].session);
    assert_eq!(calls[1].metadata.conversation_id.as_deref(), Some("c_1"));
}

#[tokio::test]
async fn web_endpoints_validate_models() {
    let gw = gateway(gemini_web()).await;
    let reply = post(
        &gw.app,
        "/gemini",
        json!({"message": "hi", "model": "gemini-1.0"}),
    )
    .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(reply.json()["detail"].as_str().unwrap().contains("gemini-1.0"));

    let reply = post(&gw.app, "/gemini", json!({"message": ""})).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn native_api_mode_hides_web_endpoints() {
    let gw = gateway(gemini_web()).await;
    gw.context.set_mode(Some(RuntimeMode::NativeApi));

    let reply = post(&gw.app, "/translate", json!({"message": "hi"})).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert!(reply.json()["detail"].as_str().unwrap().contains("native-api"));

    assert_eq!(get(&gw.app, "/v1/models").await.status, StatusCode::OK);

    gw.context.set_mode(Some(RuntimeMode::Webai));
    let reply = post(&gw.app, "/translate", json!({"message": "hi"})).await;
    assert_eq!(reply.status, StatusCode::OK);
}

#[tokio::test]
async fn unavailable_provider_is_service_unavailable() {
    let gw = gateway(gemini_web().failing_init("cookies expired")).await;

    let reply = post(&gw.app, "/gemini", json!({"message": "hi"})).await;
    assert_eq!(reply.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        reply.json()["detail"],
        "Active provider 'Fake gemini-web' is unavailable. cookies expired"
    );

    // The echo model needs no provider.
    let reply = post(
        &gw.app,
        "/v1/chat/completions",
        json!({"model": "onetest-model", "messages": [{"role": "user", "content": "hi"}]}),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()["choices"][0]["message"]["content"], "onetest");
}

#[tokio::test]
async fn meta_endpoints_and_cors() {
    let gw = gateway(gemini_web()).await;

    let reply = get(&gw.app, "/").await;
    assert_eq!(
        reply.json(),
        json!({"status": "ok", "service": "web-model-api-gateway", "active_provider": "gemini-web"})
    );

    let docs = get(&gw.app, "/docs").await.json();
    assert!(
        docs["endpoints"]
            .as_array()
            .unwrap()
            .contains(&json!("POST /v1/chat/completions"))
    );

    let request = Request::get("/")
        .header(header::ORIGIN, "https://example.test")
        .body(Body::empty())
        .unwrap();
    let response = gw.app.clone().oneshot(request).await.unwrap();
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}

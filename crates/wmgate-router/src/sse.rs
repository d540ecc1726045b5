use std::convert::Infallible;

use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, header};
use axum::response::Response;
use bytes::Bytes;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, warn};
use wmgate_core::{StreamPart, Usage};
use wmgate_protocol::sse::SseEvent;

use crate::error::GatewayError;

const SSE_BUFFER: usize = 32;

pub(crate) type Frames = Result<Vec<SseEvent>, serde_json::Error>;

/// Renders generation parts as frames of one streaming dialect.
pub(crate) trait FrameEncoder: Send + 'static {
    /// Frames written before the first delta.
    fn opening(&mut self) -> Frames {
        Ok(Vec::new())
    }

    fn delta(&mut self, text: String) -> Frames;

    /// Terminal frames, including any `[DONE]` marker.
    fn finish(&mut self, usage: Usage) -> Frames;
}

/// Commits to a streaming response only once the first part is known. A
/// failure before any output becomes an ordinary error response; a later
/// one is logged and the stream is closed without a further frame.
pub(crate) async fn stream_response<E: FrameEncoder>(
    mut parts: mpsc::Receiver<StreamPart>,
    mut encoder: E,
) -> Result<Response, GatewayError> {
    let first = match parts.recv().await {
        Some(StreamPart::Error(err)) => return Err(err.into()),
        Some(part) => part,
        None => {
            return Err(GatewayError::Internal(
                "generation ended before producing output".to_string(),
            ));
        }
    };

    let (tx, rx) = mpsc::channel::<Bytes>(SSE_BUFFER);
    tokio::spawn(async move {
        if !send_frames(&tx, encoder.opening()).await {
            return;
        }
        let mut next = Some(first);
        while let Some(part) = next {
            let (frames, terminal) = match part {
                StreamPart::Delta(text) => (encoder.delta(text), false),
                StreamPart::Finish(usage) => (encoder.finish(usage), true),
                StreamPart::Error(err) => {
                    warn!(error = %err, "generation failed mid-stream, closing stream");
                    return;
                }
            };
            if !send_frames(&tx, frames).await || terminal {
                return;
            }
            next = parts.recv().await;
        }
    });

    Ok(sse_body(rx))
}

async fn send_frames(tx: &mpsc::Sender<Bytes>, frames: Frames) -> bool {
    let frames = match frames {
        Ok(frames) => frames,
        Err(err) => {
            error!(error = %err, "failed to encode stream frame");
            return false;
        }
    };
    for frame in frames {
        if tx.send(frame.encode()).await.is_err() {
            debug!("stream client disconnected");
            return false;
        }
    }
    true
}

fn sse_body(rx: mpsc::Receiver<Bytes>) -> Response {
    let stream = ReceiverStream::new(rx).map(Ok::<_, Infallible>);
    let mut response = Response::new(Body::from_stream(stream));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/event-stream; charset=utf-8"),
    );
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-transform"),
    );
    headers.insert(
        HeaderName::from_static("x-accel-buffering"),
        HeaderValue::from_static("no"),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use wmgate_provider_core::ProviderError;

    struct Plain;

    impl FrameEncoder for Plain {
        fn opening(&mut self) -> Frames {
            Ok(vec![SseEvent::named("open", "{}")])
        }

        fn delta(&mut self, text: String) -> Frames {
            Ok(vec![SseEvent::data(text)])
        }

        fn finish(&mut self, _usage: Usage) -> Frames {
            Ok(vec![SseEvent::done()])
        }
    }

    async fn feed(parts: Vec<StreamPart>) -> mpsc::Receiver<StreamPart> {
        let (tx, rx) = mpsc::channel(8);
        for part in parts {
            tx.send(part).await.unwrap();
        }
        rx
    }

    #[tokio::test]
    async fn frames_follow_parts_in_order() {
        let rx = feed(vec![
            StreamPart::Delta("a".into()),
            StreamPart::Delta("b".into()),
            StreamPart::Finish(Usage::default()),
            StreamPart::Delta("after finish".into()),
        ])
        .await;
        let response = stream_response(rx, Plain).await.unwrap();
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/event-stream; charset=utf-8"
        );
        assert_eq!(response.headers()["x-accel-buffering"], "no");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(
            &body[..],
            b"event: open\ndata: {}\n\ndata: a\n\ndata: b\n\ndata: [DONE]\n\n"
        );
    }

    #[tokio::test]
    async fn early_failure_is_an_error_response() {
        let rx = feed(vec![StreamPart::Error(ProviderError::NoCandidates)]).await;
        let err = stream_response(rx, Plain).await.unwrap_err();
        assert_eq!(err.status().as_u16(), 502);
    }

    #[tokio::test]
    async fn late_failure_closes_stream_without_extra_frame() {
        let rx = feed(vec![
            StreamPart::Delta("a".into()),
            StreamPart::Error(ProviderError::Transport("socket".into())),
        ])
        .await;
        let response = stream_response(rx, Plain).await.unwrap();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(
            &body[..],
            b"event: open\ndata: {}\n\ndata: a\n\n"
        );
    }
}

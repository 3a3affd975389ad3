//! NDJSON framing for streamed answers.
//!
//! Every fragment becomes one `{"text": ...}` line. An engine failure after
//! the stream started becomes a final `{"error": ...}` line.

use std::convert::Infallible;

use axum::{
    body::{Body, Bytes},
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};
use contextor::{FragmentStream, StreamEvent};
use serde_json::json;

pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

pub fn encode_event(event: &StreamEvent) -> Bytes {
    let value = match event {
        StreamEvent::Fragment(text) => json!({ "text": text }),
        StreamEvent::Failed(message) => json!({ "error": message }),
    };
    let mut line = value.to_string();
    line.push('\n');
    Bytes::from(line)
}

/// Streams fragments to the client as they arrive.
///
/// Dropping the body (client disconnect) drops the receiver, which aborts
/// the generation upstream.
pub fn ndjson_response(rx: FragmentStream) -> Response {
    let stream = futures::stream::unfold(rx, |mut rx| async move {
        let event = rx.recv().await?;
        Some((Ok::<_, Infallible>(encode_event(&event)), rx))
    });
    let mut res = Body::from_stream(stream).into_response();
    res.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(NDJSON_CONTENT_TYPE),
    );
    res
}

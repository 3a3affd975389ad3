use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use services::ids::new_request_id;
use tracing::{Instrument, info, info_span};

pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

fn incoming_id(req: &Request<Body>) -> Option<String> {
    req.headers()
        .get(&X_REQUEST_ID)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty() && v.len() <= 128)
        .map(str::to_string)
}

/// Echoes `X-Request-Id` (or mints one) and runs the handler inside a span
/// carrying it, so every log line of the request is tagged.
pub async fn request_id(req: Request<Body>, next: Next) -> Response {
    let id = incoming_id(&req).unwrap_or_else(new_request_id);
    let span = info_span!(
        "http",
        request_id = %id,
        method = %req.method(),
        path = %req.uri().path()
    );

    let mut res = next.run(req).instrument(span.clone()).await;
    span.in_scope(|| info!(status = res.status().as_u16(), "request finished"));

    if let Ok(value) = HeaderValue::from_str(&id) {
        res.headers_mut().insert(X_REQUEST_ID.clone(), value);
    }
    res
}

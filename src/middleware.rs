//! Request logging middleware.
//!
//! Tags each request with a UUID v4 and wraps it in a tracing span so
//! every log line emitted while serving it can be correlated.

use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};
use tracing::Instrument;
use uuid::Uuid;

/// Middleware that wraps each request in a span carrying a request ID,
/// then logs status and duration on completion.
///
/// This should be the outermost layer so the span covers all request
/// processing.
pub async fn request_id_layer(request: Request, next: Next) -> Response {
    let span = tracing::info_span!(
        "request",
        request_id = %Uuid::new_v4(),
        method = %request.method(),
        path = %request.uri().path(),
    );

    let start = Instant::now();
    async move {
        let response = next.run(request).await;
        tracing::info!(
            status = response.status().as_u16(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Request completed"
        );
        response
    }
    .instrument(span)
    .await
}

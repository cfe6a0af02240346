//! Health check endpoint.

/// Health check handler.
///
/// Returns a plain "ok" so scripts and probes can tell the listener is up
/// without touching the served directory.
pub async fn health() -> &'static str {
    "ok"
}

//! HTTP routes: liveness probe plus the static file tree.
//!
//! Every response carries `Cache-Control: no-cache` so browsers revalidate
//! on refresh and edits in the served directory show up immediately.
//! Request tracing is enabled via middleware that generates a unique
//! request ID for each incoming request.

pub mod health;

use axum::{middleware, routing::get, Router};
use http::header::{HeaderValue, CACHE_CONTROL};
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::config::{AppConfig, CACHE_CONTROL_DEV};
use crate::middleware::request_id_layer;

/// Creates the Axum router: `/health` plus static files from the document
/// root, with `index.html` appended on directory requests.
pub fn create_router(config: &AppConfig) -> Router {
    let static_service =
        ServeDir::new(&config.files.root).append_index_html_on_directories(true);

    Router::new()
        .route("/health", get(health::health))
        .fallback_service(static_service)
        .layer(SetResponseHeaderLayer::if_not_present(
            CACHE_CONTROL,
            HeaderValue::from_static(CACHE_CONTROL_DEV),
        ))
        // Request ID middleware - creates root span with request_id for correlation
        .layer(middleware::from_fn(request_id_layer))
}

//! selfserve - serve a local directory over HTTPS.
//!
//! A development convenience tool: on startup it makes sure a self-signed
//! certificate pair exists on disk (generating one when missing or
//! invalid), then serves static files from a document root over TLS until
//! interrupted. Not production server infrastructure.

pub mod config;
pub mod http;
pub mod middleware;
pub mod routes;
pub mod tls;

//! HTTPS server module.
//!
//! The server always speaks TLS, using the provisioned self-signed pair:
//! - Graceful shutdown on SIGTERM/SIGINT with a bounded drain period
//! - Certificate hot-reload via SIGHUP
//! - Per-connection handshake failures drop that connection only

mod server;
mod shutdown;

pub use server::{serve, start_server, ServerError};

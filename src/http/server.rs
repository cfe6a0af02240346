//! HTTPS server startup logic.
//!
//! Binds the listener, loads the provisioned certificate pair into a
//! rustls config, and serves the router until a termination signal.

use std::net::SocketAddr;

use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;

use crate::config::AppConfig;
use crate::tls::CertificateBundle;

use super::shutdown;

/// Server startup error
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Invalid bind address {0}")]
    Addr(String),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("Failed to load TLS configuration: {0}")]
    TlsConfig(String),

    #[error("Server error: {0}")]
    Server(String),
}

/// Start the HTTPS server from configuration.
///
/// This function blocks until the server shuts down.
pub async fn start_server(
    app: Router,
    config: &AppConfig,
    bundle: &CertificateBundle,
) -> Result<(), ServerError> {
    let addr: SocketAddr = format!("{}:{}", config.http.host, config.http.port)
        .parse()
        .map_err(|_| ServerError::Addr(format!("{}:{}", config.http.host, config.http.port)))?;

    serve(app, addr, bundle, Handle::new()).await
}

/// Serve `app` over TLS on `addr` until `handle` reports shutdown.
///
/// The listener is bound eagerly so a busy port surfaces as
/// `ServerError::Bind` before any TLS work happens. Handshake failures are
/// contained per-connection inside the accept loop: a plaintext client on
/// the TLS port gets its connection dropped and the server keeps serving.
pub async fn serve(
    app: Router,
    addr: SocketAddr,
    bundle: &CertificateBundle,
    handle: Handle,
) -> Result<(), ServerError> {
    let rustls_config = RustlsConfig::from_pem_file(&bundle.cert_path, &bundle.key_path)
        .await
        .map_err(|e| ServerError::TlsConfig(format!("Failed to load certificates: {}", e)))?;

    let listener =
        std::net::TcpListener::bind(addr).map_err(|source| ServerError::Bind { addr, source })?;
    listener
        .set_nonblocking(true)
        .map_err(|source| ServerError::Bind { addr, source })?;
    let local_addr = listener
        .local_addr()
        .map_err(|source| ServerError::Bind { addr, source })?;

    tracing::info!(
        addr = %local_addr,
        cert = %bundle.cert_path.display(),
        key = %bundle.key_path.display(),
        "Starting HTTPS server"
    );

    // Setup graceful shutdown
    shutdown::setup_shutdown_handler(handle.clone());

    // Setup SIGHUP handler for certificate reload
    shutdown::setup_reload_handler(rustls_config.clone(), bundle.clone());

    axum_server::from_tcp_rustls(listener, rustls_config)
        .handle(handle)
        .serve(app.into_make_service())
        .await
        .map_err(|e| ServerError::Server(e.to_string()))
}

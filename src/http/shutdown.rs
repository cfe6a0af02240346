//! Graceful shutdown and signal handling.
//!
//! Handles:
//! - SIGTERM/SIGINT: Graceful shutdown with connection draining
//! - SIGHUP: Certificate reload from the provisioned paths

use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;

use crate::config::SHUTDOWN_GRACE_SECS;
use crate::tls::CertificateBundle;

/// Setup graceful shutdown on SIGTERM and SIGINT.
///
/// When either signal is received, the server will:
/// 1. Stop accepting new connections
/// 2. Wait up to the grace period for in-flight requests to complete
/// 3. Release the listening socket and exit
pub fn setup_shutdown_handler(handle: Handle) {
    tokio::spawn(async move {
        let ctrl_c = async {
            tokio::signal::ctrl_c()
                .await
                .expect("Failed to install Ctrl+C handler");
        };

        #[cfg(unix)]
        let terminate = async {
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("Failed to install SIGTERM handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                tracing::info!("Received Ctrl+C, initiating graceful shutdown");
            }
            _ = terminate => {
                tracing::info!("Received SIGTERM, initiating graceful shutdown");
            }
        }

        handle.graceful_shutdown(Some(std::time::Duration::from_secs(SHUTDOWN_GRACE_SECS)));
        tracing::info!(
            grace_secs = SHUTDOWN_GRACE_SECS,
            "Stopped accepting connections, draining in-flight requests"
        );
    });
}

/// Setup SIGHUP handler for certificate reload.
///
/// When SIGHUP is received, the server reloads the key and certificate
/// files from disk without restarting, picking up an externally
/// regenerated pair.
#[cfg(unix)]
pub fn setup_reload_handler(tls_config: RustlsConfig, bundle: CertificateBundle) {
    tokio::spawn(async move {
        let mut sighup = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::hangup())
            .expect("Failed to install SIGHUP handler");

        loop {
            sighup.recv().await;
            tracing::info!("Received SIGHUP, reloading TLS certificates");

            match tls_config
                .reload_from_pem_file(&bundle.cert_path, &bundle.key_path)
                .await
            {
                Ok(()) => {
                    tracing::info!(
                        cert = %bundle.cert_path.display(),
                        key = %bundle.key_path.display(),
                        "TLS certificates reloaded"
                    );
                }
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        cert = %bundle.cert_path.display(),
                        key = %bundle.key_path.display(),
                        "Failed to reload TLS certificates"
                    );
                }
            }
        }
    });
}

/// No-op reload handler for non-Unix platforms.
#[cfg(not(unix))]
pub fn setup_reload_handler(_tls_config: RustlsConfig, _bundle: CertificateBundle) {
    tracing::warn!("Certificate hot-reload via SIGHUP not supported on this platform");
}

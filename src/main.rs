//! selfserve: a local HTTPS development server.
//!
//! This is the application entry point. It parses the CLI, loads
//! configuration from an optional TOML file, initializes tracing,
//! provisions the self-signed certificate, builds the router, and runs the
//! HTTPS server until a termination signal arrives.

use std::path::Path;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use selfserve::config::{AppConfig, DEFAULT_LOG_FILTER};
use selfserve::http::start_server;
use selfserve::routes::create_router;
use selfserve::tls::ensure_certificate;

/// selfserve: serve a local directory over HTTPS with a self-signed certificate
#[derive(Parser, Debug)]
#[command(name = "selfserve", version, about)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Address to bind (default 127.0.0.1)
    #[arg(short, long)]
    bind: Option<String>,

    /// Port to listen on (default 8443)
    #[arg(short, long)]
    port: Option<u16>,

    /// Directory to serve (default current directory)
    #[arg(short, long)]
    root: Option<String>,

    /// Certificate file path (default cert.pem)
    #[arg(long)]
    cert: Option<String>,

    /// Private key file path (default key.pem)
    #[arg(long)]
    key: Option<String>,

    /// Log level filter (e.g., "selfserve=debug,tower_http=info")
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args = Args::parse();

    // Load configuration, then let CLI flags override file values
    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.http.host = bind;
    }
    if let Some(port) = args.port {
        config.http.port = port;
    }
    if let Some(root) = args.root {
        config.files.root = root;
    }
    if let Some(cert) = args.cert {
        config.tls.cert_path = cert;
    }
    if let Some(key) = args.key {
        config.tls.key_path = key;
    }

    // Initialize tracing with priority: CLI > env > default
    let log_filter = args
        .log_level
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

    let registry =
        tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::new(&log_filter));
    if config.logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Loaded configuration");

    // Make sure a usable key/certificate pair exists before binding
    let bundle = ensure_certificate(
        Path::new(&config.tls.key_path),
        Path::new(&config.tls.cert_path),
        &config.tls.hostnames,
    )?;

    let app = create_router(&config);

    tracing::info!(
        root = %config.files.root,
        "Serving directory at https://{}:{}",
        config.http.host,
        config.http.port
    );

    start_server(app, &config, &bundle).await?;

    Ok(())
}

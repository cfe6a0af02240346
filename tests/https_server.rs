//! End-to-end HTTPS tests.
//!
//! Each test boots the real server on an ephemeral loopback port with a
//! freshly provisioned certificate, then talks to it the way a browser
//! would - minus trust: the client is told to accept the self-signed
//! certificate.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use axum_server::Handle;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use selfserve::config::AppConfig;
use selfserve::http::{serve, ServerError};
use selfserve::routes::create_router;
use selfserve::tls::{ensure_certificate, CertificateBundle};

/// The test binary links two rustls crypto providers (the server side uses
/// aws-lc-rs, reqwest's rustls-tls pulls in ring), so the process default
/// must be pinned explicitly before any TLS config is built.
fn init_crypto() {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
}

fn provision(dir: &Path) -> CertificateBundle {
    let hostnames = vec!["localhost".to_string(), "127.0.0.1".to_string()];
    ensure_certificate(
        &dir.join("key.pem"),
        &dir.join("cert.pem"),
        &hostnames,
    )
    .expect("certificate provisioning failed")
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .danger_accept_invalid_certs(true)
        .build()
        .unwrap()
}

/// Start the real router over TLS on an ephemeral port. Returns the bound
/// address, the shutdown handle, and the server task.
async fn spawn_server(
    root: &Path,
    bundle: &CertificateBundle,
) -> (
    SocketAddr,
    Handle,
    tokio::task::JoinHandle<Result<(), ServerError>>,
) {
    let mut config = AppConfig::default();
    config.files.root = root.to_string_lossy().into_owned();
    let app = create_router(&config);

    let handle = Handle::new();
    let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
    let join = {
        let bundle = bundle.clone();
        let handle = handle.clone();
        tokio::spawn(async move { serve(app, addr, &bundle, handle).await })
    };

    let bound = handle.listening().await.expect("server failed to start");
    (bound, handle, join)
}

#[tokio::test]
async fn serves_static_files_over_tls() {
    init_crypto();
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("index.html"), "<h1>it works</h1>").unwrap();
    std::fs::write(dir.path().join("hello.txt"), "hello over https\n").unwrap();

    let bundle = provision(dir.path());
    let (addr, handle, _join) = spawn_server(dir.path(), &bundle).await;
    let client = client();

    let resp = client
        .get(format!("https://{addr}/hello.txt"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers().get("cache-control").unwrap(),
        "no-cache",
        "dev responses must force revalidation"
    );
    assert_eq!(resp.text().await.unwrap(), "hello over https\n");

    // Directory requests resolve to index.html
    let resp = client.get(format!("https://{addr}/")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    assert!(resp.text().await.unwrap().contains("it works"));

    // Misses get a clean 404
    let resp = client
        .get(format!("https://{addr}/no-such-file"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    handle.shutdown();
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    init_crypto();
    let dir = TempDir::new().unwrap();
    let bundle = provision(dir.path());
    let (addr, handle, _join) = spawn_server(dir.path(), &bundle).await;

    let resp = client()
        .get(format!("https://{addr}/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "ok");

    handle.shutdown();
}

#[tokio::test]
async fn plain_http_request_does_not_kill_the_server() {
    init_crypto();
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("hello.txt"), "still here\n").unwrap();

    let bundle = provision(dir.path());
    let (addr, handle, _join) = spawn_server(dir.path(), &bundle).await;

    // Speak plaintext HTTP at the TLS port; the handshake fails and the
    // connection is dropped.
    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .await
        .unwrap();
    let mut buf = Vec::new();
    let _ = tokio::time::timeout(Duration::from_secs(2), stream.read_to_end(&mut buf)).await;

    // The listener is still alive for well-formed TLS clients.
    let resp = client()
        .get(format!("https://{addr}/hello.txt"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "still here\n");

    handle.shutdown();
}

#[tokio::test]
async fn graceful_shutdown_drains_in_flight_requests() {
    init_crypto();
    let dir = TempDir::new().unwrap();
    let bundle = provision(dir.path());

    // A handler slow enough to still be in flight when shutdown starts.
    let app = axum::Router::new().route(
        "/slow",
        axum::routing::get(|| async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            "done"
        }),
    );

    let handle = Handle::new();
    let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
    let join = {
        let bundle = bundle.clone();
        let handle = handle.clone();
        tokio::spawn(async move { serve(app, addr, &bundle, handle).await })
    };
    let addr = handle.listening().await.expect("server failed to start");

    let slow_client = client();
    let url = format!("https://{addr}/slow");
    let in_flight = tokio::spawn(async move { slow_client.get(url).send().await });

    // Let the request reach the handler, then trigger shutdown.
    tokio::time::sleep(Duration::from_millis(100)).await;
    handle.graceful_shutdown(Some(Duration::from_secs(5)));

    let resp = in_flight
        .await
        .unwrap()
        .expect("in-flight request should complete during drain");
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "done");

    // The server task has exited and the port no longer accepts connections.
    join.await.unwrap().unwrap();
    assert!(tokio::net::TcpStream::connect(addr).await.is_err());
}

#[tokio::test]
async fn busy_port_is_a_bind_error() {
    init_crypto();
    let dir = TempDir::new().unwrap();
    let bundle = provision(dir.path());

    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = taken.local_addr().unwrap();

    let config = AppConfig::default();
    let app = create_router(&config);
    let result = serve(app, addr, &bundle, Handle::new()).await;

    assert!(matches!(result, Err(ServerError::Bind { .. })));
}

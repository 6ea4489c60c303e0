use arx_ring::config::{ConfigStore, CONFIG_FILE};
use arx_ring::display::DisplayRefresh;
use arx_ring::error::Result;
use arx_ring::server::{serve, Portal, ServerSettings};
use arx_ring::wifi::WifiLink;
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tempfile::{tempdir, TempDir};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

struct ConnectedWifi;

impl WifiLink for ConnectedWifi {
    async fn is_connected(&self) -> bool {
        true
    }

    async fn ip(&self) -> String {
        "10.0.0.42".to_string()
    }

    async fn connect(&self) -> bool {
        true
    }
}

struct NoDisplay;

impl DisplayRefresh for NoDisplay {
    fn trigger_refresh(&self) {}
}

struct TestServer {
    address: SocketAddr,
    cancel_token: CancellationToken,
    handle: JoinHandle<Result<()>>,
    store: Arc<ConfigStore>,
    _dir: TempDir,
}

// Binds an ephemeral port; returns None where the sandbox forbids binding
async fn start_server() -> Option<TestServer> {
    let listener = match TcpListener::bind(SocketAddr::new(Ipv4Addr::LOCALHOST.into(), 0)).await {
        Ok(listener) => listener,
        Err(err) if err.kind() == io::ErrorKind::PermissionDenied => {
            eprintln!("Skipping server integration test because binding failed: {err}");
            return None;
        }
        Err(err) => panic!("Failed to bind test listener: {err}"),
    };
    let address = listener
        .local_addr()
        .expect("Failed to get local address of listener");

    let dir = tempdir().expect("Failed to create temporary directory");
    let store = Arc::new(ConfigStore::new(dir.path().join(CONFIG_FILE)));
    let portal = Portal::new(Arc::clone(&store), ConnectedWifi, NoDisplay);
    let settings = ServerSettings {
        port: address.port(),
        config_path: store.path().to_path_buf(),
        read_timeout: Duration::from_millis(300),
        ..ServerSettings::default()
    };

    let cancel_token = CancellationToken::new();
    let handle = tokio::spawn(serve(listener, portal, settings, cancel_token.clone()));

    Some(TestServer {
        address,
        cancel_token,
        handle,
        store,
        _dir: dir,
    })
}

async fn send(address: SocketAddr, raw: &[u8]) -> String {
    let mut stream = TcpStream::connect(address)
        .await
        .expect("Failed to connect to server");
    stream
        .write_all(raw)
        .await
        .expect("Failed to send request to server");

    let mut response = Vec::new();
    stream
        .read_to_end(&mut response)
        .await
        .expect("Failed to read response from server");
    String::from_utf8_lossy(&response).into_owned()
}

async fn stop(server: TestServer) {
    server.cancel_token.cancel();
    server
        .handle
        .await
        .expect("Server task failed")
        .expect("Server returned an error");
}

#[tokio::test]
async fn test_server_serves_wifi_page() {
    let Some(server) = start_server().await else {
        return;
    };

    let response = send(server.address, b"GET / HTTP/1.1\r\nHost: 192.168.4.1\r\n\r\n").await;

    assert!(response.starts_with("HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n\r\n"));
    assert!(response.contains("Status: Connected"));
    assert!(response.contains("IP Address: 10.0.0.42"));

    stop(server).await;
}

#[tokio::test]
async fn test_unknown_path_returns_404() {
    let Some(server) = start_server().await else {
        return;
    };

    let response = send(server.address, b"GET /status HTTP/1.1\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1.1 404"));

    stop(server).await;
}

#[tokio::test]
async fn test_empty_connection_is_closed_without_response() {
    let Some(server) = start_server().await else {
        return;
    };

    let mut stream = TcpStream::connect(server.address)
        .await
        .expect("Failed to connect to server");
    stream
        .shutdown()
        .await
        .expect("Failed to close write side");
    let mut response = Vec::new();
    stream
        .read_to_end(&mut response)
        .await
        .expect("Failed to read from server");
    assert!(response.is_empty());

    // The acceptor keeps going after the empty connection
    let response = send(server.address, b"GET /config HTTP/1.1\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1.1 200 OK"));

    stop(server).await;
}

#[tokio::test]
async fn test_silent_client_does_not_block_forever() {
    let Some(server) = start_server().await else {
        return;
    };

    let _silent = TcpStream::connect(server.address)
        .await
        .expect("Failed to connect silent client");

    let response = tokio::time::timeout(
        Duration::from_secs(5),
        send(server.address, b"GET / HTTP/1.1\r\n\r\n"),
    )
    .await
    .expect("Second client should be served after the read timeout");
    assert!(response.starts_with("HTTP/1.1 200 OK"));

    stop(server).await;
}

#[tokio::test]
async fn test_update_wifi_persists_and_reports() {
    let Some(server) = start_server().await else {
        return;
    };

    let body = "ssid=My%2520Net&password=p%2540ss";
    let raw = format!(
        "POST /update_wifi HTTP/1.1\r\nContent-Type: application/x-www-form-urlencoded\r\nContent-Length: {}\r\n\r\n{body}",
        body.len()
    );
    let response = send(server.address, raw.as_bytes()).await;

    assert!(response.starts_with("HTTP/1.1 200 OK"));
    assert!(response.contains("Configuration updated: SSID and Password saved."));
    assert!(response.contains("Connected to new Wi-Fi network!"));

    let record = server.store.load();
    assert_eq!(record.ssid(), "My Net");
    assert_eq!(record.password(), "p@ss");

    stop(server).await;
}

#[tokio::test]
async fn test_cancellation_stops_server() {
    let Some(server) = start_server().await else {
        return;
    };

    server.cancel_token.cancel();
    let result = tokio::time::timeout(Duration::from_secs(5), server.handle)
        .await
        .expect("Server should stop after cancellation")
        .expect("Server task failed");
    assert!(result.is_ok());
}

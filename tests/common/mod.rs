//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use locale_edge::config::EdgeConfig;
use locale_edge::http::{AppState, HttpServer};
use locale_edge::lifecycle::Shutdown;
use reqwest::header::{ACCEPT, ACCEPT_ENCODING, USER_AGENT};
use reqwest::redirect::Policy;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

pub const CHROME: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0 Safari/537.36";

/// Raw request heads seen by a mock origin, lowercased.
pub type SeenRequests = Arc<Mutex<Vec<String>>>;

/// Start a mock origin on an ephemeral port that answers `origin {path}`.
pub async fn start_mock_origin() -> (SocketAddr, SeenRequests) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen: SeenRequests = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let log = log.clone();
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                loop {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => {
                            buf.extend_from_slice(&chunk[..n]);
                            if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                                break;
                            }
                        }
                    }
                }

                let head = String::from_utf8_lossy(&buf).to_lowercase();
                let path = head.split_whitespace().nth(1).unwrap_or("/").to_string();
                log.lock().unwrap().push(head);

                let body = format!("origin {}", path);
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (addr, seen)
}

/// An address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Defaults pointed at `origin`, with the metrics exporter off.
pub fn test_config(origin: SocketAddr) -> EdgeConfig {
    let mut config = EdgeConfig::default();
    config.upstream.address = origin.to_string();
    config.upstream.connect_timeout_secs = 1;
    config.observability.metrics_enabled = false;
    config
}

pub struct TestEdge {
    pub addr: SocketAddr,
    pub state: AppState,
    pub shutdown: Shutdown,
}

impl TestEdge {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

pub async fn start_edge(config: EdgeConfig) -> TestEdge {
    start_server(HttpServer::new(config).unwrap()).await
}

pub async fn start_server(server: HttpServer) -> TestEdge {
    let (_, config_updates) = mpsc::unbounded_channel();
    start_server_with_updates(server, config_updates).await
}

/// Run `server` with reloads fed from `config_updates`.
pub async fn start_server_with_updates(
    server: HttpServer,
    config_updates: mpsc::UnboundedReceiver<EdgeConfig>,
) -> TestEdge {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let state = server.state();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });

    TestEdge { addr, state, shutdown }
}

/// Client that reports redirects instead of following them.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(Policy::none())
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// GET with the headers a desktop browser always sends.
pub fn browser_get(client: &reqwest::Client, url: &str) -> reqwest::RequestBuilder {
    client
        .get(url)
        .header(USER_AGENT, CHROME)
        .header(ACCEPT, "text/html,application/xhtml+xml")
        .header(ACCEPT_ENCODING, "gzip, deflate, br")
}

/// Poll `check` until it holds or two seconds pass.
pub async fn eventually(check: impl Fn() -> bool) -> bool {
    for _ in 0..40 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    check()
}

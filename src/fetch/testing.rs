//! Loopback HTTP fixtures for exercising clients against canned responses.

use std::sync::Mutex;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use super::client::HttpClient;

/// Direct (proxy-free) client that records every URL it is asked to fetch.
pub(crate) struct RecordingClient {
    inner: reqwest::Client,
    urls: Mutex<Vec<String>>,
}

impl RecordingClient {
    pub(crate) fn new() -> Self {
        let inner = reqwest::Client::builder().no_proxy().build().unwrap();
        Self {
            inner,
            urls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpClient for RecordingClient {
    async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        self.urls.lock().unwrap().push(req.url().to_string());
        self.inner.execute(req).await
    }
}

/// Accepts one connection on a loopback port and answers it with `status`
/// (e.g. `"401 Unauthorized"`) and `body`.
///
/// Returns the server's base URL and a handle resolving to the raw request
/// head it received.
pub(crate) async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut head = Vec::new();
        let mut chunk = [0u8; 1024];
        while !head.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            head.extend_from_slice(&chunk[..n]);
        }

        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;

        String::from_utf8_lossy(&head).into_owned()
    });

    (format!("http://{addr}"), handle)
}

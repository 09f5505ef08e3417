//! Loopback HTTP server for exercising the fetcher and installers.
//!
//! Speaks just enough HTTP/1.1 for reqwest: one request per connection,
//! `Connection: close` on every response.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use crate::resources::fetcher::{Fetcher, UrlPolicy};

/// How the server answers a path.
#[derive(Debug, Clone)]
pub enum Route {
    /// 200 with a Content-Length header.
    Body(Vec<u8>),
    /// 200 without a Content-Length header; the body ends at close.
    NoLength(Vec<u8>),
    /// Bare status with an empty body.
    Status(u16),
}

pub struct TestServer {
    addr: SocketAddr,
    requests: Arc<AtomicUsize>,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub async fn start<I, S>(routes: I) -> Self
    where
        I: IntoIterator<Item = (S, Route)>,
        S: Into<String>,
    {
        let routes: Arc<HashMap<String, Route>> = Arc::new(
            routes
                .into_iter()
                .map(|(path, route)| (path.into(), route))
                .collect(),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(AtomicUsize::new(0));

        let counter = requests.clone();
        let handle = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let routes = routes.clone();
                let counter = counter.clone();
                tokio::spawn(async move {
                    let _ = serve(stream, &routes, &counter).await;
                });
            }
        });

        Self {
            addr,
            requests,
            handle,
        }
    }

    /// A URL on a port nothing is listening on.
    pub async fn unused_url() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}/", addr)
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Requests received so far, HEAD and GET alike.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn serve(
    mut stream: TcpStream,
    routes: &HashMap<String, Route>,
    counter: &AtomicUsize,
) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    counter.fetch_add(1, Ordering::SeqCst);

    let head = String::from_utf8_lossy(&buf);
    let mut parts = head.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();
    let with_body = method != "HEAD";

    let mut response = Vec::new();
    match routes.get(&path) {
        Some(Route::Body(body)) => {
            response.extend_from_slice(
                format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                )
                .as_bytes(),
            );
            if with_body {
                response.extend_from_slice(body);
            }
        }
        Some(Route::NoLength(body)) => {
            response.extend_from_slice(b"HTTP/1.1 200 OK\r\nConnection: close\r\n\r\n");
            if with_body {
                response.extend_from_slice(body);
            }
        }
        Some(Route::Status(code)) => {
            response.extend_from_slice(
                format!(
                    "HTTP/1.1 {} Test\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                    code
                )
                .as_bytes(),
            );
        }
        None => {
            response.extend_from_slice(
                b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            );
        }
    }

    stream.write_all(&response).await?;
    stream.shutdown().await
}

/// Fetcher that talks to the loopback server: plain http, no proxy, fast polling.
pub fn local_fetcher() -> Fetcher {
    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    Fetcher::default()
        .with_client(client)
        .with_policy(UrlPolicy::allow_any())
        .with_poll_interval(Duration::from_millis(5))
}

/// Builds an in-memory zip holding `entries` as stored files.
pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    use std::io::Write;

    let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored);
    for (name, data) in entries {
        zip.start_file(*name, options).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

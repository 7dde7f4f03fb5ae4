//! Shared helpers: a scripted mock upstream and a raw HTTP test client.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use openbanking_proxy::config::Config;
use openbanking_proxy::context::AppContext;
use openbanking_proxy::server;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub const UPSTREAM_PREFIX: &str = "/open-banking/products-services/v2";

/// Mock upstream that records each request head and answers with a
/// scripted reply.
pub struct MockUpstream {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MockUpstream {
    /// Answers every request with the same raw bytes.
    pub async fn start(reply: Vec<u8>) -> Self {
        Self::start_with(move |_| reply.clone()).await
    }

    /// Answers each request with whatever `responder` builds from its head.
    pub async fn start_with<F>(responder: F) -> Self
    where
        F: Fn(&str) -> Vec<u8> + Send + Sync + 'static,
    {
        let responder: Arc<dyn Fn(&str) -> Vec<u8> + Send + Sync> = Arc::new(responder);
        Self::spawn(Some(responder)).await
    }

    /// Accepts connections and reads requests but never replies.
    pub async fn silent() -> Self {
        Self::spawn(None).await
    }

    async fn spawn(responder: Option<Arc<dyn Fn(&str) -> Vec<u8> + Send + Sync>>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let recorded = Arc::clone(&recorded);
                let responder = responder.clone();
                tokio::spawn(async move {
                    let head = read_head(&mut socket).await;
                    recorded.lock().unwrap().push(head.clone());
                    match responder {
                        Some(responder) => {
                            let reply = responder(&head);
                            let _ = socket.write_all(&reply).await;
                            let _ = socket.shutdown().await;
                        }
                        None => tokio::time::sleep(Duration::from_secs(30)).await,
                    }
                });
            }
        });

        Self { addr, requests }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}{}", self.addr, UPSTREAM_PREFIX)
    }

    /// Full request heads in arrival order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    /// Request lines (`GET /path?query HTTP/1.1`) in arrival order.
    pub fn request_lines(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|head| head.lines().next().unwrap_or_default().to_string())
            .collect()
    }
}

async fn read_head(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = socket.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    String::from_utf8_lossy(&buf).into_owned()
}

pub fn json_reply(status: u16, reason: &str, body: &str) -> Vec<u8> {
    format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
    .into_bytes()
}

pub fn chunked_reply(chunks: &[&str]) -> Vec<u8> {
    let mut reply = String::from(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nTransfer-Encoding: chunked\r\n\r\n",
    );
    for chunk in chunks {
        reply.push_str(&format!("{:x}\r\n{}\r\n", chunk.len(), chunk));
    }
    reply.push_str("0\r\n\r\n");
    reply.into_bytes()
}

/// An address nothing is listening on.
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

pub fn test_config(base_url: &str) -> Config {
    let mut cfg = Config::default();
    cfg.listen_addr = "127.0.0.1:0".to_string();
    cfg.upstream.base_url = base_url.to_string();
    cfg
}

pub async fn start_server(cfg: Config) -> SocketAddr {
    start_server_with(AppContext::new(cfg)).await
}

pub async fn start_server_with(ctx: AppContext) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server::serve(listener, Arc::new(ctx)));
    addr
}

#[derive(Debug)]
pub struct HttpReply {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpReply {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

pub async fn get(addr: SocketAddr, path: &str) -> HttpReply {
    send(addr, "GET", path, &[]).await
}

pub async fn send(addr: SocketAddr, method: &str, path: &str, headers: &[(&str, &str)]) -> HttpReply {
    let mut raw = format!("{method} {path} HTTP/1.1\r\nHost: localhost\r\n");
    for (k, v) in headers {
        raw.push_str(&format!("{k}: {v}\r\n"));
    }
    raw.push_str("Connection: close\r\n\r\n");
    parse_reply(&send_raw(addr, raw.as_bytes()).await)
}

/// Writes raw bytes and reads until the server closes the connection.
pub async fn send_raw(addr: SocketAddr, raw: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(raw).await.unwrap();
    let mut out = Vec::new();
    stream.read_to_end(&mut out).await.unwrap();
    out
}

pub fn parse_reply(raw: &[u8]) -> HttpReply {
    let head_end = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("response has no header terminator");
    let head = std::str::from_utf8(&raw[..head_end]).unwrap();
    let mut lines = head.split("\r\n");
    let status = lines
        .next()
        .and_then(|line| line.split(' ').nth(1))
        .and_then(|code| code.parse().ok())
        .expect("invalid status line");
    let headers: HashMap<String, String> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();
    let mut body = raw[head_end + 4..].to_vec();
    if let Some(len) = headers.get("content-length").and_then(|v| v.parse::<usize>().ok()) {
        body.truncate(len);
    }
    HttpReply {
        status,
        headers,
        body,
    }
}

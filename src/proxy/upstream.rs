//! Upstream client
//!
//! Issues one GET per call against the open-banking service and returns the
//! parsed JSON body. Each call opens a fresh TCP connection and asks the
//! upstream to close it afterwards; there is no retry and no caching.

use crate::api::pagination::{PAGE_PARAM, PAGE_SIZE_PARAM, PaginationParams};
use crate::config::UpstreamConfig;
use bytes::{Buf, BytesMut};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use url::Url;

/// Default buffer size for reads
const BUFFER_SIZE: usize = 8192;

/// Upper bound on the upstream status line plus headers.
const MAX_HEAD_SIZE: usize = 64 * 1024;

/// Upper bound on an upstream response body.
const MAX_BODY_SIZE: usize = 16 * 1024 * 1024;

const USER_AGENT: &str = concat!("openbanking-proxy/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("invalid upstream url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("upstream url {0} has no host")]
    MissingHost(String),

    #[error("request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("failed to connect to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: std::io::Error,
    },

    #[error("i/o error while talking to {url}: {source}")]
    Io {
        url: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed response from {url}: {reason}")]
    Malformed { url: String, reason: String },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("response from {url} is not valid JSON: {source}")]
    InvalidJson {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl UpstreamError {
    /// True for failures talking to the upstream (network, timeout, framing,
    /// non-2xx status). Everything else is a local fault.
    pub fn is_communication_failure(&self) -> bool {
        matches!(
            self,
            UpstreamError::Timeout { .. }
                | UpstreamError::Connect { .. }
                | UpstreamError::Io { .. }
                | UpstreamError::Malformed { .. }
                | UpstreamError::Status { .. }
        )
    }
}

/// Failure while reading or framing a response, before the URL is attached.
#[derive(Debug)]
enum ExchangeFailure {
    Io(std::io::Error),
    Malformed(String),
}

impl From<std::io::Error> for ExchangeFailure {
    fn from(e: std::io::Error) -> Self {
        ExchangeFailure::Io(e)
    }
}

impl ExchangeFailure {
    fn malformed(reason: impl Into<String>) -> Self {
        ExchangeFailure::Malformed(reason.into())
    }

    fn with_url(self, url: &str) -> UpstreamError {
        match self {
            ExchangeFailure::Io(source) => UpstreamError::Io {
                url: url.to_string(),
                source,
            },
            ExchangeFailure::Malformed(reason) => UpstreamError::Malformed {
                url: url.to_string(),
                reason,
            },
        }
    }
}

/// A raw upstream response. Header names are lowercased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Long-lived client shared by every request. Immutable after construction.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    base_url: String,
    default_headers: Vec<(String, String)>,
    connect_timeout: Duration,
    request_timeout: Duration,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            default_headers: config
                .default_headers
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            connect_timeout: config.connect_timeout(),
            request_timeout: config.request_timeout(),
        }
    }

    /// Overrides both timeouts.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self.request_timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Builds `{base_url}{endpoint_path}?page=..&page-size=..`.
    pub fn endpoint_url(
        &self,
        endpoint_path: &str,
        params: PaginationParams,
    ) -> Result<Url, UpstreamError> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, endpoint_path))?;
        url.query_pairs_mut()
            .append_pair(PAGE_PARAM, &params.page.to_string())
            .append_pair(PAGE_SIZE_PARAM, &params.page_size.to_string());
        Ok(url)
    }

    /// Fetches one page of `endpoint_path` and parses the body as JSON.
    ///
    /// The status is checked before the body is looked at: any non-2xx answer
    /// is a [`UpstreamError::Status`] regardless of its content.
    pub async fn fetch(
        &self,
        endpoint_path: &str,
        params: PaginationParams,
    ) -> Result<Value, UpstreamError> {
        let url = self.endpoint_url(endpoint_path, params)?;

        tracing::info!(
            url = %url,
            page = params.page,
            page_size = params.page_size,
            "Forwarding request upstream"
        );

        let response = self.get(&url).await?;

        if !response.is_success() {
            return Err(UpstreamError::Status {
                url: url.to_string(),
                status: response.status,
            });
        }

        serde_json::from_slice(&response.body).map_err(|source| UpstreamError::InvalidJson {
            url: url.to_string(),
            source,
        })
    }

    /// Performs a single GET and returns the raw response.
    pub async fn get(&self, url: &Url) -> Result<UpstreamResponse, UpstreamError> {
        let display = url.to_string();
        let host = url
            .host_str()
            .ok_or_else(|| UpstreamError::MissingHost(display.clone()))?;
        let port = url.port_or_known_default().unwrap_or(80);
        let addr = format!("{}:{}", host, port);

        let stream = match timeout(self.connect_timeout, TcpStream::connect(&addr)).await {
            Err(_) => {
                return Err(UpstreamError::Timeout {
                    url: display,
                    timeout: self.connect_timeout,
                });
            }
            Ok(Err(source)) => return Err(UpstreamError::Connect { url: display, source }),
            Ok(Ok(stream)) => stream,
        };

        tracing::trace!(addr = %addr, "Connected to upstream");

        match timeout(self.request_timeout, self.exchange(stream, url)).await {
            Err(_) => Err(UpstreamError::Timeout {
                url: display,
                timeout: self.request_timeout,
            }),
            Ok(result) => result.map_err(|f| f.with_url(&display)),
        }
    }

    async fn exchange(
        &self,
        mut stream: TcpStream,
        url: &Url,
    ) -> Result<UpstreamResponse, ExchangeFailure> {
        let request_bytes = self.build_http_request(url);
        stream.write_all(&request_bytes).await?;
        stream.flush().await?;

        tracing::trace!("Request sent to upstream");

        read_http_response(&mut stream).await
    }

    /// Builds the raw GET request sent upstream.
    pub fn build_http_request(&self, url: &Url) -> Vec<u8> {
        let mut target = url.path().to_string();
        if let Some(query) = url.query() {
            target.push('?');
            target.push_str(query);
        }

        let mut buffer = Vec::with_capacity(256);
        buffer.extend_from_slice(format!("GET {} HTTP/1.1\r\n", target).as_bytes());

        if let Some(host) = url.host_str() {
            let host_value = match url.port() {
                Some(port) => format!("{}:{}", host, port),
                None => host.to_string(),
            };
            buffer.extend_from_slice(format!("Host: {}\r\n", host_value).as_bytes());
        }

        for (key, value) in &self.default_headers {
            buffer.extend_from_slice(format!("{}: {}\r\n", key, value).as_bytes());
        }

        buffer.extend_from_slice(format!("User-Agent: {}\r\n", USER_AGENT).as_bytes());
        buffer.extend_from_slice(b"Connection: close\r\n");
        buffer.extend_from_slice(b"\r\n");

        buffer
    }
}

/// Reads a full HTTP/1.1 response: head, then a body framed by
/// Content-Length, chunked encoding, or connection close.
async fn read_http_response<S>(stream: &mut S) -> Result<UpstreamResponse, ExchangeFailure>
where
    S: AsyncRead + Unpin,
{
    let mut buffer = BytesMut::with_capacity(BUFFER_SIZE);

    let head_end = loop {
        if let Some(end) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
            break end;
        }
        if buffer.len() > MAX_HEAD_SIZE {
            return Err(ExchangeFailure::malformed("response headers too large"));
        }
        let n = stream.read_buf(&mut buffer).await?;
        if n == 0 {
            return Err(ExchangeFailure::malformed(
                "connection closed before complete response headers received",
            ));
        }
    };

    let head = buffer.split_to(head_end + 4);
    let (status, headers) = parse_response_head(&head).map_err(ExchangeFailure::Malformed)?;

    let chunked = headers
        .get("transfer-encoding")
        .map(|v| v.to_ascii_lowercase().contains("chunked"))
        .unwrap_or(false);

    let body = if chunked {
        read_chunked_body(stream, &mut buffer).await?
    } else if let Some(cl) = headers.get("content-length") {
        let length = cl
            .parse::<usize>()
            .map_err(|_| ExchangeFailure::malformed(format!("invalid Content-Length {cl:?}")))?;
        read_sized_body(stream, &mut buffer, length).await?
    } else {
        read_until_close(stream, &mut buffer).await?
    };

    Ok(UpstreamResponse {
        status,
        headers,
        body,
    })
}

/// Parses a response status line and headers.
pub fn parse_response_head(head: &[u8]) -> Result<(u16, HashMap<String, String>), String> {
    let head = std::str::from_utf8(head).map_err(|_| "invalid UTF-8 in response headers".to_string())?;

    let mut lines = head.split("\r\n");

    let status_line = lines.next().filter(|l| !l.is_empty()).ok_or("empty response")?;
    let mut parts = status_line.splitn(3, ' ');
    let version = parts.next().unwrap_or_default();
    if !version.starts_with("HTTP/") {
        return Err(format!("invalid status line: {status_line}"));
    }
    let status = parts
        .next()
        .and_then(|code| code.parse::<u16>().ok())
        .filter(|code| (100..600).contains(code))
        .ok_or_else(|| format!("invalid status line: {status_line}"))?;

    let mut headers = HashMap::new();
    for line in lines {
        if line.is_empty() {
            break;
        }
        if let Some((key, value)) = line.split_once(':') {
            headers.insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }

    Ok((status, headers))
}

async fn read_sized_body<S>(
    stream: &mut S,
    buffer: &mut BytesMut,
    length: usize,
) -> Result<Vec<u8>, ExchangeFailure>
where
    S: AsyncRead + Unpin,
{
    if length > MAX_BODY_SIZE {
        return Err(ExchangeFailure::malformed("response body too large"));
    }

    while buffer.len() < length {
        let n = stream.read_buf(buffer).await?;
        if n == 0 {
            return Err(ExchangeFailure::malformed(
                "connection closed before complete body received",
            ));
        }
    }

    let body = buffer[..length].to_vec();
    buffer.advance(length);
    Ok(body)
}

async fn read_until_close<S>(stream: &mut S, buffer: &mut BytesMut) -> Result<Vec<u8>, ExchangeFailure>
where
    S: AsyncRead + Unpin,
{
    loop {
        if buffer.len() > MAX_BODY_SIZE {
            return Err(ExchangeFailure::malformed("response body too large"));
        }
        let n = stream.read_buf(buffer).await?;
        if n == 0 {
            break;
        }
    }
    Ok(buffer.split().to_vec())
}

async fn read_chunked_body<S>(stream: &mut S, buffer: &mut BytesMut) -> Result<Vec<u8>, ExchangeFailure>
where
    S: AsyncRead + Unpin,
{
    let mut decoder = ChunkedDecoder::default();
    loop {
        if decoder.feed(&buffer[..]).map_err(ExchangeFailure::Malformed)? {
            return Ok(decoder.into_body());
        }
        if buffer.len() > MAX_BODY_SIZE {
            return Err(ExchangeFailure::malformed("response body too large"));
        }
        let n = stream.read_buf(buffer).await?;
        if n == 0 {
            return Err(ExchangeFailure::malformed(
                "connection closed inside chunked body",
            ));
        }
    }
}

/// Incremental chunked-body decoder.
///
/// `feed` is called with the whole buffer received so far; complete chunks
/// are moved into the body once and skipped on later calls.
#[derive(Debug, Default)]
pub struct ChunkedDecoder {
    body: Vec<u8>,
    consumed: usize,
}

impl ChunkedDecoder {
    /// Returns `Ok(true)` once the terminating zero-size chunk has been seen.
    pub fn feed(&mut self, data: &[u8]) -> Result<bool, String> {
        loop {
            let rest = data.get(self.consumed..).unwrap_or_default();
            let Some(line_end) = rest.windows(2).position(|w| w == b"\r\n") else {
                return Ok(false);
            };

            let size_line = std::str::from_utf8(&rest[..line_end])
                .map_err(|_| "invalid chunk size line".to_string())?;
            let size_hex = size_line.split(';').next().unwrap_or_default().trim();
            let size = usize::from_str_radix(size_hex, 16)
                .map_err(|_| format!("invalid chunk size {size_hex:?}"))?;

            if size == 0 {
                return Ok(true);
            }
            if size > MAX_BODY_SIZE.saturating_sub(self.body.len()) {
                return Err("chunk too large".to_string());
            }

            let chunk_start = line_end + 2;
            let chunk_end = chunk_start
                .checked_add(size)
                .ok_or_else(|| "chunk too large".to_string())?;
            let frame_end = chunk_end
                .checked_add(2)
                .ok_or_else(|| "chunk too large".to_string())?;

            if rest.len() < frame_end {
                return Ok(false);
            }
            if &rest[chunk_end..frame_end] != b"\r\n" {
                return Err("chunk not terminated by CRLF".to_string());
            }

            self.body.extend_from_slice(&rest[chunk_start..chunk_end]);
            self.consumed += frame_end;
        }
    }

    pub fn into_body(self) -> Vec<u8> {
        self.body
    }
}

/// Decodes a complete chunked body.
///
/// Returns `Ok(None)` while the terminating zero-size chunk has not arrived.
/// Trailers after the last chunk are ignored.
pub fn decode_chunked(data: &[u8]) -> Result<Option<Vec<u8>>, String> {
    let mut decoder = ChunkedDecoder::default();
    let done = decoder.feed(data)?;
    Ok(done.then(|| decoder.into_body()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_chunked_joins_chunks() {
        let data = b"4\r\nWiki\r\n5;ext=1\r\npedia\r\n0\r\n\r\n";
        assert_eq!(decode_chunked(data).unwrap(), Some(b"Wikipedia".to_vec()));
    }

    #[test]
    fn decode_chunked_waits_for_terminator() {
        assert_eq!(decode_chunked(b"4\r\nWiki\r\n").unwrap(), None);
        assert_eq!(decode_chunked(b"4\r\nWi").unwrap(), None);
    }

    #[test]
    fn decode_chunked_rejects_garbage_size() {
        assert!(decode_chunked(b"zz\r\nabc\r\n").is_err());
    }

    #[test]
    fn decoder_resumes_after_partial_input() {
        let full = b"4\r\nWiki\r\n5\r\npedia\r\n0\r\n\r\n";
        let mut decoder = ChunkedDecoder::default();

        assert!(!decoder.feed(&full[..12]).unwrap());
        assert_eq!(decoder.consumed, 9);
        assert!(decoder.feed(full).unwrap());
        assert_eq!(decoder.into_body(), b"Wikipedia".to_vec());
    }

    #[tokio::test]
    async fn read_response_with_content_length() {
        let raw: &[u8] = b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\n{}";
        let mut stream = raw;
        let response = read_http_response(&mut stream).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, b"{}".to_vec());
    }

    #[tokio::test]
    async fn read_response_until_close() {
        let raw: &[u8] = b"HTTP/1.0 404 Not Found\r\nServer: mock\r\n\r\n{\"a\":1}";
        let mut stream = raw;
        let response = read_http_response(&mut stream).await.unwrap();
        assert_eq!(response.status, 404);
        assert_eq!(response.headers.get("server").unwrap(), "mock");
        assert_eq!(response.body, b"{\"a\":1}".to_vec());
    }
}

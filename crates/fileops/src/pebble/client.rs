//! Minimal async client for Pebble's files API.
//!
//! Each request opens a fresh HTTP/1.1 connection, over the daemon's Unix
//! socket by default or over TCP when Pebble was started with `--http`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use fileops_common::{Error, FileInfo, Result};
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::header::{CONTENT_TYPE, HOST, USER_AGENT};
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpStream, UnixStream};
use tracing::debug;

use super::multipart::{self, Part};
use super::wire::{
    check_path_results, format_permissions, Envelope, MakeDirItem, MakeDirsRequest, RemoveItem,
    RemoveRequest, WireFileInfo, WireOwner, WriteItem, WriteRequest,
};
use crate::options::{MakeDirOptions, PushOptions};

/// Socket file Pebble creates inside `$PEBBLE`.
pub const SOCKET_FILE_NAME: &str = ".pebble.socket";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// How to reach the daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
    Unix(PathBuf),
    /// `host:port`
    Tcp(String),
}

impl std::fmt::Display for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Transport::Unix(path) => write!(f, "unix:{}", path.display()),
            Transport::Tcp(addr) => write!(f, "tcp:{}", addr),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PebbleClient {
    transport: Transport,
    timeout: Duration,
}

impl PebbleClient {
    pub fn new(transport: Transport) -> Self {
        Self {
            transport,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn unix(socket_path: impl Into<PathBuf>) -> Self {
        Self::new(Transport::Unix(socket_path.into()))
    }

    /// Connect over TCP; `":4000"` means loopback port 4000.
    pub fn tcp(address: impl Into<String>) -> Self {
        let address = address.into();
        let address = if address.starts_with(':') {
            format!("127.0.0.1{}", address)
        } else {
            address
        };
        Self::new(Transport::Tcp(address))
    }

    /// Locate the socket from `PEBBLE_SOCKET`, or `$PEBBLE/.pebble.socket`.
    pub fn from_env() -> Result<Self> {
        if let Some(socket) = std::env::var_os("PEBBLE_SOCKET").filter(|s| !s.is_empty()) {
            return Ok(Self::unix(socket));
        }
        if let Some(dir) = std::env::var_os("PEBBLE").filter(|s| !s.is_empty()) {
            return Ok(Self::unix(Path::new(&dir).join(SOCKET_FILE_NAME)));
        }
        Err(Error::connection(
            "cannot locate Pebble: neither PEBBLE_SOCKET nor PEBBLE is set",
        ))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// True if the daemon reports itself healthy.
    pub async fn health(&self) -> Result<bool> {
        let result = self.json_request(Method::GET, "/v1/health", None::<&()>).await?;
        Ok(result.get("healthy").and_then(Value::as_bool).unwrap_or(false))
    }

    pub async fn list_files(
        &self,
        path: &str,
        pattern: Option<&str>,
        itself: bool,
    ) -> Result<Vec<FileInfo>> {
        let mut query = vec![("action", "list"), ("path", path)];
        if let Some(pattern) = pattern {
            query.push(("pattern", pattern));
        }
        if itself {
            query.push(("itself", "true"));
        }
        let uri = format!("/v1/files?{}", encode_query(&query));
        let result = self.json_request(Method::GET, &uri, None::<&()>).await?;

        let entries: Vec<WireFileInfo> = if result.is_null() {
            Vec::new()
        } else {
            serde_json::from_value(result)
                .map_err(|e| Error::protocol(format!("invalid file list: {}", e)))?
        };
        entries.into_iter().map(FileInfo::try_from).collect()
    }

    pub async fn make_dir(&self, path: &str, options: &MakeDirOptions) -> Result<()> {
        let request = MakeDirsRequest {
            action: "make-dirs",
            dirs: vec![MakeDirItem {
                path: path.to_string(),
                make_parents: options.make_parents,
                permissions: options.permissions.map(format_permissions),
                owner: WireOwner::from(&options.owner),
            }],
        };
        let result = self.json_request(Method::POST, "/v1/files", Some(&request)).await?;
        check_path_results(result)
    }

    pub async fn remove_path(&self, path: &str, recursive: bool) -> Result<()> {
        let request = RemoveRequest {
            action: "remove",
            paths: vec![RemoveItem {
                path: path.to_string(),
                recursive,
            }],
        };
        let result = self.json_request(Method::POST, "/v1/files", Some(&request)).await?;
        check_path_results(result)
    }

    pub async fn pull(&self, path: &str) -> Result<Vec<u8>> {
        let uri = format!(
            "/v1/files?{}",
            encode_query(&[("action", "read"), ("path", path)])
        );
        let request = build_request(Method::GET, &uri, None, Bytes::new())?;
        let response = self.send(request).await?;

        let boundary = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(multipart::boundary_from_content_type);
        let Some(boundary) = boundary else {
            // Whole-request failures come back as a plain JSON envelope
            let result = decode_envelope(&response)?.into_result()?;
            return Err(Error::protocol(format!(
                "expected a multipart response, got {}",
                result
            )));
        };

        let mut parts = multipart::decode(&boundary, response.body())?;
        let status = parts
            .iter()
            .position(|p| p.name == "response")
            .map(|i| parts.remove(i))
            .ok_or_else(|| Error::protocol("read response has no \"response\" part"))?;
        let envelope: Envelope = serde_json::from_slice(&status.data)
            .map_err(|e| Error::protocol(format!("invalid read response: {}", e)))?;
        check_path_results(envelope.into_result()?)?;

        parts
            .into_iter()
            .find(|p| p.name == "files" && p.filename.as_deref() == Some(path))
            .map(|p| p.data)
            .ok_or_else(|| Error::protocol(format!("read response has no content for {}", path)))
    }

    pub async fn push(&self, path: &str, data: &[u8], options: &PushOptions) -> Result<()> {
        let request = WriteRequest {
            action: "write",
            files: vec![WriteItem {
                path: path.to_string(),
                make_dirs: options.make_dirs,
                permissions: options.permissions.map(format_permissions),
                owner: WireOwner::from(&options.owner),
            }],
        };
        let metadata = serde_json::to_vec(&request)
            .map_err(|e| Error::protocol(format!("cannot encode write request: {}", e)))?;

        let boundary = multipart::new_boundary();
        let body = multipart::encode(
            &boundary,
            &[
                Part::field("request", "application/json", metadata),
                Part::file("files", path, data.to_vec()),
            ],
        );
        let request = build_request(
            Method::POST,
            "/v1/files",
            Some(&multipart::content_type(&boundary)),
            Bytes::from(body),
        )?;
        let response = self.send(request).await?;
        check_path_results(decode_envelope(&response)?.into_result()?)
    }

    async fn json_request<T: Serialize + ?Sized>(
        &self,
        method: Method,
        uri: &str,
        body: Option<&T>,
    ) -> Result<Value> {
        let (content_type, bytes) = match body {
            Some(body) => {
                let encoded = serde_json::to_vec(body)
                    .map_err(|e| Error::protocol(format!("cannot encode request: {}", e)))?;
                (Some("application/json"), Bytes::from(encoded))
            }
            None => (None, Bytes::new()),
        };
        let request = build_request(method, uri, content_type, bytes)?;
        let response = self.send(request).await?;
        decode_envelope(&response)?.into_result()
    }

    async fn send(&self, request: Request<Full<Bytes>>) -> Result<Response<Bytes>> {
        debug!("Pebble {} {} via {}", request.method(), request.uri(), self.transport);
        let attempt = async {
            match &self.transport {
                Transport::Unix(path) => {
                    let stream = UnixStream::connect(path).await.map_err(|e| {
                        Error::connection(format!("cannot connect to {}: {}", path.display(), e))
                    })?;
                    exchange(stream, request).await
                }
                Transport::Tcp(address) => {
                    let stream = TcpStream::connect(address).await.map_err(|e| {
                        Error::connection(format!("cannot connect to {}: {}", address, e))
                    })?;
                    exchange(stream, request).await
                }
            }
        };
        tokio::time::timeout(self.timeout, attempt)
            .await
            .map_err(|_| Error::connection(format!("request to {} timed out", self.transport)))?
    }
}

async fn exchange<S>(stream: S, request: Request<Full<Bytes>>) -> Result<Response<Bytes>>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (mut sender, connection) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
        .await
        .map_err(|e| Error::connection(format!("handshake failed: {}", e)))?;
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            debug!("Pebble connection closed with error: {}", e);
        }
    });

    let response = sender
        .send_request(request)
        .await
        .map_err(|e| Error::connection(format!("request failed: {}", e)))?;
    let (parts, body) = response.into_parts();
    let body = body
        .collect()
        .await
        .map_err(|e| Error::connection(format!("cannot read response body: {}", e)))?
        .to_bytes();
    Ok(Response::from_parts(parts, body))
}

fn build_request(
    method: Method,
    uri: &str,
    content_type: Option<&str>,
    body: Bytes,
) -> Result<Request<Full<Bytes>>> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(HOST, "localhost")
        .header(USER_AGENT, concat!("fileops/", env!("CARGO_PKG_VERSION")));
    if let Some(content_type) = content_type {
        builder = builder.header(CONTENT_TYPE, content_type);
    }
    builder
        .body(Full::new(body))
        .map_err(|e| Error::protocol(format!("cannot build request: {}", e)))
}

fn decode_envelope(response: &Response<Bytes>) -> Result<Envelope> {
    serde_json::from_slice(response.body()).map_err(|e| {
        Error::protocol(format!(
            "invalid response (HTTP {}): {}",
            response.status(),
            e
        ))
    })
}

/// Percent-encode query parameters (RFC 3986 unreserved characters pass
/// through).
fn encode_query(pairs: &[(&str, &str)]) -> String {
    pairs
        .iter()
        .map(|(key, value)| format!("{}={}", percent_encode(key), percent_encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

fn percent_encode(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' | b'/' => {
                encoded.push(byte as char)
            }
            other => encoded.push_str(&format!("%{:02X}", other)),
        }
    }
    encoded
}

//! Transport layer: control-socket discovery, HTTP framing, and the
//! per-resource clients.
//!
//! The service is normally reached over a Unix domain socket found under a
//! well-known directory pattern; an explicit `--api-url` or
//! `--api-proto/--api-host/--api-port` configuration switches to TCP via
//! `reqwest`. Either way a command performs exactly one remote call.

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use percent_encoding::{percent_encode, AsciiSet, CONTROLS};
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tracing::{debug, trace};

use crate::config::{Auth, Endpoint, GlobalConfig};
use crate::error::Error;
use crate::params::ParamMap;

/// Directory patterns searched for the control socket.
pub const SOCKET_PATTERNS: &[&str] = &["/var/run/volumed*"];

/// Socket filename within a matched directory.
pub const SOCKET_FILE: &str = "volumed.sock";

/// Existence probe issued against each discovery candidate.
const PROBE_PATH: &str = "/volume/info";

/// Escape set for path segments: the standard unsafe characters plus the
/// path separator and dot.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'%')
    .add(b'/')
    .add(b'.');

/// Escape set for query keys and values.
const QUERY: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'%')
    .add(b'&')
    .add(b'=')
    .add(b'+');

/// Percent-encode a user-supplied name for use as a path segment.
#[must_use]
pub fn encode_segment(name: &str) -> String {
    percent_encode(name.as_bytes(), SEGMENT).to_string()
}

/// Request methods the service understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Read.
    Get,
    /// Create.
    Post,
    /// Update.
    Put,
    /// Delete.
    Delete,
}

impl Method {
    /// Wire name of the method.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

/// Whether `status` counts as success for any call.
#[must_use]
pub fn status_acceptable(status: u16) -> bool {
    (200..=204).contains(&status) || status == 304
}

/// One request to the service, built once and consumed once.
#[derive(Debug, Clone)]
pub struct RemoteRequest {
    /// Request method.
    pub method: Method,
    /// Resource path, already segment-encoded.
    pub path: String,
    /// Query parameters, unencoded.
    pub query: Vec<(String, String)>,
    /// JSON body for create/update methods.
    pub body: Option<Value>,
}

impl RemoteRequest {
    /// Request with no query and no body.
    #[must_use]
    pub fn new(method: Method, path: String) -> Self {
        Self {
            method,
            path,
            query: Vec::new(),
            body: None,
        }
    }

    /// Attach query parameters.
    #[must_use]
    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    /// Attach a JSON body.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Path plus encoded query string.
    #[must_use]
    pub fn target(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let query = self
            .query
            .iter()
            .map(|(key, value)| {
                format!(
                    "{}={}",
                    percent_encode(key.as_bytes(), QUERY),
                    percent_encode(value.as_bytes(), QUERY)
                )
            })
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}", self.path, query)
    }
}

/// Status and body of a completed call.
#[derive(Debug, Clone)]
pub struct RemoteResponse {
    /// HTTP status code.
    pub status: u16,
    /// Body bytes; may be empty.
    pub body: Vec<u8>,
}

impl RemoteResponse {
    /// Decode the body as JSON; an empty body is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] when a non-empty body is not valid JSON.
    pub fn decode(&self) -> Result<Option<Value>, Error> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        serde_json::from_slice(&self.body)
            .map(Some)
            .map_err(Error::Decode)
    }
}

/// Authorization header value, when authentication is configured.
fn auth_header(auth: &Auth) -> Option<String> {
    match auth {
        Auth::None => None,
        Auth::Bearer(token) => Some(format!("Bearer {token}")),
        Auth::Basic { user, password } => {
            Some(format!("Basic {}", STANDARD.encode(format!("{user}:{password}"))))
        }
    }
}

/// Serialize a request into HTTP/1.1 bytes for the socket path.
fn build_request_bytes(request: &RemoteRequest, auth: &Auth) -> Vec<u8> {
    let body = request
        .body
        .as_ref()
        .map(std::string::ToString::to_string);

    let mut head = format!(
        "{} {} HTTP/1.1\r\nHost: volumed\r\nConnection: close\r\nAccept: application/json\r\n",
        request.method.as_str(),
        request.target()
    );
    if let Some(value) = auth_header(auth) {
        head.push_str("Authorization: ");
        head.push_str(&value);
        head.push_str("\r\n");
    }
    if let Some(body) = &body {
        head.push_str("Content-Type: application/json\r\n");
        head.push_str(&format!("Content-Length: {}\r\n", body.len()));
    }
    head.push_str("\r\n");

    let mut bytes = head.into_bytes();
    if let Some(body) = body {
        bytes.extend_from_slice(body.as_bytes());
    }
    bytes
}

/// Decode a `Transfer-Encoding: chunked` body.
fn dechunk(mut body: &[u8]) -> Result<Vec<u8>, Error> {
    let mut out = Vec::new();
    loop {
        let line_end = body
            .windows(2)
            .position(|w| w == b"\r\n")
            .ok_or_else(|| Error::Protocol("truncated chunked body".into()))?;
        let size_text = std::str::from_utf8(&body[..line_end])
            .map_err(|_| Error::Protocol("invalid chunk size".into()))?;
        let size_text = size_text.split(';').next().unwrap_or_default().trim();
        let size = usize::from_str_radix(size_text, 16)
            .map_err(|_| Error::Protocol("invalid chunk size".into()))?;
        body = &body[line_end + 2..];
        if size == 0 {
            return Ok(out);
        }
        if body.len() < size + 2 {
            return Err(Error::Protocol("truncated chunked body".into()));
        }
        out.extend_from_slice(&body[..size]);
        body = &body[size + 2..];
    }
}

/// Parse raw HTTP/1.1 response bytes into status and body.
fn parse_response_bytes(raw: &[u8]) -> Result<RemoteResponse, Error> {
    let split = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .ok_or_else(|| Error::Protocol("response missing header delimiter".into()))?;
    let head = String::from_utf8_lossy(&raw[..split]);
    let body = &raw[split + 4..];

    let mut lines = head.lines();
    let status_line = lines
        .next()
        .ok_or_else(|| Error::Protocol("response missing status line".into()))?;
    let status = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse::<u16>().ok())
        .ok_or_else(|| Error::Protocol(format!("invalid status line: {status_line}")))?;

    let mut content_length = None;
    let mut chunked = false;
    for line in lines {
        if let Some((key, value)) = line.split_once(':') {
            let key = key.trim().to_ascii_lowercase();
            let value = value.trim();
            if key == "content-length" {
                content_length = value.parse::<usize>().ok();
            } else if key == "transfer-encoding" && value.eq_ignore_ascii_case("chunked") {
                chunked = true;
            }
        }
    }

    let body = if chunked {
        dechunk(body)?
    } else if let Some(length) = content_length {
        body.get(..length)
            .ok_or_else(|| Error::Protocol("truncated response body".into()))?
            .to_vec()
    } else {
        body.to_vec()
    };

    Ok(RemoteResponse { status, body })
}

/// Perform one request over the control socket.
async fn unix_request(
    socket: &Path,
    request: &RemoteRequest,
    auth: &Auth,
) -> Result<RemoteResponse, Error> {
    let mut stream = UnixStream::connect(socket).await?;
    stream.write_all(&build_request_bytes(request, auth)).await?;

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await?;
    parse_response_bytes(&raw)
}

/// Candidate socket paths in probe order.
fn socket_candidates(socket_dir: Option<&Path>) -> Vec<PathBuf> {
    if let Some(dir) = socket_dir {
        return vec![dir.join(SOCKET_FILE)];
    }
    let mut candidates = Vec::new();
    for pattern in SOCKET_PATTERNS {
        candidates.extend(expand_pattern(Path::new(pattern)));
    }
    candidates
}

/// Expand a directory pattern whose last component may contain one `*`.
fn expand_pattern(pattern: &Path) -> Vec<PathBuf> {
    let Some(leaf) = pattern.file_name().and_then(|n| n.to_str()) else {
        return Vec::new();
    };
    let parent = pattern.parent().unwrap_or_else(|| Path::new("/"));

    let Some((prefix, suffix)) = leaf.split_once('*') else {
        return if pattern.is_dir() {
            vec![pattern.join(SOCKET_FILE)]
        } else {
            Vec::new()
        };
    };

    let Ok(entries) = std::fs::read_dir(parent) else {
        return Vec::new();
    };
    let mut matches: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(prefix) && name.ends_with(suffix))
        })
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .map(|path| path.join(SOCKET_FILE))
        .collect();
    matches.sort();
    matches
}

/// Probe a candidate socket with a lightweight existence call.
async fn probe(socket: &Path, auth: &Auth) -> bool {
    let request = RemoteRequest::new(Method::Get, PROBE_PATH.to_string());
    unix_request(socket, &request, auth).await.is_ok()
}

/// Find the first responding control socket.
async fn discover(socket_dir: Option<&Path>, auth: &Auth) -> Result<PathBuf, Error> {
    for candidate in socket_candidates(socket_dir) {
        if probe(&candidate, auth).await {
            debug!(socket = %candidate.display(), "control socket found");
            return Ok(candidate);
        }
        trace!(socket = %candidate.display(), "candidate did not respond");
    }
    Err(Error::Discovery)
}

/// The connection a command's one remote call goes through.
#[derive(Debug)]
pub enum Transport {
    /// HTTP over the discovered Unix domain socket.
    Unix {
        /// Active socket path.
        socket: PathBuf,
        /// Authentication to attach to requests.
        auth: Auth,
    },
    /// HTTP(S) over TCP to an explicit endpoint.
    Remote {
        /// Configured reqwest client (auth and TLS policy baked in).
        client: reqwest::Client,
        /// Endpoint base URL without trailing slash.
        base_url: String,
    },
}

impl Transport {
    /// Resolve the endpoint and return a ready transport.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Discovery`] when no local socket responds, or a
    /// configuration/build error for explicit endpoints.
    pub async fn connect(config: &GlobalConfig) -> Result<Self, Error> {
        match &config.endpoint {
            Endpoint::Local { socket_dir } => {
                let socket = discover(socket_dir.as_deref(), &config.auth).await?;
                Ok(Self::Unix {
                    socket,
                    auth: config.auth.clone(),
                })
            }
            endpoint => {
                let base_url = endpoint.base_url().unwrap_or_default();
                let client = build_remote_client(config)?;
                Ok(Self::Remote { client, base_url })
            }
        }
    }

    /// Perform one request, enforcing the acceptable status set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] for statuses outside 200-204/304, or the
    /// underlying connection failure.
    pub async fn request(&self, request: &RemoteRequest) -> Result<RemoteResponse, Error> {
        debug!(method = request.method.as_str(), path = %request.path, "sending request");
        let response = match self {
            Self::Unix { socket, auth } => unix_request(socket, request, auth).await?,
            Self::Remote { client, base_url } => remote_request(client, base_url, request).await?,
        };
        trace!(status = response.status, bytes = response.body.len(), "received response");

        if status_acceptable(response.status) {
            Ok(response)
        } else {
            let body = String::from_utf8_lossy(&response.body).trim().to_string();
            Err(Error::Transport {
                status: response.status,
                body: if body.is_empty() { "(empty)".to_string() } else { body },
            })
        }
    }
}

/// Build the reqwest client for explicit TCP endpoints.
fn build_remote_client(config: &GlobalConfig) -> Result<reqwest::Client, Error> {
    let mut headers = reqwest::header::HeaderMap::new();
    if let Some(value) = auth_header(&config.auth) {
        let value = reqwest::header::HeaderValue::from_str(&value)
            .map_err(|_| Error::usage("--api-token", "not a valid header value"))?;
        headers.insert(reqwest::header::AUTHORIZATION, value);
    }

    Ok(reqwest::Client::builder()
        .danger_accept_invalid_certs(config.insecure)
        .default_headers(headers)
        .build()?)
}

/// Perform one request against an explicit TCP endpoint.
async fn remote_request(
    client: &reqwest::Client,
    base_url: &str,
    request: &RemoteRequest,
) -> Result<RemoteResponse, Error> {
    let url = format!("{base_url}{}", request.target());
    let method = match request.method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Delete => reqwest::Method::DELETE,
    };

    let mut builder = client.request(method, &url);
    if let Some(body) = &request.body {
        builder = builder.json(body);
    }

    let response = builder.send().await?;
    let status = response.status().as_u16();
    let body = response.bytes().await?.to_vec();
    Ok(RemoteResponse { status, body })
}

/// A transport view scoped to one resource prefix.
///
/// The three instances (volume, profile, backup) are constructed once during
/// process setup and passed by reference to the command executors.
#[derive(Debug, Clone, Copy)]
pub struct ResourceClient<'a> {
    config: &'a GlobalConfig,
    prefix: &'static str,
}

impl<'a> ResourceClient<'a> {
    /// Client for the resource at `/<prefix>`.
    #[must_use]
    pub fn new(config: &'a GlobalConfig, prefix: &'static str) -> Self {
        Self { config, prefix }
    }

    async fn call(&self, request: RemoteRequest) -> Result<RemoteResponse, Error> {
        let transport = Transport::connect(self.config).await?;
        transport.request(&request).await
    }

    /// Create a resource; returns the decoded body.
    ///
    /// # Errors
    ///
    /// Returns an error if the call or decoding fails.
    pub async fn create(&self, params: ParamMap) -> Result<Option<Value>, Error> {
        let request = RemoteRequest::new(Method::Post, format!("/{}", self.prefix))
            .with_body(params.into_value());
        self.call(request).await?.decode()
    }

    /// Delete a named resource; returns the full response for inspection.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn delete(&self, name: &str, params: ParamMap) -> Result<RemoteResponse, Error> {
        let request = RemoteRequest::new(
            Method::Delete,
            format!("/{}/{}", self.prefix, encode_segment(name)),
        )
        .with_query(params.to_query());
        self.call(request).await
    }

    /// List resources; returns the decoded body.
    ///
    /// # Errors
    ///
    /// Returns an error if the call or decoding fails.
    pub async fn list(&self, params: ParamMap) -> Result<Option<Value>, Error> {
        let request = RemoteRequest::new(Method::Get, format!("/{}", self.prefix))
            .with_query(params.to_query());
        self.call(request).await?.decode()
    }

    /// Inspect a named resource; returns the decoded body.
    ///
    /// # Errors
    ///
    /// Returns an error if the call or decoding fails.
    pub async fn inspect(&self, name: &str, params: ParamMap) -> Result<Option<Value>, Error> {
        let request = RemoteRequest::new(
            Method::Get,
            format!("/{}/{}", self.prefix, encode_segment(name)),
        )
        .with_query(params.to_query());
        self.call(request).await?.decode()
    }

    /// Back up a named resource; returns the decoded body.
    ///
    /// # Errors
    ///
    /// Returns an error if the call or decoding fails.
    pub async fn backup(&self, name: &str, params: ParamMap) -> Result<Option<Value>, Error> {
        let request = RemoteRequest::new(
            Method::Put,
            format!("/{}/{}/backup", self.prefix, encode_segment(name)),
        )
        .with_body(params.into_value());
        self.call(request).await?.decode()
    }

    /// Resource-level information; returns the decoded body.
    ///
    /// # Errors
    ///
    /// Returns an error if the call or decoding fails.
    pub async fn info(&self, params: ParamMap) -> Result<Option<Value>, Error> {
        let request = RemoteRequest::new(Method::Get, format!("/{}/info", self.prefix))
            .with_query(params.to_query());
        self.call(request).await?.decode()
    }
}

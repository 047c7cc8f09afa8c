use std::net::SocketAddr;
use std::num::ParseFloatError;

use bytes::Bytes;

use crate::http::header::Headers;
use crate::http::parser::{BodyLength, ParseError, RequestHead};

/// Protocol versions strictly above this keep the connection open.
pub const KEEP_ALIVE_THRESHOLD: f32 = 1.05;

/// A request as observed by the server.
///
/// Built once the head and body of a request have been read, and dropped
/// when its response cycle ends.
#[derive(Debug, Clone, Default)]
pub struct Request {
    /// Method token, e.g. `GET`. Not validated.
    pub method: String,
    /// Request target as sent, query string included.
    pub path: String,
    /// Numeric protocol version, e.g. `1.1`.
    pub http_version: String,
    /// Request headers exactly as received.
    pub headers: Headers,
    /// Request body with any transfer framing removed.
    pub content: Bytes,
    /// Groups captured by the matching route pattern.
    ///
    /// Index 0 is the whole match; groups that did not take part in the
    /// match are empty strings. Empty when a default handler was used.
    pub path_match: Vec<String>,
    /// Peer address, when the transport can report one.
    pub remote_addr: Option<SocketAddr>,
}

/// Builder for constructing Request objects.
#[derive(Default)]
pub struct RequestBuilder {
    method: Option<String>,
    path: Option<String>,
    http_version: Option<String>,
    headers: Headers,
    content: Bytes,
    remote_addr: Option<SocketAddr>,
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.http_version = Some(version.into());
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key, value);
        self
    }

    pub fn content(mut self, content: impl Into<Bytes>) -> Self {
        self.content = content.into();
        self
    }

    pub fn remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    pub fn build(self) -> Result<Request, &'static str> {
        Ok(Request {
            method: self.method.ok_or("method missing")?,
            path: self.path.ok_or("path missing")?,
            http_version: self.http_version.unwrap_or_else(|| "1.1".to_string()),
            headers: self.headers,
            content: self.content,
            path_match: Vec::new(),
            remote_addr: self.remote_addr,
        })
    }
}

impl Request {
    pub fn from_head(head: RequestHead, content: Bytes, remote_addr: Option<SocketAddr>) -> Self {
        Self {
            method: head.method,
            path: head.path,
            http_version: head.http_version,
            headers: head.headers,
            content,
            path_match: Vec::new(),
            remote_addr,
        }
    }

    /// Retrieves the first header value stored under `key` (case-sensitive).
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key)
    }

    /// Body framing announced by the headers, resolved as the connection
    /// resolves it: an unparsable `Content-Length` is an error.
    pub fn body_length(&self) -> Result<BodyLength, ParseError> {
        BodyLength::from_headers(&self.headers)
    }

    /// Body decoded as UTF-8, with invalid sequences replaced.
    pub fn content_string(&self) -> String {
        String::from_utf8_lossy(&self.content).into_owned()
    }

    /// Returns capture group `index` of the matched route pattern.
    pub fn capture(&self, index: usize) -> Option<&str> {
        self.path_match.get(index).map(String::as_str)
    }

    /// Peer IP address as text, empty when unknown.
    pub fn remote_endpoint_address(&self) -> String {
        self.remote_addr
            .map(|addr| addr.ip().to_string())
            .unwrap_or_default()
    }

    /// Peer port, 0 when unknown.
    pub fn remote_endpoint_port(&self) -> u16 {
        self.remote_addr.map(|addr| addr.port()).unwrap_or(0)
    }

    /// Determines whether the connection should remain open after the response.
    ///
    /// Versions above 1.05 (that is, 1.1 and later) keep the connection
    /// alive; `Connection` headers are not consulted.
    pub fn keep_alive(&self) -> Result<bool, ParseFloatError> {
        keep_alive(&self.http_version)
    }
}

pub(crate) fn keep_alive(http_version: &str) -> Result<bool, ParseFloatError> {
    let version: f32 = http_version.trim().parse()?;
    Ok(version > KEEP_ALIVE_THRESHOLD)
}

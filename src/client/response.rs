use bytes::buf::Reader;
use bytes::{Buf, Bytes};

use crate::http::header::Headers;
use crate::http::parser::ResponseHead;

/// A response received by the client.
#[derive(Debug, Clone, Default)]
pub struct Response {
    /// Numeric protocol version, e.g. `1.1`.
    pub http_version: String,
    /// Status line after the protocol token, e.g. `200 OK`.
    pub status_code: String,
    pub headers: Headers,
    /// Body with any transfer framing removed.
    pub content: Bytes,
}

impl Response {
    pub fn from_head(head: ResponseHead, content: Bytes) -> Self {
        Self {
            http_version: head.http_version,
            status_code: head.status_code,
            headers: head.headers,
            content,
        }
    }

    /// Numeric status, if the status line starts with one.
    pub fn status(&self) -> Option<u16> {
        self.status_code.split(' ').next()?.parse().ok()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Reads the body as a stream.
    pub fn reader(&self) -> Reader<Bytes> {
        self.content.clone().reader()
    }

    /// Body decoded as UTF-8, with invalid sequences replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.content).into_owned()
    }
}

use std::io;

use bytes::{BufMut, Bytes, BytesMut};

use crate::http::writer::serialize_response;

/// HTTP status codes with canned reason phrases.
///
/// Handlers may also write any status line by hand through the
/// [`std::io::Write`] implementation of [`Response`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 201 Created
    Created,
    /// 204 No Content
    NoContent,
    /// 400 Bad Request
    BadRequest,
    /// 404 Not Found
    NotFound,
    /// 405 Method Not Allowed
    MethodNotAllowed,
    /// 500 Internal Server Error
    InternalServerError,
}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use frog::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::NotFound.as_u16(), 404);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::Created => 201,
            StatusCode::NoContent => 204,
            StatusCode::BadRequest => 400,
            StatusCode::NotFound => 404,
            StatusCode::MethodNotAllowed => 405,
            StatusCode::InternalServerError => 500,
        }
    }

    /// Returns the standard HTTP reason phrase for this status code.
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::Created => "Created",
            StatusCode::NoContent => "No Content",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::InternalServerError => "Internal Server Error",
        }
    }
}

/// Output buffer a handler writes its response into.
///
/// The connection flushes the buffer once after the handler returns, and
/// only if something was written. Nothing here adds framing on its own:
/// raw writes must carry their own status line and `Content-Length`.
#[derive(Debug, Default)]
pub struct Response {
    buffer: BytesMut,
}

impl Response {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Appends a complete `HTTP/1.1` response framed with `Content-Length`.
    ///
    /// # Example
    ///
    /// ```ignore
    /// response.send(StatusCode::Ok, &[("Content-Type", "text/plain")], "hello");
    /// ```
    pub fn send(&mut self, status: StatusCode, headers: &[(&str, &str)], body: impl AsRef<[u8]>) {
        let bytes = serialize_response(status, headers, body.as_ref());
        self.buffer.extend_from_slice(&bytes);
    }

    /// Shorthand for a 200 response without extra headers.
    pub fn ok(&mut self, body: impl AsRef<[u8]>) {
        self.send(StatusCode::Ok, &[], body);
    }

    /// Shorthand for a plain-text 400 response.
    pub fn bad_request(&mut self, message: impl AsRef<[u8]>) {
        self.send(StatusCode::BadRequest, &[], message);
    }

    /// Bytes written so far, without consuming them.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn into_bytes(self) -> Bytes {
        self.buffer.freeze()
    }
}

impl io::Write for Response {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

//! Byte-stream framing for HTTP/1.x heads and bodies.
//!
//! Parsing is permissive: a start line or header line with missing
//! delimiters leaves the corresponding fields empty instead of failing.
//! Only I/O problems, oversized heads and unusable length fields are
//! reported as errors.

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::http::chunked;
use crate::http::header::Headers;

/// Largest head (start line + headers) accepted before giving up.
pub const MAX_HEAD_SIZE: usize = 64 * 1024;

/// Version assumed when a request line ends in an empty protocol token.
pub const DEFAULT_VERSION: &str = "1.0";

const READ_CHUNK: usize = 4096;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("head exceeds {MAX_HEAD_SIZE} bytes")]
    HeadTooLarge,
    #[error("invalid Content-Length: {0:?}")]
    InvalidContentLength(String),
    #[error("invalid chunk size line: {0:?}")]
    InvalidChunkSize(String),
    #[error("connection closed mid-message")]
    UnexpectedEof,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Start line and headers of a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestHead {
    pub method: String,
    pub path: String,
    /// Numeric part of the protocol token, e.g. `1.1`.
    pub http_version: String,
    pub headers: Headers,
}

/// Status line and headers of a response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseHead {
    /// Numeric part of the protocol token, e.g. `1.1`.
    pub http_version: String,
    /// Everything after the protocol token, e.g. `200 OK`.
    pub status_code: String,
    pub headers: Headers,
}

/// How the body following a head is delimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyLength {
    Absent,
    Fixed(usize),
    Chunked,
}

impl BodyLength {
    /// Derives the body framing from headers.
    ///
    /// `Content-Length` wins over `Transfer-Encoding`; only the exact value
    /// `chunked` selects chunked decoding.
    pub fn from_headers(headers: &Headers) -> Result<Self, ParseError> {
        if let Some(value) = headers.get("Content-Length") {
            return value
                .trim()
                .parse::<usize>()
                .map(BodyLength::Fixed)
                .map_err(|_| ParseError::InvalidContentLength(value.to_string()));
        }

        if headers.get("Transfer-Encoding") == Some("chunked") {
            return Ok(BodyLength::Chunked);
        }

        Ok(BodyLength::Absent)
    }
}

/// Returns the index of the `\r\n\r\n` terminating a head.
pub fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

/// Parses a request head.
///
/// A start line lacking either separating space leaves every field empty,
/// headers included, so nothing downstream frames or routes it.
pub fn parse_request_head(head: &[u8]) -> RequestHead {
    let text = String::from_utf8_lossy(head);
    let mut lines = head_lines(&text);
    let mut parsed = RequestHead::default();

    // <method> SP <path> SP HTTP/<version>
    let start = lines.next().and_then(|line| {
        let (method, rest) = line.split_once(' ')?;
        let (path, protocol) = rest.split_once(' ')?;
        Some((method, path, protocol))
    });

    if let Some((method, path, protocol)) = start {
        parsed.method = method.to_string();
        parsed.path = path.to_string();
        parsed.http_version = protocol_version(protocol);
        parsed.headers = parse_header_lines(lines);
    }

    parsed
}

pub fn parse_response_head(head: &[u8]) -> ResponseHead {
    let text = String::from_utf8_lossy(head);
    let mut lines = head_lines(&text);
    let mut parsed = ResponseHead::default();

    // HTTP/<version> SP <status code and reason>
    if let Some((protocol, status)) = lines.next().and_then(|line| line.split_once(' ')) {
        parsed.http_version = protocol.strip_prefix("HTTP/").unwrap_or(protocol).to_string();
        parsed.status_code = status.to_string();
    }

    parsed.headers = parse_header_lines(lines);
    parsed
}

fn head_lines(text: &str) -> impl Iterator<Item = &str> {
    text.split('\n').map(|line| line.strip_suffix('\r').unwrap_or(line))
}

fn protocol_version(protocol: &str) -> String {
    let version = protocol.strip_prefix("HTTP/").unwrap_or(protocol);
    if version.is_empty() {
        return DEFAULT_VERSION.to_string();
    }
    version.to_string()
}

fn parse_header_lines<'a>(lines: impl Iterator<Item = &'a str>) -> Headers {
    let mut headers = Headers::new();

    // The first line without a colon ends the block; normally the blank line.
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            break;
        };
        headers.insert(name, value.strip_prefix(' ').unwrap_or(value));
    }

    headers
}

/// Reads until a full head is buffered and splits it off `buf`.
///
/// On success `buf` holds exactly the bytes received past the head
/// terminator. Returns `Ok(None)` when the peer closes cleanly before
/// sending anything.
pub async fn read_head<R>(reader: &mut R, buf: &mut BytesMut) -> Result<Option<BytesMut>, ParseError>
where
    R: AsyncRead + Unpin,
{
    loop {
        if let Some(end) = find_head_end(buf) {
            return Ok(Some(buf.split_to(end + 4)));
        }

        if buf.len() > MAX_HEAD_SIZE {
            return Err(ParseError::HeadTooLarge);
        }

        buf.reserve(READ_CHUNK);
        let n = reader.read_buf(buf).await?;

        if n == 0 {
            return if buf.is_empty() {
                Ok(None)
            } else {
                Err(ParseError::UnexpectedEof)
            };
        }
    }
}

pub async fn read_request_head<R>(
    reader: &mut R,
    buf: &mut BytesMut,
) -> Result<Option<RequestHead>, ParseError>
where
    R: AsyncRead + Unpin,
{
    Ok(read_head(reader, buf).await?.map(|head| parse_request_head(&head)))
}

pub async fn read_response_head<R>(reader: &mut R, buf: &mut BytesMut) -> Result<ResponseHead, ParseError>
where
    R: AsyncRead + Unpin,
{
    let head = read_head(reader, buf)
        .await?
        .ok_or(ParseError::UnexpectedEof)?;
    Ok(parse_response_head(&head))
}

/// Reads a body framed as `length`, consuming exactly its bytes from `buf`
/// and the stream. Anything buffered past the body stays in `buf`.
pub async fn read_body<R>(reader: &mut R, buf: &mut BytesMut, length: BodyLength) -> Result<Bytes, ParseError>
where
    R: AsyncRead + Unpin,
{
    match length {
        BodyLength::Absent => Ok(Bytes::new()),
        BodyLength::Fixed(n) => {
            fill_to(reader, buf, n).await?;
            Ok(buf.split_to(n).freeze())
        }
        BodyLength::Chunked => Ok(chunked::decode(reader, buf).await?.freeze()),
    }
}

/// Reads until `buf` holds at least `n` bytes.
pub(crate) async fn fill_to<R>(reader: &mut R, buf: &mut BytesMut, n: usize) -> Result<(), ParseError>
where
    R: AsyncRead + Unpin,
{
    while buf.len() < n {
        buf.reserve((n - buf.len()).min(READ_CHUNK * 16));
        if reader.read_buf(buf).await? == 0 {
            return Err(ParseError::UnexpectedEof);
        }
    }
    Ok(())
}

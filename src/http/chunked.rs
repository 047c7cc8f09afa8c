//! Chunked transfer-encoding.
//!
//! Each chunk is a hexadecimal size line, CRLF, that many bytes of data and
//! a trailing CRLF. A zero-sized chunk ends the body. Chunk extensions
//! (`size;name=value`) are ignored; trailers are not supported.

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::http::parser::{fill_to, ParseError};

/// Longest size line accepted, extensions included.
const MAX_SIZE_LINE: usize = 1024;

/// Decodes a chunked body from `buf` and `reader`.
///
/// Bytes received after the terminal chunk stay in `buf`.
pub async fn decode<R>(reader: &mut R, buf: &mut BytesMut) -> Result<BytesMut, ParseError>
where
    R: AsyncRead + Unpin,
{
    let mut body = BytesMut::new();

    loop {
        let line_end = read_size_line(reader, buf).await?;
        let size = parse_chunk_size(&buf[..line_end])?;
        buf.advance(line_end + 2);

        let needed = size
            .checked_add(2)
            .ok_or_else(|| ParseError::InvalidChunkSize(format!("{size:x}")))?;
        fill_to(reader, buf, needed).await?;

        body.extend_from_slice(&buf[..size]);
        // Data is followed by CRLF; it is dropped unchecked.
        buf.advance(needed);

        if size == 0 {
            return Ok(body);
        }
    }
}

async fn read_size_line<R>(reader: &mut R, buf: &mut BytesMut) -> Result<usize, ParseError>
where
    R: AsyncRead + Unpin,
{
    loop {
        if let Some(pos) = buf.windows(2).position(|w| w == b"\r\n") {
            return Ok(pos);
        }

        if buf.len() > MAX_SIZE_LINE {
            return Err(ParseError::InvalidChunkSize(
                String::from_utf8_lossy(&buf[..MAX_SIZE_LINE]).into_owned(),
            ));
        }

        buf.reserve(MAX_SIZE_LINE);
        if reader.read_buf(buf).await? == 0 {
            return Err(ParseError::UnexpectedEof);
        }
    }
}

/// Parses a chunk size line (without its CRLF).
pub fn parse_chunk_size(line: &[u8]) -> Result<usize, ParseError> {
    let text = String::from_utf8_lossy(line);
    let hex = text.split(';').next().unwrap_or("").trim();

    usize::from_str_radix(hex, 16).map_err(|_| ParseError::InvalidChunkSize(text.into_owned()))
}

/// Encodes `chunks` as a chunked body, including the terminal chunk.
///
/// Empty chunks are skipped since a zero size would end the body early.
pub fn encode<'a, I>(chunks: I) -> Vec<u8>
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut out = Vec::new();

    for chunk in chunks.into_iter().filter(|c| !c.is_empty()) {
        out.extend_from_slice(format!("{:x}\r\n", chunk.len()).as_bytes());
        out.extend_from_slice(chunk);
        out.extend_from_slice(b"\r\n");
    }

    out.extend_from_slice(b"0\r\n\r\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_line_ignores_extension() {
        assert_eq!(parse_chunk_size(b"1a;name=value").unwrap(), 26);
        assert_eq!(parse_chunk_size(b"FF").unwrap(), 255);
    }

    #[test]
    fn size_line_rejects_garbage() {
        assert!(matches!(parse_chunk_size(b"zz"), Err(ParseError::InvalidChunkSize(_))));
        assert!(matches!(parse_chunk_size(b""), Err(ParseError::InvalidChunkSize(_))));
    }

    #[tokio::test]
    async fn decode_stops_after_terminal_chunk() {
        let mut input: &[u8] = b"";
        let mut buf = BytesMut::from(&b"5\r\nhello\r\n0\r\n\r\nnext"[..]);

        let body = decode(&mut input, &mut buf).await.unwrap();
        assert_eq!(&body[..], b"hello");
        assert_eq!(&buf[..], b"next");
    }
}

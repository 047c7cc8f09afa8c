use std::io;

use crate::http::parser::ParseError;

/// Errors produced by the HTTP client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The `host[:port]` string or URL could not be used.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Resolve, connect, read or write failure.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// The response could not be framed.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// The request did not complete within the client timeout.
    #[error("request timed out")]
    Timeout,

    /// The peer closed the connection before the exchange completed.
    #[error("connection closed")]
    ConnectionClosed,
}

//! HTTP/1.1 client.
//!
//! A [`Client`] talks to a single `host[:port]`. The connection is opened
//! on first use and reused across requests; a failed request marks it as
//! errored so the next request reconnects. Failed requests are never
//! retried automatically.

pub mod engine;
pub mod error;
pub mod response;

pub use engine::{Client, DEFAULT_PORT};
pub use error::ClientError;
pub use response::Response;

//! Transport capability shared by the server and the client.
//!
//! The protocol engine only needs a byte stream that can report its peer.
//! Plain TCP is provided; in-memory pipes are supported for tests, and a
//! TLS stream can be plugged in by implementing [`Transport`].

pub mod transport;

pub use transport::{Connector, TcpConnector, Transport};

//! Frog - embeddable HTTP/1.x server and client
//!
//! Core library: protocol framing, routing server and request engine,
//! built directly on tokio sockets.

pub mod client;
pub mod config;
pub mod demo;
pub mod http;
pub mod net;
pub mod server;

pub use client::Client;
pub use http::request::Request;
pub use http::response::{Response, StatusCode};
pub use server::{Server, ServerHandle};

//! HTTP/1.x protocol engine.
//!
//! The framing code here is shared by the server and the client; the
//! connection state machine is server-side only.
//!
//! - **`header`**: multi-valued, case-sensitive header map
//! - **`parser`**: head framing, start-line/header parsing and body-length resolution
//! - **`chunked`**: chunked transfer-encoding codec
//! - **`request`**: the request a server handler sees
//! - **`response`**: the output buffer a server handler writes into
//! - **`writer`**: response serialization and flushing
//! - **`connection`**: per-connection lifecycle with phase timeouts
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │ ReadingHead │ ← request timer armed
//!        └──────┬──────┘
//!               │ Head parsed, body length resolved
//!               ▼
//!        ┌─────────────┐
//!        │ ReadingBody │ ← content timer armed when a body is announced
//!        └──────┬──────┘
//!               │ Body complete
//!               ▼
//!        ┌─────────────┐
//!        │ Dispatching │ ← route lookup, handler on the blocking pool
//!        └──────┬──────┘
//!               │ Handler returned
//!               ▼
//!     ┌─────────────────┐
//!     │ WritingResponse │ ← flush only if the handler wrote something
//!     └────────┬────────┘
//!              │
//!              ▼
//!        ┌───────────┐
//!        │ KeepAlive │ ── version > 1.05 → ReadingHead
//!        └─────┬─────┘
//!              └─ otherwise → Closed
//! ```
//!
//! Any error, timeout included, abandons the connection without a response.

pub mod chunked;
pub mod connection;
pub mod header;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;

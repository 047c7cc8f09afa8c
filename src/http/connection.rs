use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use bytes::BytesMut;
use tokio::io::AsyncWriteExt;
use tokio::time::Instant;

use crate::http::parser::{self, BodyLength, RequestHead};
use crate::http::request::{self, Request};
use crate::http::response::Response;
use crate::http::writer::ResponseWriter;
use crate::net::Transport;
use crate::server::router::RouteTable;

/// Per-phase deadlines. `None` disables the timer for that phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timeouts {
    /// Covers reading a request head.
    pub request: Option<Duration>,
    /// Covers reading a body, and running the handler plus flushing.
    pub content: Option<Duration>,
}

impl Timeouts {
    /// Builds timeouts from whole seconds, 0 meaning disabled.
    pub fn from_secs(request: u64, content: u64) -> Self {
        let secs = |s: u64| (s > 0).then(|| Duration::from_secs(s));
        Self {
            request: secs(request),
            content: secs(content),
        }
    }
}

/// One server-side connection, driven as a single task.
///
/// The task is the connection's serialization point: its phases and
/// timers never run concurrently with each other.
pub struct Connection<T: Transport> {
    stream: T,
    buffer: BytesMut,
    state: ConnectionState,
    routes: Arc<RouteTable>,
    timeouts: Timeouts,
    peer: Option<SocketAddr>,
}

pub enum ConnectionState {
    ReadingHead,
    ReadingBody(RequestHead, BodyLength),
    Dispatching(Request),
    WritingResponse(ResponseWriter, String, Option<Instant>), // version, deadline
    KeepAlive(String),
    Closed,
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Head,
    Body,
    Response,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Head => "request head",
            Phase::Body => "request body",
            Phase::Response => "response",
        })
    }
}

impl<T: Transport> Connection<T> {
    pub fn new(stream: T, routes: Arc<RouteTable>, timeouts: Timeouts) -> Self {
        let peer = match stream.peer_addr() {
            Ok(addr) => Some(addr),
            Err(e) => {
                tracing::debug!(error = %e, "peer address unavailable");
                None
            }
        };

        Self {
            stream,
            buffer: BytesMut::with_capacity(4096),
            state: ConnectionState::ReadingHead,
            routes,
            timeouts,
            peer,
        }
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Serves requests until the peer leaves, the protocol version asks
    /// for a close, or an error abandons the connection.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        loop {
            let state = std::mem::replace(&mut self.state, ConnectionState::Closed);

            self.state = match state {
                ConnectionState::ReadingHead => match self.read_head().await? {
                    Some(head) => {
                        let length = BodyLength::from_headers(&head.headers)?;
                        ConnectionState::ReadingBody(head, length)
                    }
                    // Client closed connection
                    None => ConnectionState::Closed,
                },

                ConnectionState::ReadingBody(head, length) => {
                    let content = self.read_body(length).await?;
                    ConnectionState::Dispatching(Request::from_head(head, content, self.peer))
                }

                ConnectionState::Dispatching(req) => self.dispatch(req).await?,

                ConnectionState::WritingResponse(mut writer, version, deadline) => {
                    if !writer.is_empty() {
                        let outcome = guard(deadline, writer.write_to_stream(&mut self.stream)).await;
                        match outcome {
                            Some(result) => result.context("flushing response")?,
                            None => return Err(self.expire(Phase::Response).await),
                        }
                    }
                    ConnectionState::KeepAlive(version)
                }

                ConnectionState::KeepAlive(version) => {
                    let keep_alive = request::keep_alive(&version)
                        .with_context(|| format!("invalid protocol version {version:?}"))?;

                    if keep_alive {
                        ConnectionState::ReadingHead
                    } else {
                        ConnectionState::Closed
                    }
                }

                ConnectionState::Closed => break,
            };
        }

        Ok(())
    }

    async fn read_head(&mut self) -> anyhow::Result<Option<RequestHead>> {
        let deadline = deadline(self.timeouts.request);
        let outcome = guard(
            deadline,
            parser::read_request_head(&mut self.stream, &mut self.buffer),
        )
        .await;

        match outcome {
            Some(result) => Ok(result?),
            None => Err(self.expire(Phase::Head).await),
        }
    }

    async fn read_body(&mut self, length: BodyLength) -> anyhow::Result<bytes::Bytes> {
        if length == BodyLength::Absent {
            return Ok(bytes::Bytes::new());
        }

        let deadline = deadline(self.timeouts.content);
        let outcome = guard(
            deadline,
            parser::read_body(&mut self.stream, &mut self.buffer, length),
        )
        .await;

        match outcome {
            Some(result) => Ok(result?),
            None => Err(self.expire(Phase::Body).await),
        }
    }

    async fn dispatch(&mut self, mut req: Request) -> anyhow::Result<ConnectionState> {
        tracing::debug!(
            peer = ?self.peer,
            method = %req.method,
            path = %req.path,
            version = %req.http_version,
            "Request received"
        );

        let version = req.http_version.clone();
        let Some(route) = self.routes.resolve(&req.method, &req.path) else {
            tracing::debug!(method = %req.method, path = %req.path, "No handler for request");
            return Ok(ConnectionState::KeepAlive(version));
        };

        let deadline = deadline(self.timeouts.content);
        let handler = route.handler().clone();
        req.path_match = route.captures().to_vec();

        // Handlers may block; keep them off the reactor workers.
        let task = tokio::task::spawn_blocking(move || {
            let mut response = Response::new();
            handler(&mut response, &req).map(|()| response)
        });

        let response = match guard(deadline, task).await {
            Some(joined) => joined
                .map_err(|e| anyhow::anyhow!("handler panicked: {e}"))?
                .context("handler failed")?,
            None => return Err(self.expire(Phase::Response).await),
        };

        let writer = ResponseWriter::new(response.into_bytes());
        Ok(ConnectionState::WritingResponse(writer, version, deadline))
    }

    /// Shuts the socket down after a missed deadline.
    async fn expire(&mut self, phase: Phase) -> anyhow::Error {
        if let Err(e) = self.stream.shutdown().await {
            tracing::trace!(error = %e, "shutdown after timeout failed");
        }
        anyhow::anyhow!("{phase} timed out")
    }
}

fn deadline(limit: Option<Duration>) -> Option<Instant> {
    limit.map(|d| Instant::now() + d)
}

/// Runs `fut` to completion or until `deadline`; `None` means it expired.
async fn guard<F: Future>(deadline: Option<Instant>, fut: F) -> Option<F::Output> {
    match deadline {
        Some(at) => tokio::time::timeout_at(at, fut).await.ok(),
        None => Some(fut.await),
    }
}

//! Routing HTTP server.
//!
//! Handlers are registered on a [`Server`] before it starts. Starting
//! compiles the routes into an immutable table shared by every
//! connection, binds the listener and serves until stopped.
//!
//! ```ignore
//! let mut server = Server::new(8080, 4, 5, 300);
//! server.resource("^/id/([0-9]+)$", "GET", |response, request| {
//!     response.ok(request.capture(1).unwrap_or_default());
//!     Ok(())
//! });
//! server.start()?;
//! ```

pub mod listener;
pub mod router;

use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use anyhow::Context;
use tokio::net::{TcpListener, TcpSocket};
use tokio::sync::watch;

use crate::config::ServerConfig;
use crate::http::connection::Timeouts;
use crate::http::request::Request;
use crate::http::response::Response;
use crate::server::router::{Handler, RouteBuilder, RouteTable};

const LISTEN_BACKLOG: u32 = 1024;

pub struct Server {
    /// Listener settings; may be changed until the server starts.
    pub config: ServerConfig,
    routes: RouteBuilder,
    shutdown: Arc<watch::Sender<bool>>,
}

/// Stops a server from any thread or task.
#[derive(Clone)]
pub struct ServerHandle {
    shutdown: Arc<watch::Sender<bool>>,
}

impl ServerHandle {
    /// Closes the listener and drops every open connection.
    pub fn stop(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.shutdown.borrow()
    }
}

impl Server {
    /// Creates a server for `port` with `num_threads` workers and the two
    /// phase timeouts in seconds (0 disables a timeout).
    pub fn new(port: u16, num_threads: usize, timeout_request: u64, timeout_content: u64) -> Self {
        Self::with_config(ServerConfig {
            port,
            threads: num_threads,
            timeout_request,
            timeout_content,
            ..ServerConfig::default()
        })
    }

    pub fn with_config(config: ServerConfig) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            config,
            routes: RouteBuilder::new(),
            shutdown: Arc::new(shutdown),
        }
    }

    /// Registers `handler` for requests whose method is `method` and whose
    /// whole path matches the regular expression `pattern`.
    pub fn resource<F>(&mut self, pattern: &str, method: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Response, &Request) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.routes.add(pattern, method, Arc::new(handler) as Handler);
        self
    }

    /// Registers the fallback for `method` when no pattern matches.
    pub fn default_resource<F>(&mut self, method: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Response, &Request) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.routes.add_default(method, Arc::new(handler) as Handler);
        self
    }

    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            shutdown: self.shutdown.clone(),
        }
    }

    /// Builds the multi-thread runtime `start` runs on, with
    /// `config.threads` workers.
    pub fn runtime(&self) -> anyhow::Result<tokio::runtime::Runtime> {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.threads.max(1))
            .thread_name("frog-worker")
            .enable_all()
            .build()
            .context("building runtime")
    }

    /// Runs the server on its own runtime, blocking until
    /// [`ServerHandle::stop`] is called.
    pub fn start(self) -> anyhow::Result<()> {
        let runtime = self.runtime()?;
        let result = runtime.block_on(self.run());
        // Handlers still running on the blocking pool are not waited for.
        runtime.shutdown_background();
        result
    }

    /// Binds and serves on the current runtime.
    pub async fn run(self) -> anyhow::Result<()> {
        self.bind().await?.serve().await
    }

    /// Serves until `signal` resolves, then stops as [`ServerHandle::stop`]
    /// does.
    pub async fn run_until<F: Future>(self, signal: F) -> anyhow::Result<()> {
        let listening = self.bind().await?;
        let handle = listening.handle();

        tokio::select! {
            res = listening.serve() => res,
            _ = signal => {
                tracing::info!("Shutdown signal received");
                handle.stop();
                Ok(())
            }
        }
    }

    /// Compiles the routes and binds the listener without serving yet.
    pub async fn bind(self) -> anyhow::Result<Listening> {
        let routes = Arc::new(self.routes.compile()?);
        let timeouts = Timeouts::from_secs(self.config.timeout_request, self.config.timeout_content);

        let ip: IpAddr = if self.config.address.is_empty() {
            Ipv4Addr::UNSPECIFIED.into()
        } else {
            self.config
                .address
                .parse()
                .with_context(|| format!("invalid bind address {:?}", self.config.address))?
        };
        let addr = SocketAddr::new(ip, self.config.port);

        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        socket.set_reuseaddr(self.config.reuse_address)?;
        socket
            .bind(addr)
            .with_context(|| format!("binding {addr}"))?;
        let listener = socket.listen(LISTEN_BACKLOG)?;

        tracing::debug!(routes = ?routes, "Routes compiled");

        Ok(Listening {
            local_addr: listener.local_addr()?,
            listener,
            routes,
            timeouts,
            shutdown: self.shutdown,
        })
    }
}

/// A bound server that has not started accepting yet.
pub struct Listening {
    listener: TcpListener,
    local_addr: SocketAddr,
    routes: Arc<RouteTable>,
    timeouts: Timeouts,
    shutdown: Arc<watch::Sender<bool>>,
}

impl Listening {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            shutdown: self.shutdown.clone(),
        }
    }

    /// Accepts and serves connections until stopped.
    pub async fn serve(self) -> anyhow::Result<()> {
        let receiver = self.shutdown.subscribe();
        let result = listener::run(self.listener, self.routes, self.timeouts, receiver).await;
        drop(self.shutdown);
        result
    }
}

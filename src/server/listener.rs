use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::http::connection::{Connection, Timeouts};
use crate::server::router::RouteTable;

/// Accepts connections until `shutdown` flips to `true`.
///
/// Every connection runs as its own task; a failure ends that task only.
pub async fn run(
    listener: TcpListener,
    routes: Arc<RouteTable>,
    timeouts: Timeouts,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    info!("Listening on {}", listener.local_addr()?);

    loop {
        let accepted = tokio::select! {
            res = listener.accept() => res,
            _ = stopped(&mut shutdown) => {
                info!("Listener stopped");
                return Ok(());
            }
        };

        let (socket, peer) = match accepted {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "Accept failed");
                continue;
            }
        };

        if let Err(e) = socket.set_nodelay(true) {
            debug!(peer = %peer, error = %e, "Could not disable Nagle");
        }
        debug!("Accepted connection from {}", peer);

        let routes = routes.clone();
        let mut conn_shutdown = shutdown.clone();
        tokio::spawn(async move {
            let mut conn = Connection::new(socket, routes, timeouts);
            tokio::select! {
                res = conn.run() => match res {
                    Ok(()) => debug!("Connection from {} closed", peer),
                    Err(e) => warn!("Connection error from {}: {:#}", peer, e),
                },
                _ = stopped(&mut conn_shutdown) => {
                    debug!("Connection from {} dropped on shutdown", peer);
                }
            }
        });
    }
}

/// Resolves once a stop was requested or the stop switch is gone.
pub(crate) async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

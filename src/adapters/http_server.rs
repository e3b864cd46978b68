//! Listener lifecycle for the HTTP API.
//!
//! [`HttpServer`] binds the configured address and runs its own accept loop on
//! a background task. Every connection is served by `hyper-util`'s auto
//! (HTTP/1.1 + HTTP/2) builder on a task tracked in a `JoinSet`, so shutdown
//! can first ask each connection to finish gracefully and then abort whatever
//! is left once the drain window closes. The returned [`ServerHandle`]
//! publishes every [`ServerState`] transition on a `watch` channel.
use std::{fmt, io, net::SocketAddr, time::Duration};

use axum::{Router, extract::ConnectInfo, http::Request};
use hyper::body::Incoming;
use hyper_util::{
    rt::{TokioExecutor, TokioIo, TokioTimer},
    server::conn::auto,
    service::TowerToHyperService,
};
use tokio::{
    net::{TcpListener, TcpStream},
    sync::watch,
    task::{JoinError, JoinHandle, JoinSet},
};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use crate::config::models::ServerConfig;

/// Pause after a non-transient accept error (for example `EMFILE`)
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Lifecycle of a server instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Created,
    Starting,
    Running,
    ShuttingDown,
    Stopped,
    Failed,
}

impl ServerState {
    /// No further transitions follow
    pub fn is_terminal(self) -> bool {
        matches!(self, ServerState::Stopped | ServerState::Failed)
    }
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ServerState::Created => "created",
            ServerState::Starting => "starting",
            ServerState::Running => "running",
            ServerState::ShuttingDown => "shutting_down",
            ServerState::Stopped => "stopped",
            ServerState::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind HTTP listener on {addr}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("HTTP server task failed")]
    Join(#[source] JoinError),

    #[error("In-flight requests did not drain within {0:?}, connections were force-closed")]
    DrainTimeout(Duration),
}

/// An HTTP server that has not been started yet
pub struct HttpServer {
    config: ServerConfig,
    router: Router,
    state: watch::Sender<ServerState>,
}

impl HttpServer {
    pub fn new(config: ServerConfig, router: Router) -> Self {
        let (state, _) = watch::channel(ServerState::Created);
        Self {
            config,
            router,
            state,
        }
    }

    pub fn state(&self) -> ServerState {
        *self.state.borrow()
    }

    /// Observe state transitions, including those made by the handle
    pub fn subscribe(&self) -> watch::Receiver<ServerState> {
        self.state.subscribe()
    }

    /// Bind the listener and start serving in the background.
    ///
    /// A bind failure moves the server to [`ServerState::Failed`].
    pub async fn start(self) -> Result<ServerHandle, ServerError> {
        self.state.send_replace(ServerState::Starting);

        let addr = self.config.address();
        let bound = match TcpListener::bind((self.config.host.as_str(), self.config.port)).await {
            Ok(listener) => listener.local_addr().map(|local| (listener, local)),
            Err(e) => Err(e),
        };
        let (listener, local_addr) = match bound {
            Ok(bound) => bound,
            Err(source) => {
                tracing::error!(address = %addr, error = %source, "Failed to bind HTTP listener");
                self.state.send_replace(ServerState::Failed);
                return Err(ServerError::Bind { addr, source });
            }
        };

        let shutdown = CancellationToken::new();
        let force_close = CancellationToken::new();
        let task = tokio::spawn(accept_loop(
            listener,
            self.router,
            self.config.idle_timeout,
            shutdown.clone(),
            force_close.clone(),
        ));

        tracing::info!(
            address = %local_addr,
            read_timeout = ?self.config.read_timeout,
            write_timeout = ?self.config.write_timeout,
            idle_timeout = ?self.config.idle_timeout,
            "HTTP server listening"
        );
        self.state.send_replace(ServerState::Running);

        Ok(ServerHandle {
            local_addr,
            shutdown,
            force_close,
            task: Some(task),
            state: self.state,
        })
    }
}

/// Accept until `shutdown` fires, then wait for the open connections to
/// finish or for `force_close` to abort them.
async fn accept_loop(
    listener: TcpListener,
    router: Router,
    idle_timeout: Duration,
    shutdown: CancellationToken,
    force_close: CancellationToken,
) {
    let mut builder = auto::Builder::new(TokioExecutor::new());
    // hyper arms this timer whenever it waits for a request head, including
    // between keep-alive requests, so it bounds idle HTTP/1 connections
    builder
        .http1()
        .timer(TokioTimer::new())
        .header_read_timeout(idle_timeout);

    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => {
                let (stream, remote_addr) = match accepted {
                    Ok(conn) => conn,
                    Err(e) if is_connection_error(&e) => continue,
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to accept connection");
                        tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                        continue;
                    }
                };

                connections.spawn(serve_connection(
                    builder.clone(),
                    stream,
                    remote_addr,
                    router.clone(),
                    shutdown.clone(),
                ));
            }
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
        }
    }

    drop(listener);
    tracing::debug!(connections = connections.len(), "Listener closed, draining connections");

    let drained = tokio::select! {
        _ = drain(&mut connections) => true,
        _ = force_close.cancelled() => false,
    };

    if !drained {
        tracing::warn!(connections = connections.len(), "Force-closing connections");
        connections.shutdown().await;
    }
}

async fn drain(connections: &mut JoinSet<()>) {
    while connections.join_next().await.is_some() {}
}

async fn serve_connection(
    builder: auto::Builder<TokioExecutor>,
    stream: TcpStream,
    remote_addr: SocketAddr,
    router: Router,
    shutdown: CancellationToken,
) {
    if let Err(e) = stream.set_nodelay(true) {
        tracing::debug!(remote = %remote_addr, error = %e, "Failed to set TCP_NODELAY");
    }

    let service = router.map_request(move |mut req: Request<Incoming>| {
        req.extensions_mut().insert(ConnectInfo(remote_addr));
        req
    });
    let conn = builder.serve_connection(TokioIo::new(stream), TowerToHyperService::new(service));
    tokio::pin!(conn);

    let result = tokio::select! {
        result = conn.as_mut() => result,
        _ = shutdown.cancelled() => {
            conn.as_mut().graceful_shutdown();
            conn.await
        }
    };

    if let Err(e) = result {
        tracing::debug!(remote = %remote_addr, error = %e, "Connection closed with error");
    }
}

/// Per-connection failures that say nothing about the listener itself
fn is_connection_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
    )
}

/// Control over a running server.
///
/// Dropping the handle without calling [`ServerHandle::shutdown`] still stops
/// accepting connections.
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: CancellationToken,
    force_close: CancellationToken,
    task: Option<JoinHandle<()>>,
    state: watch::Sender<ServerState>,
}

impl ServerHandle {
    /// Address actually bound, useful when the configured port is `0`
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn state(&self) -> ServerState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ServerState> {
        self.state.subscribe()
    }

    /// Resolve once the server task exits without being asked to.
    ///
    /// Cancel safe; never resolves after the task has been reaped.
    pub async fn stopped(&mut self) -> Result<(), ServerError> {
        let Some(task) = self.task.as_mut() else {
            return std::future::pending().await;
        };

        let outcome = task.await.map_err(ServerError::Join);
        self.task = None;

        match &outcome {
            Ok(()) => {
                tracing::warn!("HTTP server exited without a shutdown request");
                self.state.send_replace(ServerState::Stopped);
            }
            Err(e) => {
                tracing::error!(error = %e, "HTTP server failed");
                self.state.send_replace(ServerState::Failed);
            }
        }

        outcome
    }

    /// Stop accepting connections and wait up to `drain` for in-flight
    /// requests, then force-close the remaining connections.
    ///
    /// When this returns no connection task is left running. The server
    /// always ends in [`ServerState::Stopped`]; a drain timeout or a task
    /// failure is still returned to the caller.
    pub async fn shutdown(mut self, drain: Duration) -> Result<(), ServerError> {
        let Some(mut task) = self.task.take() else {
            return Ok(());
        };

        tracing::info!(drain_timeout = ?drain, "Shutting down HTTP server");
        self.state.send_replace(ServerState::ShuttingDown);
        self.shutdown.cancel();

        let outcome = match tokio::time::timeout(drain, &mut task).await {
            Ok(result) => result.map_err(ServerError::Join),
            Err(_) => {
                tracing::warn!(drain_timeout = ?drain, "Drain deadline exceeded");
                self.force_close.cancel();
                if let Err(e) = task.await {
                    tracing::error!(error = %e, "HTTP server task failed while force-closing");
                }
                Err(ServerError::DrainTimeout(drain))
            }
        };

        match &outcome {
            Ok(()) => tracing::info!("HTTP server stopped"),
            Err(e) => tracing::error!(error = %e, "HTTP server stopped with error"),
        }
        self.state.send_replace(ServerState::Stopped);

        outcome
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

//! HTTP server and graceful shutdown.
//!
//! # Shutdown
//!
//! On SIGTERM (what an orchestrator sends before killing the process) or
//! Ctrl-C the server:
//! 1. stops calling `listener.accept()`, so no new connection is taken;
//! 2. lets every in-flight connection task run to completion;
//! 3. returns from [`Server::serve`], and `main` exits normally.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::app::App;
use crate::error::Result;
use crate::response::Response;

/// The HTTP front of an [`App`].
pub struct Server {
    addr: SocketAddr,
}

impl Server {
    /// Configure the address [`serve`](Server::serve) will listen on.
    pub fn bind(addr: SocketAddr) -> Self {
        Self { addr }
    }

    /// Accept connections and route every request through `app` until a
    /// shutdown signal arrives and all connections have drained.
    pub async fn serve(self, app: App) -> Result<()> {
        let listener = TcpListener::bind(self.addr).await?;

        // Every connection task shares the route table through one `Arc`;
        // cloning it is a reference count bump, not a copy of the routes.
        let app = Arc::new(app);
        info!(addr = %self.addr, routes = app.router().len(), "trowel listening");

        // JoinSet tracks every connection task so shutdown can wait for them.
        let mut tasks = JoinSet::new();

        // The shutdown future is polled once per loop iteration, so it must
        // stay put in memory between polls. `tokio::pin!` pins it on the stack.
        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // `biased` polls the arms top to bottom instead of at random.
                // Shutdown comes first, so a signal stops accepting at once
                // even while connections are still queued.
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, peer) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let app = Arc::clone(&app);
                    // Adapts tokio's AsyncRead/AsyncWrite to hyper's IO traits.
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        // Called once per request on this connection, not
                        // once per connection.
                        let svc = service_fn(move |req| {
                            let app = Arc::clone(&app);
                            async move { dispatch(app, req).await }
                        });

                        // `auto::Builder` serves HTTP/1.1 or HTTP/2, whichever
                        // the client speaks.
                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(%peer, "connection error: {e}");
                        }
                    });
                }

                // Reap finished tasks so the set stays small on a long-lived
                // server.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        // Drain: every in-flight connection finishes before we return.
        while tasks.join_next().await.is_some() {}

        info!("trowel stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Buffer one request body and hand the request to the app.
///
/// The error type is `Infallible`: routing misses, bad bodies and handler
/// errors all become responses here, so hyper never sees a failure.
async fn dispatch(
    app: Arc<App>,
    req: hyper::Request<Incoming>,
) -> std::result::Result<http::Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();
    debug!(method = %parts.method, uri = %parts.uri, "request");

    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!("failed to read request body: {e}");
            return Ok(Response::status(StatusCode::BAD_REQUEST).into_inner());
        }
    };

    let response = app.handle(http::Request::from_parts(parts, body)).await;
    Ok(response.into_inner())
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on SIGTERM (Unix) or Ctrl-C.
///
/// A listener that can not be installed is logged and its arm never
/// resolves; the other signal still works.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    // Never resolves, which disables the SIGTERM arm off Unix.
    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c  => {}
        () = sigterm => {}
    }
}

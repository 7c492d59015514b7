//! HTTP server and graceful shutdown.
//!
//! On SIGTERM or Ctrl-C the server:
//! 1. Stops calling `listener.accept()`.
//! 2. Tells every open connection to finish its in-flight request and close
//!    (idle keep-alive connections close straight away).
//! 3. Waits for those connection tasks, then returns from [`Server::serve`].
//!
//! With [`Server::with_tls`] each accepted socket goes through a rustls
//! handshake first. A failed handshake drops that connection only, and a
//! handshake still pending at shutdown is abandoned.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use http::{Method, StatusCode};
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_rustls::TlsAcceptor;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::error::Error;
use crate::request::Request;
use crate::response::Response;
use crate::router::{Route, Router};

/// The HTTP server.
pub struct Server {
    listener: TcpListener,
    tls: Option<TlsAcceptor>,
}

impl Server {
    /// Binds `addr`. Port `0` picks a free port; see [`local_addr`](Server::local_addr).
    pub async fn bind(addr: SocketAddr) -> Result<Self, Error> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self::from_listener(listener))
    }

    pub fn from_listener(listener: TcpListener) -> Self {
        Self { listener, tls: None }
    }

    /// Terminate TLS on every accepted connection.
    pub fn with_tls(mut self, config: Arc<rustls::ServerConfig>) -> Self {
        self.tls = Some(TlsAcceptor::from(config));
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr, Error> {
        Ok(self.listener.local_addr()?)
    }

    /// Serves `router` until SIGTERM or Ctrl-C, then drains and returns.
    pub async fn serve(self, router: Router) -> Result<(), Error> {
        self.serve_with_shutdown(router, shutdown_signal()).await
    }

    /// Serves `router` until `signal` resolves, then drains and returns.
    pub async fn serve_with_shutdown<S>(self, router: Router, signal: S) -> Result<(), Error>
    where
        S: Future<Output = ()>,
    {
        let addr = self.listener.local_addr()?;
        let router = Arc::new(router);
        let (drain_tx, drain_rx) = watch::channel(false);

        info!(addr = %addr, tls = self.tls.is_some(), "poster-relay listening");

        let mut tasks = tokio::task::JoinSet::new();
        tokio::pin!(signal);

        loop {
            tokio::select! {
                // Check shutdown first so a signal stops new connections even
                // while more are queued.
                biased;

                () = &mut signal => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = self.listener.accept() => {
                    let (stream, peer) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let router = Arc::clone(&router);
                    let drain = drain_rx.clone();
                    let tls = self.tls.clone();

                    tasks.spawn(async move {
                        match tls {
                            Some(acceptor) => {
                                let mut handshake_drain = drain.clone();
                                tokio::select! {
                                    res = acceptor.accept(stream) => match res {
                                        Ok(stream) => serve_connection(stream, router, peer, drain).await,
                                        Err(e) => warn!(peer = %peer, "tls handshake failed: {e}"),
                                    },
                                    // A peer that never finishes its handshake must not
                                    // hold up the drain.
                                    _ = handshake_drain.changed() => {
                                        debug!(peer = %peer, "dropping connection mid-handshake on shutdown");
                                    }
                                }
                            }
                            None => serve_connection(stream, router, peer, drain).await,
                        }
                    });
                }

                // Reap finished connection tasks so the set stays bounded.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        let _ = drain_tx.send(true);
        while tasks.join_next().await.is_some() {}

        info!("poster-relay stopped");
        Ok(())
    }
}

// ── Connections ───────────────────────────────────────────────────────────────

/// Runs one HTTP/1.1 or HTTP/2 connection until the peer closes it or a
/// drain is requested.
async fn serve_connection<I>(
    io: I,
    router: Arc<Router>,
    peer: SocketAddr,
    mut drain: watch::Receiver<bool>,
) where
    I: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    // Called once per request on the connection.
    let svc = service_fn(move |req| dispatch(Arc::clone(&router), req));

    let builder = ConnBuilder::new(TokioExecutor::new());
    let conn = builder.serve_connection(TokioIo::new(io), svc);
    tokio::pin!(conn);

    let mut draining = false;
    loop {
        tokio::select! {
            res = conn.as_mut() => {
                if let Err(e) = res {
                    debug!(peer = %peer, "connection error: {e}");
                }
                break;
            }
            _ = drain.changed(), if !draining => {
                draining = true;
                conn.as_mut().graceful_shutdown();
            }
        }
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Routes one request and produces one response: the handler's, a `405`
/// with `Allow`, or a `404`. Every failure is already a response by the time
/// it gets here, so hyper never sees an error.
async fn dispatch(
    router: Arc<Router>,
    req: hyper::Request<Incoming>,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let (parts, _body) = req.into_parts();
    let span = info_span!("request", method = %parts.method, path = parts.uri.path());

    async move {
        let started = Instant::now();
        let route = router.route(&parts.method, parts.uri.path());
        let response = match route {
            Route::Matched(handler, params) => handler.call(Request::new(parts, params)).await,
            Route::MethodNotAllowed(allowed) => method_not_allowed(&allowed),
            Route::NotFound => Response::status(StatusCode::NOT_FOUND),
        };

        debug!(
            status = response.status_code().as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request handled"
        );
        Ok(response.into_inner())
    }
    .instrument(span)
    .await
}

fn method_not_allowed(allowed: &[Method]) -> Response {
    let allow = allowed.iter().map(Method::as_str).collect::<Vec<_>>().join(", ");
    Response::builder()
        .status(StatusCode::METHOD_NOT_ALLOWED)
        .header("allow", &allow)
        .no_body()
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on SIGTERM (Unix) or Ctrl-C. If a handler cannot be installed
/// that branch never fires and the failure is logged.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c  => {}
        () = sigterm => {}
    }
}

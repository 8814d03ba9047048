//! HTTP host.
//!
//! Accepts HTTP/1.1 connections with Hyper on a Tokio listener, buffers each
//! request body and hands the request to the [`Router`]. The pipeline only
//! ever sees fully buffered requests.
//!
//! Buffering is bounded by [`ServerConfig::max_body_size`] (413
//! `PAYLOAD_TOO_LARGE`) and [`ServerConfig::body_read_timeout`] (408
//! `REQUEST_TIMEOUT`).
//!
//! On shutdown the accept loop stops, open connections are told to close,
//! and the server waits up to the configured timeout for them to drain.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::{Request, StatusCode};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use strata_core::{HttpResponse, PipelineError};
use tokio::net::{TcpListener, TcpStream};

use crate::config::ServerConfig;
use crate::endpoint::{correlation_headers, error_response};
use crate::error::ServerError;
use crate::router::Router;
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

/// The Strata HTTP server.
///
/// # Example
///
/// ```rust
/// use strata_server::{Router, Server, ServerConfig};
///
/// let config = ServerConfig::builder().http_addr("127.0.0.1:3000").build();
/// let server = Server::new(config, Router::new());
/// assert_eq!(server.config().http_addr(), "127.0.0.1:3000");
/// ```
#[derive(Debug, Clone)]
pub struct Server {
    config: ServerConfig,
    router: Arc<Router>,
}

impl Server {
    /// Creates a server for `router`.
    #[must_use]
    pub fn new(config: ServerConfig, router: Router) -> Self {
        Self {
            config,
            router: Arc::new(router),
        }
    }

    /// Returns the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the router.
    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Runs until SIGTERM or SIGINT.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured address is invalid or cannot be bound.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_with_shutdown(ShutdownSignal::with_os_signals()).await
    }

    /// Binds the configured address and runs until `shutdown` triggers.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured address is invalid or cannot be bound.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let addr = self.config.socket_addr()?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        self.serve(listener, shutdown).await
    }

    /// Serves connections from an already bound listener until `shutdown` triggers.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener's local address cannot be read.
    pub async fn serve(self, listener: TcpListener, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let local = listener.local_addr()?;
        tracing::info!(addr = %local, routes = self.router.route_count(), "server listening");

        let tracker = ConnectionTracker::new();
        let limits = BodyLimits::from_config(&self.config);
        let stop = shutdown.recv();
        tokio::pin!(stop);

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, remote)) => {
                        let router = Arc::clone(&self.router);
                        let token = tracker.acquire();
                        let shutdown = shutdown.clone();
                        tokio::spawn(async move {
                            if let Err(err) =
                                handle_connection(router, stream, remote, shutdown, limits).await
                            {
                                tracing::debug!(%remote, error = %err, "connection error");
                            }
                            drop(token);
                        });
                    }
                    Err(err) => tracing::error!(error = %err, "failed to accept connection"),
                },
                () = &mut stop => {
                    tracing::info!("shutdown signal received, stopping server");
                    break;
                }
            }
        }

        let timeout = self.config.shutdown_timeout();
        tracing::info!(
            active = tracker.active_connections(),
            timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            "waiting for connections to close"
        );
        if tokio::time::timeout(timeout, tracker.wait_for_idle()).await.is_err() {
            tracing::warn!(
                active = tracker.active_connections(),
                "shutdown timeout reached with connections still open"
            );
        }

        tracing::info!("server stopped");
        Ok(())
    }
}

/// Bounds on buffering a request body.
#[derive(Debug, Clone, Copy)]
struct BodyLimits {
    max_size: usize,
    read_timeout: Duration,
}

impl BodyLimits {
    fn from_config(config: &ServerConfig) -> Self {
        Self {
            max_size: config.max_body_size(),
            read_timeout: config.body_read_timeout(),
        }
    }
}

async fn handle_connection(
    router: Arc<Router>,
    stream: TcpStream,
    remote: SocketAddr,
    shutdown: ShutdownSignal,
    limits: BodyLimits,
) -> Result<(), hyper::Error> {
    let io = TokioIo::new(stream);
    let service = service_fn(move |request: Request<Incoming>| {
        let router = Arc::clone(&router);
        async move { Ok::<_, Infallible>(handle_request(&router, request, limits).await) }
    });

    let conn = http1::Builder::new().serve_connection(io, service);
    tokio::pin!(conn);

    tokio::select! {
        result = conn.as_mut() => result,
        () = shutdown.recv() => {
            tracing::debug!(%remote, "closing connection for shutdown");
            conn.as_mut().graceful_shutdown();
            conn.await
        }
    }
}

/// Buffers the body and routes the request.
async fn handle_request(
    router: &Router,
    request: Request<Incoming>,
    limits: BodyLimits,
) -> HttpResponse {
    let (parts, body) = request.into_parts();
    let body = match read_body(body, limits).await {
        Ok(body) => body,
        Err(error) => return error_response(&error, correlation_headers(&parts.headers)),
    };

    router.handle(Request::from_parts(parts, Full::new(body))).await
}

/// Collects a body within the size and time limits.
async fn read_body<B>(body: B, limits: BodyLimits) -> Result<Bytes, PipelineError>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let collected = tokio::time::timeout(
        limits.read_timeout,
        Limited::new(body, limits.max_size).collect(),
    )
    .await;

    match collected {
        Ok(Ok(collected)) => Ok(collected.to_bytes()),
        Ok(Err(err)) if err.downcast_ref::<LengthLimitError>().is_some() => {
            tracing::warn!(limit = limits.max_size, "request body too large");
            Err(PipelineError::new(
                StatusCode::PAYLOAD_TOO_LARGE,
                "PAYLOAD_TOO_LARGE",
                format!("request body exceeds {} bytes", limits.max_size),
            ))
        }
        Ok(Err(err)) => {
            tracing::warn!(error = %err, "failed to read request body");
            Err(PipelineError::new(
                StatusCode::BAD_REQUEST,
                "BODY_READ_ERROR",
                format!("failed to read request body: {err}"),
            ))
        }
        Err(_) => {
            tracing::warn!(
                timeout_ms = u64::try_from(limits.read_timeout.as_millis()).unwrap_or(u64::MAX),
                "request body read timed out"
            );
            Err(PipelineError::new(
                StatusCode::REQUEST_TIMEOUT,
                "REQUEST_TIMEOUT",
                "request body read timed out",
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    /// A body whose first frame never arrives.
    struct Stalled;

    impl Body for Stalled {
        type Data = Bytes;
        type Error = Infallible;

        fn poll_frame(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<Option<Result<hyper::body::Frame<Bytes>, Infallible>>> {
            Poll::Pending
        }
    }

    fn limits(max_size: usize, read_timeout: Duration) -> BodyLimits {
        BodyLimits {
            max_size,
            read_timeout,
        }
    }

    #[tokio::test]
    async fn test_read_body_within_limit() {
        let body = Full::new(Bytes::from_static(b"{\"key\":\"a\"}"));
        let bytes = tokio_test::assert_ok!(read_body(body, limits(64, Duration::from_secs(1))).await);
        assert_eq!(bytes, Bytes::from_static(b"{\"key\":\"a\"}"));
    }

    #[tokio::test]
    async fn test_read_body_over_limit_is_413() {
        let body = Full::new(Bytes::from(vec![b'x'; 65]));
        let err = tokio_test::assert_err!(read_body(body, limits(64, Duration::from_secs(1))).await);
        assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(err.code(), "PAYLOAD_TOO_LARGE");
    }

    #[tokio::test]
    async fn test_read_body_timeout_is_408() {
        let err =
            tokio_test::assert_err!(read_body(Stalled, limits(64, Duration::from_millis(20))).await);
        assert_eq!(err.status(), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(err.code(), "REQUEST_TIMEOUT");
    }

    #[tokio::test]
    async fn test_invalid_address() {
        let server = Server::new(
            ServerConfig::builder().http_addr("not-a-valid-address").build(),
            Router::new(),
        );

        let result = server.run_with_shutdown(ShutdownSignal::new()).await;
        assert!(matches!(result, Err(ServerError::InvalidAddress { .. })));
    }

    #[tokio::test]
    async fn test_stops_when_already_triggered() {
        let server = Server::new(
            ServerConfig::builder()
                .http_addr("127.0.0.1:0")
                .shutdown_timeout(Duration::from_millis(100))
                .build(),
            Router::new(),
        );
        let shutdown = ShutdownSignal::new();
        shutdown.trigger();

        let result = tokio::time::timeout(Duration::from_secs(5), server.run_with_shutdown(shutdown)).await;

        tokio_test::assert_ok!(result.expect("server should stop"));
    }
}

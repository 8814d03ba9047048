//! Request logging middleware.
//!
//! Emits one `"request started"` event before delegating inward and one
//! `"request finished"` event after the inner handler returns, whether it
//! succeeded or failed. Both events are children of the context's span, so
//! they carry the request id when [`RequestIdMiddleware`](super::RequestIdMiddleware)
//! runs further out.
//!
//! Elapsed time covers only the inner call.

use std::time::Instant;

use http::StatusCode;
use strata_core::{Handler, HandlerResult};

use crate::middleware::Middleware;

/// Middleware that logs the start and finish of each request.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestLoggerMiddleware;

impl RequestLoggerMiddleware {
    /// Creates the middleware.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

/// The status the dispatcher will write for this result.
fn outcome_status<T, E>(result: &HandlerResult<T, E>) -> StatusCode {
    match result {
        Ok(envelope) => envelope.final_status(),
        Err(err) => err
            .as_pipeline()
            .map_or(StatusCode::INTERNAL_SERVER_ERROR, |pipeline| pipeline.status()),
    }
}

impl<S, B, Q, T, E> Middleware<S, B, Q, T, E> for RequestLoggerMiddleware
where
    S: Send + Sync + 'static,
    B: Send + 'static,
    Q: Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    fn name(&self) -> &'static str {
        "request_logger"
    }

    fn wrap(&self, inner: Handler<S, B, Q, T, E>) -> Handler<S, B, Q, T, E> {
        Handler::from_fn(move |ctx| {
            let inner = inner.clone();
            async move {
                let span = ctx.span().clone();
                let method = ctx.method().clone();
                let url = ctx.uri().to_string();

                tracing::info!(
                    parent: &span,
                    http.method = %method,
                    http.url = %url,
                    "request started"
                );

                let started = Instant::now();
                let result = inner.call(ctx).await;
                let elapsed = started.elapsed();

                tracing::info!(
                    parent: &span,
                    http.method = %method,
                    http.url = %url,
                    http.status_code = outcome_status(&result).as_u16(),
                    elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                    "request finished"
                );

                result
            }
        })
    }
}

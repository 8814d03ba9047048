//! Request ID middleware.
//!
//! Assigns every request a correlation identifier:
//!
//! 1. **X-Request-Id header**: if present, the incoming value is reused verbatim
//! 2. **Generated UUID v7**: otherwise a new identifier is generated
//!
//! The identifier is stored on the [`RequestContext`](strata_core::RequestContext),
//! recorded on a `request` span that instruments everything further inward,
//! and written to the `X-Request-Id` response header on both the success and
//! the error path.

use http::header::HeaderName;
use strata_core::{Handler, RequestId, REQUEST_ID_HEADER};
use tracing::Instrument;

use crate::middleware::Middleware;

/// Middleware that assigns or propagates the correlation identifier.
///
/// Register it outermost so every other stage logs inside its span.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestIdMiddleware;

impl RequestIdMiddleware {
    /// Creates the middleware.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl<S, B, Q, T, E> Middleware<S, B, Q, T, E> for RequestIdMiddleware
where
    S: Send + Sync + 'static,
    B: Send + 'static,
    Q: Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    fn name(&self) -> &'static str {
        "request_id"
    }

    fn wrap(&self, inner: Handler<S, B, Q, T, E>) -> Handler<S, B, Q, T, E> {
        Handler::from_fn(move |mut ctx| {
            let inner = inner.clone();
            async move {
                let request_id = ctx
                    .request()
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(RequestId::from_header)
                    .unwrap_or_else(RequestId::generate);

                let span = tracing::info_span!(
                    parent: ctx.span(),
                    "request",
                    request_id = %request_id
                );
                let header = request_id.header_value().clone();
                ctx.set_span(span.clone());
                ctx.set_request_id(request_id);

                let name = HeaderName::from_static(REQUEST_ID_HEADER);
                match inner.call(ctx).instrument(span).await {
                    Ok(mut envelope) => {
                        envelope.headers_mut().insert(name, header);
                        Ok(envelope)
                    }
                    Err(mut err) => {
                        err.headers_mut().insert(name, header);
                        Err(err)
                    }
                }
            }
        })
    }
}

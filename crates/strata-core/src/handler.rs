//! The handler type every middleware wraps.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::context::RequestContext;
use crate::envelope::Envelope;
use crate::error::HandlerError;

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The result of running a handler.
pub type HandlerResult<T, E> = Result<Envelope<T, E>, HandlerError>;

type HandlerFn<S, B, Q, T, E> =
    dyn Fn(RequestContext<S, B, Q>) -> BoxFuture<'static, HandlerResult<T, E>> + Send + Sync;

/// An async function from [`RequestContext`] to [`HandlerResult`].
///
/// Core handlers and middleware-decorated handlers share this one type, so
/// a middleware is just a `Handler -> Handler` transformation. Cloning is
/// cheap (an `Arc` clone).
///
/// # Example
///
/// ```
/// use strata_core::{Envelope, Handler, RequestContext};
///
/// let double: Handler<(), (), u32, u32, String> =
///     Handler::from_fn(|ctx: RequestContext<(), (), u32>| async move {
///         let n = ctx.query().copied().unwrap_or_default();
///         Ok(Envelope::ok(n * 2))
///     });
/// # let _ = double;
/// ```
pub struct Handler<S, B, Q, T, E> {
    inner: Arc<HandlerFn<S, B, Q, T, E>>,
}

impl<S, B, Q, T, E> Handler<S, B, Q, T, E>
where
    S: Send + Sync + 'static,
    B: Send + 'static,
    Q: Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    /// Creates a handler from an async function.
    pub fn from_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(RequestContext<S, B, Q>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<T, E>> + Send + 'static,
    {
        Self {
            inner: Arc::new(
                move |ctx: RequestContext<S, B, Q>| -> BoxFuture<'static, HandlerResult<T, E>> {
                    Box::pin(f(ctx))
                },
            ),
        }
    }

    /// Runs the handler.
    pub fn call(&self, ctx: RequestContext<S, B, Q>) -> BoxFuture<'static, HandlerResult<T, E>> {
        (self.inner)(ctx)
    }
}

impl<S, B, Q, T, E> Clone for Handler<S, B, Q, T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S, B, Q, T, E> std::fmt::Debug for Handler<S, B, Q, T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler").finish_non_exhaustive()
    }
}

/// Placeholder for endpoints without a body or query parameters.
///
/// Decodes from an empty JSON object or any query string, ignoring keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Empty {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PipelineError;
    use bytes::Bytes;
    use http_body_util::Full;

    fn ctx(query: Option<u32>) -> RequestContext<(), (), u32> {
        let request = http::Request::builder()
            .uri("/")
            .body(Full::new(Bytes::new()))
            .unwrap();
        let mut ctx = RequestContext::new(Arc::new(()), request);
        if let Some(q) = query {
            ctx.set_query(q);
        }
        ctx
    }

    #[tokio::test]
    async fn test_handler_call() {
        let handler: Handler<(), (), u32, u32, ()> =
            Handler::from_fn(|ctx: RequestContext<(), (), u32>| async move {
                Ok(Envelope::ok(ctx.query().copied().unwrap_or_default() + 1))
            });

        let envelope = handler.call(ctx(Some(41))).await.unwrap();
        assert_eq!(envelope.payload(), Some(&42));
    }

    #[tokio::test]
    async fn test_handler_error() {
        let handler: Handler<(), (), u32, u32, ()> = Handler::from_fn(|_ctx| async move {
            Err(PipelineError::bad_request("NOPE", "nope").into())
        });

        let err = handler.call(ctx(None)).await.unwrap_err();
        assert!(err.is_pipeline());
    }

    #[tokio::test]
    async fn test_clone_shares_function() {
        let handler: Handler<(), (), u32, u32, ()> =
            Handler::from_fn(|_ctx| async move { Ok(Envelope::ok(1)) });
        let cloned = handler.clone();

        assert_eq!(cloned.call(ctx(None)).await.unwrap().payload(), Some(&1));
        assert_eq!(handler.call(ctx(None)).await.unwrap().payload(), Some(&1));
    }

    #[test]
    fn test_empty_ignores_unknown_fields() {
        let from_json: Empty = serde_json::from_str(r#"{"anything": 1}"#).unwrap();
        assert_eq!(from_json, Empty {});
    }
}

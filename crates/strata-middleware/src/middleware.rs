//! Core middleware trait and types.
//!
//! A middleware is a transformation from one [`Handler`] to another of the
//! identical signature. It performs its concern around a call to the inner
//! handler and never runs anything at composition time.
//!
//! # Example
//!
//! ```
//! use std::time::Instant;
//! use strata_core::{Empty, Handler};
//! use strata_middleware::Middleware;
//!
//! struct Timing;
//!
//! impl Middleware<(), Empty, Empty, String, String> for Timing {
//!     fn name(&self) -> &'static str {
//!         "timing"
//!     }
//!
//!     fn wrap(
//!         &self,
//!         inner: Handler<(), Empty, Empty, String, String>,
//!     ) -> Handler<(), Empty, Empty, String, String> {
//!         Handler::from_fn(move |ctx| {
//!             let inner = inner.clone();
//!             async move {
//!                 let start = Instant::now();
//!                 let result = inner.call(ctx).await;
//!                 tracing::debug!(elapsed = ?start.elapsed(), "inner handler returned");
//!                 result
//!             }
//!         })
//!     }
//! }
//! ```

use std::sync::Arc;

use strata_core::Handler;

/// The core middleware trait.
///
/// # Invariants
///
/// - `wrap` only builds a new handler; it MUST NOT call `inner` itself
/// - The returned handler SHOULD call `inner` at most once per request
///   (zero times when short-circuiting)
/// - Middleware holds no per-request state; anything a request needs is
///   carried on the [`RequestContext`](strata_core::RequestContext)
pub trait Middleware<S, B, Q, T, E>: Send + Sync + 'static {
    /// Returns the name of this middleware, used for logging and debugging.
    fn name(&self) -> &'static str;

    /// Wraps `inner`, returning a decorated handler.
    fn wrap(&self, inner: Handler<S, B, Q, T, E>) -> Handler<S, B, Q, T, E>;
}

/// A type-erased middleware that can be stored in a chain.
pub type BoxedMiddleware<S, B, Q, T, E> = Arc<dyn Middleware<S, B, Q, T, E>>;

/// A middleware built from a `Handler -> Handler` closure.
///
/// # Example
///
/// ```
/// use strata_core::{Empty, Handler};
/// use strata_middleware::{FnMiddleware, Middleware};
///
/// type H = Handler<(), Empty, Empty, u32, ()>;
///
/// let passthrough = FnMiddleware::new("passthrough", |inner: H| inner);
/// assert_eq!(Middleware::<(), Empty, Empty, u32, ()>::name(&passthrough), "passthrough");
/// ```
pub struct FnMiddleware<F> {
    name: &'static str,
    func: F,
}

impl<F> FnMiddleware<F> {
    /// Creates a new function-based middleware.
    pub const fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<S, B, Q, T, E, F> Middleware<S, B, Q, T, E> for FnMiddleware<F>
where
    F: Fn(Handler<S, B, Q, T, E>) -> Handler<S, B, Q, T, E> + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn wrap(&self, inner: Handler<S, B, Q, T, E>) -> Handler<S, B, Q, T, E> {
        (self.func)(inner)
    }
}

impl<F> std::fmt::Debug for FnMiddleware<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnMiddleware")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http_body_util::Full;
    use strata_core::{Empty, Envelope, RequestContext};

    type H = Handler<(), Empty, Empty, u32, ()>;

    fn ctx() -> RequestContext<(), Empty, Empty> {
        let request = http::Request::builder()
            .uri("/test")
            .body(Full::new(Bytes::new()))
            .unwrap();
        RequestContext::new(Arc::new(()), request)
    }

    #[tokio::test]
    async fn test_fn_middleware_wraps_inner() {
        let add_one = FnMiddleware::new("add_one", |inner: H| {
            Handler::from_fn(move |ctx| {
                let inner = inner.clone();
                async move {
                    let envelope = inner.call(ctx).await?;
                    let value = envelope.payload().copied().unwrap_or_default();
                    Ok(Envelope::ok(value + 1))
                }
            })
        });

        let core: H = Handler::from_fn(|_ctx| async move { Ok(Envelope::ok(41)) });
        let wrapped = add_one.wrap(core);

        let envelope = wrapped.call(ctx()).await.unwrap();
        assert_eq!(envelope.payload(), Some(&42));
        assert_eq!(Middleware::<(), Empty, Empty, u32, ()>::name(&add_one), "add_one");
    }

    #[tokio::test]
    async fn test_wrap_does_not_run_inner() {
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let core: H = Handler::from_fn(move |_ctx| {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            async move { Ok(Envelope::ok(0)) }
        });

        let passthrough = FnMiddleware::new("passthrough", |inner: H| inner);
        let wrapped = passthrough.wrap(core);
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);

        wrapped.call(ctx()).await.unwrap();
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}

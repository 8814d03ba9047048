//! Middleware chain composition.
//!
//! ## Wrap order
//!
//! The first middleware registered is the **outermost**: it runs first on
//! the way in and last on the way out. Composition is a pure fold over the
//! registered list, so the same chain always produces the same handler
//! graph.
//!
//! ## Standard order
//!
//! [`Chain::standard`] registers the built-in stages as:
//!
//! 1. **Request ID** - assign or propagate the correlation id, open the request span
//! 2. **Request Logger** - start/finish events around everything below
//! 3. **Codec** - decode body and query, serialize the payload on the way out
//! 4. **Error Translation** - map domain errors to status and error payload
//!
//! Identity and logging frame the whole request. The codec sits inside them
//! so its failures are logged with the request id, and error translation
//! sits nearest the core handler so the codec serializes the translated
//! error payload.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use strata_core::Handler;

use crate::middleware::{BoxedMiddleware, Middleware};
use crate::stages::codec::{CodecMiddleware, CodecSettings};
use crate::stages::error_translation::ErrorTranslationMiddleware;
use crate::stages::logging::RequestLoggerMiddleware;
use crate::stages::request_id::RequestIdMiddleware;

/// An ordered list of middleware.
///
/// # Example
///
/// ```
/// use strata_core::{Empty, Envelope, Handler};
/// use strata_middleware::{Chain, CodecSettings, ErrorTranslationMiddleware};
///
/// let chain: Chain<(), Empty, Empty, String, String> =
///     Chain::standard(ErrorTranslationMiddleware::new(), CodecSettings::default());
///
/// assert_eq!(
///     chain.names(),
///     vec!["request_id", "request_logger", "codec", "error_translation"]
/// );
///
/// let core = Handler::from_fn(|_ctx| async move { Ok(Envelope::ok("pong".to_string())) });
/// let handler = chain.compose(core);
/// # let _ = handler;
/// ```
pub struct Chain<S, B, Q, T, E> {
    middlewares: Vec<BoxedMiddleware<S, B, Q, T, E>>,
}

impl<S, B, Q, T, E> Chain<S, B, Q, T, E>
where
    S: 'static,
    B: 'static,
    Q: 'static,
    T: 'static,
    E: 'static,
{
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self {
            middlewares: Vec::new(),
        }
    }

    /// Appends a middleware inside every middleware registered so far.
    #[must_use]
    pub fn with<M: Middleware<S, B, Q, T, E>>(mut self, middleware: M) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// Appends an already boxed middleware.
    #[must_use]
    pub fn with_boxed(mut self, middleware: BoxedMiddleware<S, B, Q, T, E>) -> Self {
        self.middlewares.push(middleware);
        self
    }

    /// Returns the middleware names, outermost first.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.middlewares.iter().map(|mw| mw.name()).collect()
    }

    /// Returns the number of middleware.
    #[must_use]
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    /// Returns `true` if the chain is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Wraps `core` with every middleware, first registered outermost.
    ///
    /// No handler runs during composition.
    pub fn compose(&self, core: Handler<S, B, Q, T, E>) -> Handler<S, B, Q, T, E> {
        self.middlewares
            .iter()
            .rev()
            .fold(core, |inner, middleware| middleware.wrap(inner))
    }
}

impl<S, B, Q, T, E> Chain<S, B, Q, T, E>
where
    S: Send + Sync + 'static,
    B: DeserializeOwned + Default + Send + 'static,
    Q: DeserializeOwned + Send + 'static,
    T: Serialize + Send + 'static,
    E: Serialize + Send + 'static,
{
    /// Creates the standard chain: request id, request logger, codec, error translation.
    #[must_use]
    pub fn standard(translation: ErrorTranslationMiddleware<E>, codec: CodecSettings) -> Self {
        Self::new()
            .with(RequestIdMiddleware::new())
            .with(RequestLoggerMiddleware::new())
            .with(CodecMiddleware::new(codec))
            .with(translation)
    }
}

impl<S, B, Q, T, E> Default for Chain<S, B, Q, T, E>
where
    S: 'static,
    B: 'static,
    Q: 'static,
    T: 'static,
    E: 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S, B, Q, T, E> Clone for Chain<S, B, Q, T, E>
where
    S: 'static,
    B: 'static,
    Q: 'static,
    T: 'static,
    E: 'static,
{
    fn clone(&self) -> Self {
        Self {
            middlewares: self.middlewares.clone(),
        }
    }
}

impl<S, B, Q, T, E> std::fmt::Debug for Chain<S, B, Q, T, E>
where
    S: 'static,
    B: 'static,
    Q: 'static,
    T: 'static,
    E: 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chain")
            .field("middlewares", &self.names())
            .finish()
    }
}

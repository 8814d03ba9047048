//! Error translation middleware.
//!
//! Converts domain errors raised by the core handler into failed envelopes
//! using an ordered list of collaborator-supplied translators. Translators
//! are tried in registration order; the first to return `Some` wins and the
//! rest are skipped.
//!
//! When nothing matches, the [`Unmatched`] policy decides:
//!
//! - [`Unmatched::Internal`] (default) - respond `500` with the generic
//!   `INTERNAL` error body
//! - [`Unmatched::Propagate`] - pass the domain error on to the dispatcher,
//!   which treats it as fatal
//!
//! Pipeline errors from further inward already carry a status and pass
//! through untouched.
//!
//! # Example
//!
//! ```
//! use http::StatusCode;
//! use strata_middleware::{ErrorTranslationMiddleware, Translation};
//!
//! #[derive(Debug, thiserror::Error)]
//! #[error("storage failed")]
//! struct StorageError;
//!
//! let translation: ErrorTranslationMiddleware<String> = ErrorTranslationMiddleware::new()
//!     .on(|_err: &StorageError, _span| {
//!         Translation::new(StatusCode::FAILED_DEPENDENCY, "DATABASE".to_string())
//!     });
//!
//! assert_eq!(translation.len(), 1);
//! ```

use std::sync::Arc;

use http::StatusCode;
use strata_core::{Envelope, ErrorKind, Handler, HandlerError, PipelineError};
use tracing::Span;

use crate::middleware::Middleware;

/// The result of a successful translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation<E> {
    /// The response status.
    pub status: StatusCode,
    /// The error payload, if any.
    pub payload: Option<E>,
}

impl<E> Translation<E> {
    /// Creates a translation with an error payload.
    pub fn new(status: StatusCode, payload: E) -> Self {
        Self {
            status,
            payload: Some(payload),
        }
    }

    /// Creates a translation that only sets the status.
    pub fn status_only(status: StatusCode) -> Self {
        Self {
            status,
            payload: None,
        }
    }
}

/// A translator: returns `Some` to claim the error, `None` to decline.
///
/// The span is the request's logger handle.
pub type Translator<E> = Arc<dyn Fn(&anyhow::Error, &Span) -> Option<Translation<E>> + Send + Sync>;

/// What to do with a domain error no translator claims.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Unmatched {
    /// Respond `500` with the generic `INTERNAL` error body.
    #[default]
    Internal,
    /// Propagate the domain error to the dispatcher as fatal.
    Propagate,
}

/// Middleware that maps domain errors to status and error payload.
pub struct ErrorTranslationMiddleware<E> {
    translators: Vec<Translator<E>>,
    unmatched: Unmatched,
}

impl<E> ErrorTranslationMiddleware<E> {
    /// Creates the middleware with no translators.
    #[must_use]
    pub fn new() -> Self {
        Self {
            translators: Vec::new(),
            unmatched: Unmatched::default(),
        }
    }

    /// Appends a translator over any domain error.
    #[must_use]
    pub fn translator<F>(mut self, translator: F) -> Self
    where
        F: Fn(&anyhow::Error, &Span) -> Option<Translation<E>> + Send + Sync + 'static,
    {
        self.translators.push(Arc::new(translator));
        self
    }

    /// Appends a translator for one concrete error type.
    ///
    /// The translator matches when the domain error downcasts to `D`.
    #[must_use]
    pub fn on<D, F>(self, translate: F) -> Self
    where
        D: std::fmt::Display + std::fmt::Debug + Send + Sync + 'static,
        F: Fn(&D, &Span) -> Translation<E> + Send + Sync + 'static,
    {
        self.translator(move |err, span| err.downcast_ref::<D>().map(|d| translate(d, span)))
    }

    /// Sets the policy for unmatched domain errors.
    #[must_use]
    pub fn unmatched(mut self, policy: Unmatched) -> Self {
        self.unmatched = policy;
        self
    }

    /// Returns the number of translators.
    #[must_use]
    pub fn len(&self) -> usize {
        self.translators.len()
    }

    /// Returns `true` if no translators are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.translators.is_empty()
    }

    /// Runs the translators in order, returning the first match.
    pub fn translate(&self, err: &anyhow::Error, span: &Span) -> Option<Translation<E>> {
        first_match(&self.translators, err, span)
    }
}

fn first_match<E>(
    translators: &[Translator<E>],
    err: &anyhow::Error,
    span: &Span,
) -> Option<Translation<E>> {
    translators.iter().find_map(|translator| translator(err, span))
}

impl<E> Default for ErrorTranslationMiddleware<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for ErrorTranslationMiddleware<E> {
    fn clone(&self) -> Self {
        Self {
            translators: self.translators.clone(),
            unmatched: self.unmatched,
        }
    }
}

impl<E> std::fmt::Debug for ErrorTranslationMiddleware<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorTranslationMiddleware")
            .field("translators", &self.translators.len())
            .field("unmatched", &self.unmatched)
            .finish()
    }
}

impl<S, B, Q, T, E> Middleware<S, B, Q, T, E> for ErrorTranslationMiddleware<E>
where
    S: Send + Sync + 'static,
    B: Send + 'static,
    Q: Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    fn name(&self) -> &'static str {
        "error_translation"
    }

    fn wrap(&self, inner: Handler<S, B, Q, T, E>) -> Handler<S, B, Q, T, E> {
        let translators: Arc<[Translator<E>]> = self.translators.clone().into();
        let unmatched = self.unmatched;

        Handler::from_fn(move |ctx| {
            let inner = inner.clone();
            let translators = Arc::clone(&translators);
            async move {
                let span = ctx.span().clone();
                let err = match inner.call(ctx).await {
                    Ok(envelope) => return Ok(envelope),
                    Err(err) => err,
                };

                let (kind, headers) = err.into_parts();
                let domain = match kind {
                    ErrorKind::Domain(domain) => domain,
                    pipeline @ ErrorKind::Pipeline(_) => {
                        return Err(HandlerError::from_parts(pipeline, headers));
                    }
                };

                if let Some(Translation { status, payload }) = first_match(&translators, &domain, &span) {
                    tracing::debug!(
                        parent: &span,
                        error = %domain,
                        status = status.as_u16(),
                        "domain error translated"
                    );
                    let mut envelope = match payload {
                        Some(payload) => Envelope::failure(payload),
                        None => Envelope::empty_failure(),
                    }
                    .with_status(status);
                    envelope.headers_mut().extend(headers);
                    return Ok(envelope);
                }

                match unmatched {
                    Unmatched::Internal => {
                        tracing::error!(
                            parent: &span,
                            error = ?domain,
                            "no translator matched domain error"
                        );
                        Err(HandlerError::from_parts(
                            PipelineError::internal().into(),
                            headers,
                        ))
                    }
                    Unmatched::Propagate => {
                        Err(HandlerError::from_parts(ErrorKind::Domain(domain), headers))
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::header::{HeaderName, HeaderValue};
    use http_body_util::Full;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use strata_core::{Empty, RequestContext};

    #[derive(Debug, thiserror::Error)]
    #[error("random failure")]
    struct RandomError;

    #[derive(Debug, thiserror::Error)]
    #[error("storage failure: {0}")]
    struct StorageError(String);

    type H = Handler<(), Empty, Empty, String, String>;

    fn ctx() -> RequestContext<(), Empty, Empty> {
        let request = http::Request::builder()
            .uri("/test")
            .body(Full::new(Bytes::new()))
            .unwrap();
        RequestContext::new(Arc::new(()), request)
    }

    fn failing_with(err: impl Into<anyhow::Error> + Clone + Send + Sync + 'static) -> H {
        Handler::from_fn(move |_ctx| {
            let err = err.clone();
            async move {
                Err(HandlerError::domain(err).with_header(
                    HeaderName::from_static("x-inner"),
                    HeaderValue::from_static("kept"),
                ))
            }
        })
    }

    #[derive(Debug, Clone, thiserror::Error)]
    #[error("teapot")]
    struct Teapot;

    #[tokio::test]
    async fn test_matching_translator_produces_failure_envelope() {
        let translation = ErrorTranslationMiddleware::new()
            .on(|_: &Teapot, _| Translation::new(StatusCode::IM_A_TEAPOT, "TEAPOT".to_string()));
        let handler = Middleware::wrap(&translation, failing_with(Teapot));

        let envelope = handler.call(ctx()).await.unwrap();

        assert!(envelope.error_occurred());
        assert_eq!(envelope.status(), Some(StatusCode::IM_A_TEAPOT));
        assert_eq!(envelope.error_payload().map(String::as_str), Some("TEAPOT"));
        assert_eq!(envelope.headers().get("x-inner").unwrap(), "kept");
    }

    #[tokio::test]
    async fn test_first_match_wins_and_later_translators_skipped() {
        let later_calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&later_calls);
        let translation = ErrorTranslationMiddleware::new()
            .translator(|_, _| Some(Translation::new(StatusCode::CONFLICT, "first".to_string())))
            .translator(move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                Some(Translation::new(StatusCode::GONE, "second".to_string()))
            });
        let handler = Middleware::wrap(&translation, failing_with(Teapot));

        let envelope = handler.call(ctx()).await.unwrap();

        assert_eq!(envelope.status(), Some(StatusCode::CONFLICT));
        assert_eq!(envelope.error_payload().map(String::as_str), Some("first"));
        assert_eq!(later_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_declining_translators_are_skipped() {
        let translation = ErrorTranslationMiddleware::new()
            .on(|_: &RandomError, _| Translation::new(StatusCode::IM_A_TEAPOT, "TEAPOT".to_string()))
            .on(|err: &StorageError, _| {
                Translation::new(StatusCode::FAILED_DEPENDENCY, format!("DATABASE: {}", err.0))
            });

        let storage_err = anyhow::Error::new(StorageError("locked".to_string()));
        let translated = translation.translate(&storage_err, &Span::none()).unwrap();
        assert_eq!(translated.status, StatusCode::FAILED_DEPENDENCY);
        assert_eq!(translated.payload.as_deref(), Some("DATABASE: locked"));
    }

    #[tokio::test]
    async fn test_status_only_translation() {
        let translation = ErrorTranslationMiddleware::new()
            .translator(|_, _| Some(Translation::status_only(StatusCode::SERVICE_UNAVAILABLE)));
        let handler = Middleware::wrap(&translation, failing_with(Teapot));

        let envelope = handler.call(ctx()).await.unwrap();

        assert!(envelope.error_occurred());
        assert!(envelope.error_payload().is_none());
        assert_eq!(envelope.final_status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_unmatched_defaults_to_internal() {
        let translation: ErrorTranslationMiddleware<String> = ErrorTranslationMiddleware::new();
        assert!(translation.is_empty());
        let handler = Middleware::wrap(&translation, failing_with(Teapot));

        let err = handler.call(ctx()).await.unwrap_err();

        let pipeline = err.as_pipeline().unwrap();
        assert_eq!(pipeline.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(pipeline.code(), "INTERNAL");
        assert_eq!(err.headers().get("x-inner").unwrap(), "kept");
    }

    #[tokio::test]
    async fn test_unmatched_propagate_keeps_domain_error() {
        let translation: ErrorTranslationMiddleware<String> =
            ErrorTranslationMiddleware::new().unmatched(Unmatched::Propagate);
        let handler = Middleware::wrap(&translation, failing_with(Teapot));

        let err = handler.call(ctx()).await.unwrap_err();

        assert!(err.as_domain().unwrap().downcast_ref::<Teapot>().is_some());
    }

    #[tokio::test]
    async fn test_pipeline_errors_pass_through() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let translation = ErrorTranslationMiddleware::new().translator(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Some(Translation::new(StatusCode::IM_A_TEAPOT, "never".to_string()))
        });
        let core: H = Handler::from_fn(|_ctx| async move {
            Err(PipelineError::bad_request("INVALID_BODY", "eof").into())
        });
        let handler = Middleware::wrap(&translation, core);

        let err = handler.call(ctx()).await.unwrap_err();

        assert_eq!(err.as_pipeline().unwrap().code(), "INVALID_BODY");
        assert_eq!(seen.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_success_untouched() {
        let translation: ErrorTranslationMiddleware<String> = ErrorTranslationMiddleware::new();
        let core: H = Handler::from_fn(|_ctx| async move { Ok(Envelope::ok("fine".to_string())) });
        let handler = Middleware::wrap(&translation, core);

        let envelope = handler.call(ctx()).await.unwrap();
        assert_eq!(envelope.payload().map(String::as_str), Some("fine"));
    }
}

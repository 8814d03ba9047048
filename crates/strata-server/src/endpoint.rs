//! The dispatcher.
//!
//! An [`Endpoint`] owns one composed handler. The middleware chain is applied
//! around the core handler exactly once, in [`EndpointBuilder::build`]; every
//! request then runs the same handler graph.
//!
//! Each dispatch:
//!
//! 1. builds a [`RequestContext`] holding the shared service provider, the raw
//!    request and an `endpoint` span
//! 2. runs the composed handler
//! 3. writes the outcome as an HTTP response
//!
//! | Outcome | Response |
//! |---------|----------|
//! | envelope | its status (default 200, or 500 on error), headers and serialized body (`null` for a payload-less failure under the codec) |
//! | pipeline error | its status, the JSON error body, carried headers |
//! | domain error | logged, 500 with an empty body, carried headers |

use std::sync::Arc;

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, Response, StatusCode};
use http_body_util::Full;
use strata_core::{
    BoxFuture, ErrorKind, Handler, HandlerResult, HttpResponse, PipelineError, RawRequest,
    RequestContext, RequestId, REQUEST_ID_HEADER,
};
use strata_middleware::{Chain, JSON_CONTENT_TYPE};
use tracing::{Instrument, Span};

/// A type-erased endpoint the router can hold.
pub trait Dispatch: Send + Sync + 'static {
    /// Returns the endpoint name.
    fn name(&self) -> &str;

    /// Runs the endpoint on a buffered request.
    fn dispatch(&self, request: RawRequest) -> BoxFuture<'static, HttpResponse>;
}

/// A core handler composed with its middleware chain.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use strata_core::{Empty, Envelope, Handler};
/// use strata_middleware::{Chain, CodecSettings, ErrorTranslationMiddleware};
/// use strata_server::Endpoint;
///
/// let core = Handler::from_fn(|_ctx| async move { Ok(Envelope::ok("pong".to_string())) });
/// let endpoint = Endpoint::<(), Empty, Empty, String, String>::builder("ping", Arc::new(()), core)
///     .chain(Chain::standard(ErrorTranslationMiddleware::new(), CodecSettings::default()))
///     .build();
///
/// assert_eq!(endpoint.name(), "ping");
/// assert_eq!(
///     endpoint.middleware(),
///     &["request_id", "request_logger", "codec", "error_translation"]
/// );
/// ```
pub struct Endpoint<S, B, Q, T, E> {
    name: Arc<str>,
    service: Arc<S>,
    handler: Handler<S, B, Q, T, E>,
    middleware: Vec<&'static str>,
}

impl<S, B, Q, T, E> Endpoint<S, B, Q, T, E>
where
    S: Send + Sync + 'static,
    B: Send + 'static,
    Q: Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    /// Starts building an endpoint around `core`.
    pub fn builder(
        name: impl Into<String>,
        service: Arc<S>,
        core: Handler<S, B, Q, T, E>,
    ) -> EndpointBuilder<S, B, Q, T, E> {
        EndpointBuilder {
            name: name.into(),
            service,
            core,
            chain: Chain::new(),
        }
    }

    /// Returns the endpoint name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the composed middleware names, outermost first.
    #[must_use]
    pub fn middleware(&self) -> &[&'static str] {
        &self.middleware
    }

    /// Returns the shared service provider.
    #[must_use]
    pub fn service(&self) -> &Arc<S> {
        &self.service
    }

    /// Runs the composed handler and writes the outcome as a response.
    pub async fn dispatch(&self, request: RawRequest) -> HttpResponse {
        run(
            Arc::clone(&self.name),
            Arc::clone(&self.service),
            self.handler.clone(),
            request,
        )
        .await
    }
}

async fn run<S, B, Q, T, E>(
    name: Arc<str>,
    service: Arc<S>,
    handler: Handler<S, B, Q, T, E>,
    request: RawRequest,
) -> HttpResponse
where
    S: Send + Sync + 'static,
    B: Send + 'static,
    Q: Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    let span = tracing::info_span!("endpoint", endpoint = %name);
    let ctx = RequestContext::new(service, request).with_span(span.clone());
    let result = handler.call(ctx).instrument(span.clone()).await;
    into_response(result, &span)
}

fn into_response<T, E>(result: HandlerResult<T, E>, span: &Span) -> HttpResponse {
    let err = match result {
        Ok(envelope) => {
            let (status, headers, body) = envelope.into_response_parts();
            return build(status, headers, body);
        }
        Err(err) => err,
    };

    let (kind, headers) = err.into_parts();
    match kind {
        ErrorKind::Pipeline(pipeline) => error_response(&pipeline, headers),
        ErrorKind::Domain(domain) => {
            tracing::error!(parent: span, error = ?domain, "unhandled domain error");
            build(StatusCode::INTERNAL_SERVER_ERROR, headers, Bytes::new())
        }
    }
}

/// Writes a pipeline error as a JSON error response.
///
/// `headers` are kept; the content type is set to JSON.
#[must_use]
pub fn error_response(error: &PipelineError, mut headers: HeaderMap) -> HttpResponse {
    match error.to_json() {
        Ok(body) => {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
            build(error.status(), headers, body)
        }
        Err(err) => {
            tracing::error!(error = %err, code = error.code(), "failed to encode error body");
            build(error.status(), headers, Bytes::new())
        }
    }
}

/// Response headers carrying the correlation id for a response written
/// outside any endpoint chain (unmatched routes, unreadable bodies).
///
/// The incoming `X-Request-Id` is reused when valid, otherwise a new one is
/// generated.
#[must_use]
pub fn correlation_headers(incoming: &HeaderMap) -> HeaderMap {
    let request_id = incoming
        .get(REQUEST_ID_HEADER)
        .and_then(RequestId::from_header)
        .unwrap_or_else(RequestId::generate);
    let mut headers = HeaderMap::new();
    headers.insert(
        HeaderName::from_static(REQUEST_ID_HEADER),
        request_id.header_value().clone(),
    );
    headers
}

fn build(status: StatusCode, headers: HeaderMap, body: Bytes) -> HttpResponse {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

impl<S, B, Q, T, E> Dispatch for Endpoint<S, B, Q, T, E>
where
    S: Send + Sync + 'static,
    B: Send + 'static,
    Q: Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn dispatch(&self, request: RawRequest) -> BoxFuture<'static, HttpResponse> {
        Box::pin(run(
            Arc::clone(&self.name),
            Arc::clone(&self.service),
            self.handler.clone(),
            request,
        ))
    }
}

impl<S, B, Q, T, E> std::fmt::Debug for Endpoint<S, B, Q, T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("name", &self.name)
            .field("middleware", &self.middleware)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Endpoint`].
pub struct EndpointBuilder<S, B, Q, T, E> {
    name: String,
    service: Arc<S>,
    core: Handler<S, B, Q, T, E>,
    chain: Chain<S, B, Q, T, E>,
}

impl<S, B, Q, T, E> EndpointBuilder<S, B, Q, T, E>
where
    S: 'static,
    B: 'static,
    Q: 'static,
    T: 'static,
    E: 'static,
{
    /// Sets the middleware chain. Without one the core handler runs bare.
    #[must_use]
    pub fn chain(mut self, chain: Chain<S, B, Q, T, E>) -> Self {
        self.chain = chain;
        self
    }

    /// Composes the chain around the core handler.
    #[must_use]
    pub fn build(self) -> Endpoint<S, B, Q, T, E> {
        Endpoint {
            name: self.name.into(),
            service: self.service,
            handler: self.chain.compose(self.core),
            middleware: self.chain.names(),
        }
    }
}

impl<S, B, Q, T, E> std::fmt::Debug for EndpointBuilder<S, B, Q, T, E>
where
    S: 'static,
    B: 'static,
    Q: 'static,
    T: 'static,
    E: 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointBuilder")
            .field("name", &self.name)
            .field("chain", &self.chain)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::HeaderName;
    use http_body_util::BodyExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use strata_core::{Empty, Envelope, HandlerError, REQUEST_ID_HEADER};
    use strata_middleware::{CodecSettings, ErrorTranslationMiddleware, FnMiddleware, Translation};

    type Core = Handler<AtomicUsize, Empty, Empty, String, String>;

    fn request() -> RawRequest {
        http::Request::builder()
            .uri("/ping")
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    async fn body_of(response: HttpResponse) -> Bytes {
        response.into_body().collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn test_success_with_standard_chain() {
        let core: Core =
            Handler::from_fn(|ctx: RequestContext<AtomicUsize, Empty, Empty>| async move {
                ctx.service().fetch_add(1, Ordering::SeqCst);
                Ok(Envelope::ok("pong".to_string()))
            });
        let endpoint = Endpoint::builder("ping", Arc::new(AtomicUsize::new(0)), core)
            .chain(Chain::standard(ErrorTranslationMiddleware::new(), CodecSettings::default()))
            .build();

        let response = endpoint.dispatch(request()).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), JSON_CONTENT_TYPE);
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
        assert_eq!(body_of(response).await, Bytes::from_static(b"\"pong\""));
        assert_eq!(endpoint.service().load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_bare_envelope_without_codec_has_empty_body() {
        let core: Core = Handler::from_fn(|_ctx| async move {
            Ok(Envelope::ok("unsent".to_string()).with_status(StatusCode::ACCEPTED))
        });
        let endpoint = Endpoint::builder("bare", Arc::new(AtomicUsize::new(0)), core).build();

        let response = endpoint.dispatch(request()).await;

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert!(body_of(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_pipeline_error_written_as_json() {
        let core: Core = Handler::from_fn(|_ctx| async move {
            Err(HandlerError::from(PipelineError::bad_request("INVALID_BODY", "eof"))
                .with_header(HeaderName::from_static("x-trace"), HeaderValue::from_static("t")))
        });
        let endpoint = Endpoint::builder("bad", Arc::new(AtomicUsize::new(0)), core).build();

        let response = endpoint.dispatch(request()).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), JSON_CONTENT_TYPE);
        assert_eq!(response.headers().get("x-trace").unwrap(), "t");
        let body: serde_json::Value = serde_json::from_slice(&body_of(response).await).unwrap();
        assert_eq!(body["code"], "INVALID_BODY");
        assert_eq!(body["message"], "eof");
    }

    #[tokio::test]
    async fn test_untranslated_domain_error_is_500_with_empty_body() {
        let core: Core = Handler::from_fn(|_ctx| async move {
            Err(HandlerError::domain(anyhow::anyhow!("disk on fire")))
        });
        let endpoint = Endpoint::builder("fatal", Arc::new(AtomicUsize::new(0)), core)
            .chain(Chain::new().with(strata_middleware::RequestIdMiddleware::new()))
            .build();

        let response = endpoint.dispatch(request()).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
        assert!(body_of(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_status_only_translation_writes_null_error_payload() {
        let core: Core = Handler::from_fn(|_ctx| async move {
            Err(HandlerError::domain(anyhow::anyhow!("already exists")))
        });
        let translation = ErrorTranslationMiddleware::new()
            .translator(|_, _| Some(Translation::status_only(StatusCode::CONFLICT)));
        let endpoint = Endpoint::builder("conflict", Arc::new(AtomicUsize::new(0)), core)
            .chain(Chain::standard(translation, CodecSettings::default()))
            .build();

        let response = endpoint.dispatch(request()).await;

        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), JSON_CONTENT_TYPE);
        assert_eq!(body_of(response).await, Bytes::from_static(b"null"));
    }

    #[tokio::test]
    async fn test_chain_composed_once() {
        let wraps = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&wraps);
        let counting = FnMiddleware::new("counting", move |inner: Core| {
            counter.fetch_add(1, Ordering::SeqCst);
            inner
        });
        let core: Core = Handler::from_fn(|_ctx| async move { Ok(Envelope::ok("x".to_string())) });
        let endpoint = Endpoint::builder("once", Arc::new(AtomicUsize::new(0)), core)
            .chain(Chain::new().with(counting))
            .build();

        for _ in 0..3 {
            endpoint.dispatch(request()).await;
        }

        assert_eq!(wraps.load(Ordering::SeqCst), 1);
        assert_eq!(endpoint.middleware(), &["counting"]);
    }

    #[tokio::test]
    async fn test_dispatch_through_trait_object() {
        let core: Core = Handler::from_fn(|_ctx| async move { Ok(Envelope::ok("dyn".to_string())) });
        let endpoint: Arc<dyn Dispatch> = Arc::new(
            Endpoint::builder("dyn", Arc::new(AtomicUsize::new(0)), core)
                .chain(Chain::standard(ErrorTranslationMiddleware::new(), CodecSettings::default()))
                .build(),
        );

        assert_eq!(endpoint.name(), "dyn");
        let response = endpoint.dispatch(request()).await;
        assert_eq!(body_of(response).await, Bytes::from_static(b"\"dyn\""));
    }

    #[test]
    fn test_correlation_headers() {
        let mut incoming = HeaderMap::new();
        incoming.insert(REQUEST_ID_HEADER, HeaderValue::from_static("abc-1"));
        assert_eq!(correlation_headers(&incoming)[REQUEST_ID_HEADER], "abc-1");

        let generated = correlation_headers(&HeaderMap::new());
        assert_eq!(generated[REQUEST_ID_HEADER].len(), 36);
    }
}

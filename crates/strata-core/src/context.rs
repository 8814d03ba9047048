//! Per-request context.

use std::collections::HashMap;
use std::sync::Arc;

use http::{Method, Uri};
use tracing::Span;

use crate::request_id::RequestId;
use crate::RawRequest;

/// Path parameters extracted by the host router.
///
/// The router stores them in the raw request's extensions; read them with
/// [`RequestContext::path_param`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(HashMap<String, String>);

impl PathParams {
    /// Creates an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a parameter by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Inserts a parameter.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    /// Returns the number of parameters.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<HashMap<String, String>> for PathParams {
    fn from(params: HashMap<String, String>) -> Self {
        Self(params)
    }
}

/// The typed container passed through the middleware chain.
///
/// Type parameters:
///
/// - `S` - the service provider, constructed once and shared read-only by every request
/// - `B` - the decoded request body
/// - `Q` - the decoded query parameters
///
/// The body and query start out absent and are filled in by the codec stage.
/// The tracing span is the request's logger handle: stages that add
/// structured fields replace it with a child span.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use bytes::Bytes;
/// use http_body_util::Full;
/// use strata_core::RequestContext;
///
/// struct Service { greeting: &'static str }
///
/// let request = http::Request::builder()
///     .uri("/ping?msg=hi")
///     .body(Full::new(Bytes::new()))
///     .unwrap();
///
/// let ctx: RequestContext<Service, (), ()> =
///     RequestContext::new(Arc::new(Service { greeting: "hello" }), request);
///
/// assert_eq!(ctx.service().greeting, "hello");
/// assert_eq!(ctx.uri().query(), Some("msg=hi"));
/// assert!(ctx.body().is_none());
/// ```
pub struct RequestContext<S, B, Q> {
    service: Arc<S>,
    body: Option<B>,
    query: Option<Q>,
    request: RawRequest,
    span: Span,
    request_id: Option<RequestId>,
}

impl<S, B, Q> RequestContext<S, B, Q> {
    /// Creates a context for a raw request.
    ///
    /// The span defaults to the currently entered span.
    pub fn new(service: Arc<S>, request: RawRequest) -> Self {
        Self {
            service,
            body: None,
            query: None,
            request,
            span: Span::current(),
            request_id: None,
        }
    }

    /// Replaces the span, builder style.
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Returns the shared service provider.
    pub fn service(&self) -> &S {
        &self.service
    }

    /// Returns a new handle to the shared service provider.
    pub fn service_handle(&self) -> Arc<S> {
        Arc::clone(&self.service)
    }

    /// Returns the decoded body, if the codec has run.
    pub fn body(&self) -> Option<&B> {
        self.body.as_ref()
    }

    /// Takes the decoded body out of the context.
    pub fn take_body(&mut self) -> Option<B> {
        self.body.take()
    }

    /// Stores the decoded body.
    pub fn set_body(&mut self, body: B) {
        self.body = Some(body);
    }

    /// Returns the decoded query parameters, if the codec has run.
    pub fn query(&self) -> Option<&Q> {
        self.query.as_ref()
    }

    /// Takes the decoded query parameters out of the context.
    pub fn take_query(&mut self) -> Option<Q> {
        self.query.take()
    }

    /// Stores the decoded query parameters.
    pub fn set_query(&mut self, query: Q) {
        self.query = Some(query);
    }

    /// Returns the raw request.
    pub fn request(&self) -> &RawRequest {
        &self.request
    }

    /// Returns the raw request for modification.
    pub fn request_mut(&mut self) -> &mut RawRequest {
        &mut self.request
    }

    /// Replaces the raw request, returning the previous one.
    pub fn replace_request(&mut self, request: RawRequest) -> RawRequest {
        std::mem::replace(&mut self.request, request)
    }

    /// Returns the request method.
    pub fn method(&self) -> &Method {
        self.request.method()
    }

    /// Returns the request URI.
    pub fn uri(&self) -> &Uri {
        self.request.uri()
    }

    /// Returns a path parameter captured by the host router.
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.request
            .extensions()
            .get::<PathParams>()
            .and_then(|params| params.get(name))
    }

    /// Returns the logger span.
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Replaces the logger span.
    pub fn set_span(&mut self, span: Span) {
        self.span = span;
    }

    /// Returns the correlation identifier, once assigned.
    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    /// Assigns the correlation identifier.
    pub fn set_request_id(&mut self, request_id: RequestId) {
        self.request_id = Some(request_id);
    }
}

impl<S, B, Q> std::fmt::Debug for RequestContext<S, B, Q> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("method", self.request.method())
            .field("uri", self.request.uri())
            .field("request_id", &self.request_id)
            .field("body_decoded", &self.body.is_some())
            .field("query_decoded", &self.query.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http_body_util::Full;

    struct Counter {
        start: u32,
    }

    fn request(uri: &str) -> RawRequest {
        http::Request::builder()
            .uri(uri)
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    #[test]
    fn test_service_is_shared() {
        let service = Arc::new(Counter { start: 3 });
        let a: RequestContext<Counter, (), ()> = RequestContext::new(Arc::clone(&service), request("/"));
        let b: RequestContext<Counter, (), ()> = RequestContext::new(Arc::clone(&service), request("/"));

        assert_eq!(a.service().start, 3);
        assert!(Arc::ptr_eq(&a.service_handle(), &b.service_handle()));
    }

    #[test]
    fn test_body_and_query_start_absent() {
        let mut ctx: RequestContext<Counter, String, u8> =
            RequestContext::new(Arc::new(Counter { start: 0 }), request("/"));
        assert!(ctx.body().is_none());
        assert!(ctx.query().is_none());

        ctx.set_body("payload".to_string());
        ctx.set_query(5);
        assert_eq!(ctx.body().map(String::as_str), Some("payload"));
        assert_eq!(ctx.take_query(), Some(5));
        assert!(ctx.query().is_none());
    }

    #[test]
    fn test_path_param_from_extensions() {
        let mut raw = request("/get_value/alpha");
        let mut params = PathParams::new();
        params.insert("key", "alpha");
        raw.extensions_mut().insert(params);

        let ctx: RequestContext<Counter, (), ()> = RequestContext::new(Arc::new(Counter { start: 0 }), raw);
        assert_eq!(ctx.path_param("key"), Some("alpha"));
        assert_eq!(ctx.path_param("missing"), None);
    }

    #[test]
    fn test_replace_request() {
        let mut ctx: RequestContext<Counter, (), ()> =
            RequestContext::new(Arc::new(Counter { start: 0 }), request("/old"));
        let previous = ctx.replace_request(request("/new"));
        assert_eq!(previous.uri().path(), "/old");
        assert_eq!(ctx.uri().path(), "/new");
    }

    #[test]
    fn test_request_id_assignment() {
        let mut ctx: RequestContext<Counter, (), ()> =
            RequestContext::new(Arc::new(Counter { start: 0 }), request("/"));
        assert!(ctx.request_id().is_none());

        let id = RequestId::generate();
        ctx.set_request_id(id.clone());
        assert_eq!(ctx.request_id(), Some(&id));
    }
}

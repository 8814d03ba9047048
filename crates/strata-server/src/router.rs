//! Request routing and path matching.
//!
//! Routes map an HTTP method and a path template to a type-erased
//! [`Dispatch`] endpoint. Templates use `{name}` segments for path
//! parameters; matched values are attached to the request's extensions as
//! [`PathParams`] before the endpoint runs, so handlers read them with
//! [`RequestContext::path_param`](strata_core::RequestContext::path_param).
//!
//! Routes are checked in registration order; the first match wins.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use http::Method;
//! use strata_core::{Empty, Envelope, Handler};
//! use strata_server::{Endpoint, Router};
//!
//! let core = Handler::from_fn(|_ctx| async move { Ok(Envelope::ok(())) });
//! let get_value = Endpoint::<(), Empty, Empty, (), ()>::builder("get_value", Arc::new(()), core).build();
//!
//! let router = Router::new().route(Method::POST, "/get_value/{key}", get_value);
//!
//! let matched = router.match_route(&Method::POST, "/get_value/a").unwrap();
//! assert_eq!(matched.endpoint().name(), "get_value");
//! assert_eq!(matched.params().get("key"), Some("a"));
//! assert!(router.match_route(&Method::GET, "/get_value/a").is_none());
//! ```

use std::sync::Arc;

use http::{HeaderMap, Method, StatusCode};
use strata_core::{HttpResponse, PathParams, PipelineError, RawRequest};

use crate::endpoint::{correlation_headers, error_response, Dispatch};

/// A matched route with extracted path parameters.
#[derive(Clone)]
pub struct RouteMatch {
    endpoint: Arc<dyn Dispatch>,
    params: PathParams,
}

impl RouteMatch {
    /// Returns the matched endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &Arc<dyn Dispatch> {
        &self.endpoint
    }

    /// Returns the extracted path parameters.
    #[must_use]
    pub fn params(&self) -> &PathParams {
        &self.params
    }
}

impl std::fmt::Debug for RouteMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteMatch")
            .field("endpoint", &self.endpoint.name())
            .field("params", &self.params)
            .finish()
    }
}

/// A segment of a path template.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PathSegment {
    /// A literal segment (e.g., "get_value")
    Literal(String),

    /// A parameter segment (e.g., "{key}")
    Param(String),
}

/// A registered route.
#[derive(Clone)]
struct Route {
    method: Method,
    segments: Vec<PathSegment>,
    pattern: String,
    endpoint: Arc<dyn Dispatch>,
}

impl Route {
    fn new(method: Method, pattern: &str, endpoint: Arc<dyn Dispatch>) -> Self {
        Self {
            method,
            segments: parse_segments(pattern),
            pattern: pattern.to_string(),
            endpoint,
        }
    }

    /// Returns extracted parameters if the route matches `path`.
    fn match_path(&self, path: &str) -> Option<PathParams> {
        let actual: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if actual.len() != self.segments.len() {
            return None;
        }

        let mut params = PathParams::new();
        for (segment, value) in self.segments.iter().zip(actual) {
            match segment {
                PathSegment::Literal(expected) if expected != value => return None,
                PathSegment::Literal(_) => {}
                PathSegment::Param(name) => params.insert(name.as_str(), value),
            }
        }
        Some(params)
    }
}

fn parse_segments(pattern: &str) -> Vec<PathSegment> {
    pattern
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| match s.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            Some(name) => PathSegment::Param(name.to_string()),
            None => PathSegment::Literal(s.to_string()),
        })
        .collect()
}

/// HTTP request router.
///
/// Unmatched requests get `404` with the JSON body
/// `{"code":"NOT_FOUND","message":"..."}`.
#[derive(Clone, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    /// Creates an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Adds a route and returns the router.
    #[must_use]
    pub fn route(mut self, method: Method, pattern: impl AsRef<str>, endpoint: impl Dispatch) -> Self {
        self.add_route(method, pattern, endpoint);
        self
    }

    /// Adds a route.
    pub fn add_route(&mut self, method: Method, pattern: impl AsRef<str>, endpoint: impl Dispatch) {
        self.add_shared(method, pattern, Arc::new(endpoint));
    }

    /// Adds a route to an endpoint that may be shared between routes.
    pub fn add_shared(&mut self, method: Method, pattern: impl AsRef<str>, endpoint: Arc<dyn Dispatch>) {
        let pattern = pattern.as_ref();
        tracing::debug!(%method, pattern, endpoint = endpoint.name(), "route registered");
        self.routes.push(Route::new(method, pattern, endpoint));
    }

    /// Returns the number of registered routes.
    #[must_use]
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Returns `(method, pattern, endpoint name)` for every route in order.
    #[must_use]
    pub fn routes(&self) -> Vec<(&Method, &str, &str)> {
        self.routes
            .iter()
            .map(|r| (&r.method, r.pattern.as_str(), r.endpoint.name()))
            .collect()
    }

    /// Matches a method and path to a route.
    #[must_use]
    pub fn match_route(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        self.routes
            .iter()
            .filter(|route| route.method == *method)
            .find_map(|route| {
                route.match_path(path).map(|params| RouteMatch {
                    endpoint: Arc::clone(&route.endpoint),
                    params,
                })
            })
    }

    /// Routes a buffered request to its endpoint.
    pub async fn handle(&self, mut request: RawRequest) -> HttpResponse {
        let method = request.method().clone();
        let path = request.uri().path().to_string();

        match self.match_route(&method, &path) {
            Some(matched) => {
                request.extensions_mut().insert(matched.params);
                matched.endpoint.dispatch(request).await
            }
            None => {
                tracing::debug!(%method, path, "no route matched");
                not_found(&method, &path, correlation_headers(request.headers()))
            }
        }
    }
}

fn not_found(method: &Method, path: &str, headers: HeaderMap) -> HttpResponse {
    let error = PipelineError::new(
        StatusCode::NOT_FOUND,
        "NOT_FOUND",
        format!("no route for {method} {path}"),
    );
    error_response(&error, headers)
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes())
            .finish()
    }
}

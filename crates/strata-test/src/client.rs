//! In-memory test client.

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use http::Method;
use serde::Serialize;
use strata_core::{BoxFuture, HttpResponse, RawRequest};
use strata_server::Router;

use crate::error::TestError;
use crate::request::{TestRequest, TestRequestBuilder};
use crate::response::TestResponse;

type Service = Arc<dyn Fn(RawRequest) -> BoxFuture<'static, HttpResponse> + Send + Sync>;

/// A client that sends requests straight into a [`Router`], without sockets.
///
/// Requests go through routing, the composed middleware chain and the
/// response writing exactly as they would behind the HTTP host.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use http::{Method, StatusCode};
/// use strata_core::{Empty, Envelope, Handler};
/// use strata_middleware::{Chain, CodecSettings, ErrorTranslationMiddleware};
/// use strata_server::{Endpoint, Router};
/// use strata_test::TestClient;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let core = Handler::from_fn(|_ctx| async move { Ok(Envelope::ok("pong".to_string())) });
/// let ping = Endpoint::<(), Empty, Empty, String, String>::builder("ping", Arc::new(()), core)
///     .chain(Chain::standard(ErrorTranslationMiddleware::new(), CodecSettings::default()))
///     .build();
///
/// let client = TestClient::new(Router::new().route(Method::GET, "/ping", ping));
/// let response = client.get("/ping").send().await;
///
/// response.assert_status(StatusCode::OK);
/// assert_eq!(response.text().unwrap(), r#""pong""#);
/// # }
/// ```
#[must_use]
pub struct TestClient {
    service: Service,
    default_headers: Vec<(String, String)>,
}

impl TestClient {
    /// Creates a client over a router.
    pub fn new(router: Router) -> Self {
        Self::from_router(Arc::new(router))
    }

    /// Creates a client over a shared router.
    pub fn from_router(router: Arc<Router>) -> Self {
        Self::from_fn(move |request| {
            let router = Arc::clone(&router);
            async move { router.handle(request).await }
        })
    }

    /// Creates a client over any request-to-response function.
    pub fn from_fn<F, Fut>(service: F) -> Self
    where
        F: Fn(RawRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HttpResponse> + Send + 'static,
    {
        Self {
            service: Arc::new(move |request| Box::pin(service(request))),
            default_headers: Vec::new(),
        }
    }

    /// Adds a header sent with every request.
    pub fn with_default_header(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// Creates a GET request.
    pub fn get(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        TestClientRequest::new(self, TestRequest::get(uri))
    }

    /// Creates a POST request.
    pub fn post(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        TestClientRequest::new(self, TestRequest::post(uri))
    }

    /// Creates a PUT request.
    pub fn put(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        TestClientRequest::new(self, TestRequest::put(uri))
    }

    /// Creates a DELETE request.
    pub fn delete(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        TestClientRequest::new(self, TestRequest::delete(uri))
    }

    /// Creates a request with any method.
    pub fn request(&self, method: Method, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        TestClientRequest::new(self, TestRequestBuilder::new(method, uri))
    }

    async fn send_internal(&self, request: TestRequest) -> Result<TestResponse, TestError> {
        let response = (self.service)(request.into_raw()).await;
        TestResponse::from_http(response).await
    }
}

impl std::fmt::Debug for TestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestClient")
            .field("default_headers", &self.default_headers)
            .finish_non_exhaustive()
    }
}

/// A request builder bound to a [`TestClient`].
#[must_use]
#[derive(Debug)]
pub struct TestClientRequest<'a> {
    client: &'a TestClient,
    builder: TestRequestBuilder,
}

impl<'a> TestClientRequest<'a> {
    fn new(client: &'a TestClient, builder: TestRequestBuilder) -> Self {
        let builder = client
            .default_headers
            .iter()
            .fold(builder, |builder, (name, value)| builder.header(name, value));
        Self { client, builder }
    }

    /// Sets a header.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.builder = self.builder.header(name, value);
        self
    }

    /// Sets the Content-Type header.
    pub fn content_type(mut self, content_type: impl AsRef<str>) -> Self {
        self.builder = self.builder.content_type(content_type);
        self
    }

    /// Appends a URL-encoded query string.
    pub fn query<T: Serialize>(mut self, value: &T) -> Self {
        self.builder = self.builder.query(value);
        self
    }

    /// Sets the raw body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.builder = self.builder.body(body);
        self
    }

    /// Sets a JSON body.
    pub fn json<T: Serialize>(mut self, value: &T) -> Self {
        self.builder = self.builder.json(value);
        self
    }

    /// Sends the request.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the body cannot be read.
    pub async fn send(self) -> TestResponse {
        match self.try_send().await {
            Ok(response) => response,
            Err(e) => panic!("test request failed: {e}"),
        }
    }

    /// Sends the request and returns a `Result`.
    pub async fn try_send(self) -> Result<TestResponse, TestError> {
        let request = self.builder.build()?;
        self.client.send_internal(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use http_body_util::Full;
    use serde::{Deserialize, Serialize};
    use serde_json::json;
    use strata_core::{Empty, Envelope, Handler, RequestContext};
    use strata_middleware::{Chain, CodecSettings, ErrorTranslationMiddleware};
    use strata_server::Endpoint;

    #[derive(Debug, Default, Deserialize)]
    struct Greeting {
        name: String,
    }

    #[derive(Debug, Serialize)]
    struct Reply {
        message: String,
    }

    fn router() -> Router {
        let core = Handler::from_fn(|mut ctx: RequestContext<(), Greeting, Empty>| async move {
            let name = ctx.take_body().unwrap_or_default().name;
            let id = ctx.path_param("id").unwrap_or("-").to_string();
            Ok(Envelope::ok(Reply {
                message: format!("{id}:{name}"),
            }))
        });
        let greet = Endpoint::<(), Greeting, Empty, Reply, String>::builder("greet", Arc::new(()), core)
            .chain(Chain::standard(
                ErrorTranslationMiddleware::new(),
                CodecSettings::default(),
            ))
            .build();
        Router::new().route(Method::POST, "/greet/{id}", greet)
    }

    #[tokio::test]
    async fn test_router_roundtrip() {
        let client = TestClient::new(router());
        let response = client
            .post("/greet/7")
            .json(&json!({"name": "ada"}))
            .send()
            .await;

        response
            .assert_status(StatusCode::OK)
            .assert_header("content-type", "application/json")
            .assert_json_eq(&json!({"message": "7:ada"}));
        assert!(response.header("x-request-id").is_some());
    }

    #[tokio::test]
    async fn test_unmatched_route() {
        let client = TestClient::new(router());
        let response = client.get("/greet/7").send().await;

        response
            .assert_status(StatusCode::NOT_FOUND)
            .assert_json_field("code", &json!("NOT_FOUND"));
    }

    #[tokio::test]
    async fn test_default_header_is_sent() {
        let client = TestClient::new(router()).with_default_header("X-Request-Id", "fixed-id");
        let response = client.post("/greet/1").send().await;

        response.assert_header("x-request-id", "fixed-id");
    }

    #[tokio::test]
    async fn test_from_fn_service() {
        let client = TestClient::from_fn(|request: RawRequest| async move {
            let body = format!("{} {}", request.method(), request.uri());
            http::Response::new(Full::new(Bytes::from(body)))
        });

        let response = client
            .request(Method::PATCH, "/items")
            .query(&[("page", "2")])
            .send()
            .await;
        assert_eq!(response.text().unwrap(), "PATCH /items?page=2");
    }

    #[tokio::test]
    async fn test_try_send_reports_build_errors() {
        let client = TestClient::new(router());
        let result = client.get("/greet").header("bad header", "x").try_send().await;
        assert!(matches!(result, Err(TestError::InvalidHeader(_))));
    }
}

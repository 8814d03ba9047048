//! JSON body and query string codec.
//!
//! On the way in the codec decodes:
//!
//! - **Body**: JSON into `B`. An empty body is not decoded and yields
//!   `B::default()`. Malformed JSON is a `400 INVALID_BODY` pipeline error
//!   and the inner chain never runs.
//! - **Query**: the URL query string into `Q`. Unknown keys are ignored
//!   unless [`CodecSettings::forbid_unknown_keys`] is set, in which case they
//!   are a `400 UNKNOWN_QUERY_KEY` pipeline error.
//!
//! On the way out it serializes the success payload or the error payload
//! (whichever the envelope carries) to JSON, stores it as the envelope's
//! serialized body, and sets `content-type: application/json` unless an
//! inner stage already chose a content type. A failure without an error
//! payload is written as `null`. A serialization failure is a
//! `400 SERIALIZATION_FAILED` pipeline error.

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http_body_util::{BodyExt, Full};
use serde::de::{self, DeserializeOwned, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use strata_core::{Envelope, Handler, HandlerError, Outcome, PipelineError};

use crate::middleware::Middleware;

/// The JSON media type.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Codec configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecSettings {
    /// Reject query parameters the query type does not declare.
    #[serde(default)]
    pub forbid_unknown_keys: bool,
}

impl CodecSettings {
    /// Settings that reject unknown query keys.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            forbid_unknown_keys: true,
        }
    }
}

/// Middleware that bridges the wire format and the typed context/envelope.
#[derive(Debug, Clone, Copy, Default)]
pub struct CodecMiddleware {
    settings: CodecSettings,
}

impl CodecMiddleware {
    /// Creates the middleware.
    #[must_use]
    pub fn new(settings: CodecSettings) -> Self {
        Self { settings }
    }

    /// Returns the settings.
    #[must_use]
    pub fn settings(&self) -> CodecSettings {
        self.settings
    }
}

impl<S, B, Q, T, E> Middleware<S, B, Q, T, E> for CodecMiddleware
where
    S: Send + Sync + 'static,
    B: DeserializeOwned + Default + Send + 'static,
    Q: DeserializeOwned + Send + 'static,
    T: Serialize + Send + 'static,
    E: Serialize + Send + 'static,
{
    fn name(&self) -> &'static str {
        "codec"
    }

    fn wrap(&self, inner: Handler<S, B, Q, T, E>) -> Handler<S, B, Q, T, E> {
        let settings = self.settings;
        Handler::from_fn(move |mut ctx| {
            let inner = inner.clone();
            async move {
                let raw_body = ctx.request().body().clone();
                let decoded = match decode_body::<B>(raw_body).await {
                    Ok(body) => decode_query::<Q>(ctx.uri().query().unwrap_or_default(), settings)
                        .map(|query| (body, query)),
                    Err(err) => Err(err),
                };

                let (body, query) = match decoded {
                    Ok(decoded) => decoded,
                    Err(err) => {
                        tracing::debug!(
                            parent: ctx.span(),
                            code = err.code(),
                            error = %err.message(),
                            "request rejected by codec"
                        );
                        return Err(err.into());
                    }
                };
                ctx.set_body(body);
                ctx.set_query(query);

                let mut envelope = inner.call(ctx).await?;
                match encode(&envelope) {
                    Ok(bytes) => {
                        envelope.set_serialized_body(bytes);
                        if !envelope.headers().contains_key(CONTENT_TYPE) {
                            envelope
                                .headers_mut()
                                .insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
                        }
                        Ok(envelope)
                    }
                    Err(err) => {
                        let headers = std::mem::take(envelope.headers_mut());
                        let mut err = HandlerError::from(err);
                        err.headers_mut().extend(headers);
                        Err(err)
                    }
                }
            }
        })
    }
}

/// Decodes a JSON request body, defaulting when the body is empty.
pub async fn decode_body<B>(body: Full<Bytes>) -> Result<B, PipelineError>
where
    B: DeserializeOwned + Default,
{
    let bytes = body
        .collect()
        .await
        .unwrap_or_else(|never| match never {})
        .to_bytes();

    if bytes.is_empty() {
        return Ok(B::default());
    }

    serde_json::from_slice(&bytes)
        .map_err(|e| PipelineError::bad_request("INVALID_BODY", e.to_string()))
}

/// Decodes a URL query string.
pub fn decode_query<Q>(query: &str, settings: CodecSettings) -> Result<Q, PipelineError>
where
    Q: DeserializeOwned,
{
    if settings.forbid_unknown_keys {
        if let Some(fields) = declared_fields::<Q>() {
            let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query)
                .map_err(|e| PipelineError::bad_request("INVALID_QUERY", e.to_string()))?;
            if let Some((key, _)) = pairs.iter().find(|(key, _)| !fields.contains(&key.as_str())) {
                return Err(PipelineError::bad_request(
                    "UNKNOWN_QUERY_KEY",
                    format!("unknown query parameter `{key}`"),
                ));
            }
        }
    }

    serde_urlencoded::from_str(query)
        .map_err(|e| PipelineError::bad_request("INVALID_QUERY", e.to_string()))
}

/// Serializes whichever payload the envelope carries.
///
/// A failure without an error payload serializes as `null`.
pub fn encode<T, E>(envelope: &Envelope<T, E>) -> Result<Bytes, PipelineError>
where
    T: Serialize,
    E: Serialize,
{
    let encoded = match envelope.outcome() {
        Outcome::Success(payload) => serde_json::to_vec(payload),
        Outcome::Failure(error) => serde_json::to_vec(error),
    };

    encoded
        .map(Bytes::from)
        .map_err(|e| PipelineError::bad_request("SERIALIZATION_FAILED", e.to_string()))
}

/// Returns the field names a struct type declares to serde.
///
/// Types that are not plain structs (maps, flattened structs) return
/// `None` and accept any key.
fn declared_fields<Q: DeserializeOwned>() -> Option<&'static [&'static str]> {
    let mut probe = FieldProbe::default();
    let _ = Q::deserialize(&mut probe);
    probe.fields
}

/// A deserializer that records the field list of `deserialize_struct` and
/// then fails.
#[derive(Default)]
struct FieldProbe {
    fields: Option<&'static [&'static str]>,
}

impl<'de> Deserializer<'de> for &mut FieldProbe {
    type Error = de::value::Error;

    fn deserialize_any<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Self::Error> {
        Err(de::Error::custom("not a struct"))
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.fields = Some(fields);
        Err(de::Error::custom("fields recorded"))
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf option unit unit_struct newtype_struct seq tuple
        tuple_struct map enum identifier ignored_any
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use strata_core::{Empty, RequestContext};

    #[derive(Debug, Default, Deserialize, Serialize, PartialEq)]
    struct KeyValue {
        key: String,
        value: String,
    }

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct PingQuery {
        #[serde(default)]
        msg: Option<String>,
        #[serde(default)]
        mustfail: Option<u8>,
    }

    #[derive(Debug, Serialize)]
    struct Reply {
        message: String,
    }

    #[derive(Debug)]
    struct Unencodable;

    impl Serialize for Unencodable {
        fn serialize<Ser: serde::Serializer>(&self, _serializer: Ser) -> Result<Ser::Ok, Ser::Error> {
            Err(serde::ser::Error::custom("cannot encode"))
        }
    }

    fn ctx(uri: &str, body: &'static str) -> RequestContext<(), KeyValue, PingQuery> {
        let request = http::Request::builder()
            .method("POST")
            .uri(uri)
            .body(Full::new(Bytes::from_static(body.as_bytes())))
            .unwrap();
        RequestContext::new(Arc::new(()), request)
    }

    fn echo(calls: Arc<AtomicUsize>) -> Handler<(), KeyValue, PingQuery, KeyValue, String> {
        Handler::from_fn(move |mut ctx| {
            calls.fetch_add(1, Ordering::SeqCst);
            let body = ctx.take_body().unwrap_or_default();
            async move { Ok(Envelope::ok(body)) }
        })
    }

    #[tokio::test]
    async fn test_decodes_body_and_encodes_payload() {
        let calls = Arc::new(AtomicUsize::new(0));
        let handler = Middleware::wrap(&CodecMiddleware::default(), echo(Arc::clone(&calls)));

        let envelope = handler
            .call(ctx("/set_value", r#"{"key":"a","value":"b"}"#))
            .await
            .unwrap();

        let body: KeyValue = serde_json::from_slice(envelope.serialized_body().unwrap()).unwrap();
        assert_eq!(body, KeyValue { key: "a".into(), value: "b".into() });
        assert_eq!(envelope.headers().get(CONTENT_TYPE).unwrap(), JSON_CONTENT_TYPE);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_body_defaults() {
        let calls = Arc::new(AtomicUsize::new(0));
        let handler = Middleware::wrap(&CodecMiddleware::default(), echo(Arc::clone(&calls)));

        let envelope = handler.call(ctx("/set_value", "")).await.unwrap();

        assert_eq!(envelope.payload(), Some(&KeyValue::default()));
    }

    #[tokio::test]
    async fn test_malformed_body_short_circuits() {
        let calls = Arc::new(AtomicUsize::new(0));
        let handler = Middleware::wrap(&CodecMiddleware::default(), echo(Arc::clone(&calls)));

        let err = handler.call(ctx("/set_value", "{not json")).await.unwrap_err();

        let pipeline = err.as_pipeline().unwrap();
        assert_eq!(pipeline.status(), StatusCode::BAD_REQUEST);
        assert_eq!(pipeline.code(), "INVALID_BODY");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_query_is_decoded() {
        let handler: Handler<(), KeyValue, PingQuery, String, String> = Middleware::wrap(
            &CodecMiddleware::default(),
            Handler::from_fn(|ctx: RequestContext<(), KeyValue, PingQuery>| {
                let msg = ctx.query().and_then(|q| q.msg.clone()).unwrap_or_default();
                async move { Ok(Envelope::ok(msg)) }
            }),
        );

        let envelope = handler.call(ctx("/ping?msg=hello&other=1", "")).await.unwrap();
        assert_eq!(envelope.payload().map(String::as_str), Some("hello"));
    }

    #[test]
    fn test_unknown_keys_ignored_by_default() {
        let query: PingQuery = decode_query("msg=hi&extra=1", CodecSettings::default()).unwrap();
        assert_eq!(query.msg.as_deref(), Some("hi"));
    }

    #[test]
    fn test_unknown_keys_rejected_when_forbidden() {
        let err = decode_query::<PingQuery>("msg=hi&extra=1", CodecSettings::strict()).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "UNKNOWN_QUERY_KEY");
        assert!(err.message().contains("extra"));
    }

    #[test]
    fn test_declared_keys_accepted_when_forbidden() {
        let query: PingQuery = decode_query("msg=hi&mustfail=1", CodecSettings::strict()).unwrap();
        assert_eq!(query.mustfail, Some(1));
    }

    #[test]
    fn test_map_query_accepts_any_key_when_forbidden() {
        let query: HashMap<String, String> = decode_query("a=1&b=2", CodecSettings::strict()).unwrap();
        assert_eq!(query.len(), 2);
    }

    #[test]
    fn test_empty_query_type_rejects_keys_when_forbidden() {
        assert!(decode_query::<Empty>("", CodecSettings::strict()).is_ok());
        assert!(decode_query::<Empty>("a=1", CodecSettings::strict()).is_err());
        assert!(decode_query::<Empty>("a=1", CodecSettings::default()).is_ok());
    }

    #[test]
    fn test_invalid_query_value() {
        let err = decode_query::<PingQuery>("mustfail=yes", CodecSettings::default()).unwrap_err();
        assert_eq!(err.code(), "INVALID_QUERY");
    }

    #[test]
    fn test_encode_selects_error_payload() {
        let envelope: Envelope<Reply, KeyValue> = Envelope::failure(KeyValue {
            key: "code".into(),
            value: "DATABASE".into(),
        });
        let bytes = encode(&envelope).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value, serde_json::json!({"key": "code", "value": "DATABASE"}));
    }

    #[test]
    fn test_encode_failure_without_payload_is_null() {
        let envelope: Envelope<Reply, KeyValue> = Envelope::empty_failure();
        assert_eq!(encode(&envelope).unwrap(), Bytes::from_static(b"null"));
    }

    #[tokio::test]
    async fn test_serialization_failure_overrides_status() {
        let handler: Handler<(), Empty, Empty, Unencodable, String> = Middleware::wrap(
            &CodecMiddleware::default(),
            Handler::from_fn(|_ctx| async move {
                Ok(Envelope::ok(Unencodable).with_status(StatusCode::CREATED))
            }),
        );
        let request = http::Request::builder()
            .uri("/")
            .body(Full::new(Bytes::new()))
            .unwrap();

        let err = handler
            .call(RequestContext::new(Arc::new(()), request))
            .await
            .unwrap_err();

        let pipeline = err.as_pipeline().unwrap();
        assert_eq!(pipeline.status(), StatusCode::BAD_REQUEST);
        assert_eq!(pipeline.code(), "SERIALIZATION_FAILED");
    }

    #[tokio::test]
    async fn test_existing_content_type_kept() {
        let handler: Handler<(), Empty, Empty, Reply, String> = Middleware::wrap(
            &CodecMiddleware::default(),
            Handler::from_fn(|_ctx| async move {
                Ok(Envelope::ok(Reply { message: "hi".into() })
                    .with_header(CONTENT_TYPE, HeaderValue::from_static("application/vnd.demo+json")))
            }),
        );
        let request = http::Request::builder()
            .uri("/")
            .body(Full::new(Bytes::new()))
            .unwrap();

        let envelope = handler.call(RequestContext::new(Arc::new(()), request)).await.unwrap();
        assert_eq!(
            envelope.headers().get(CONTENT_TYPE).unwrap(),
            "application/vnd.demo+json"
        );
    }
}

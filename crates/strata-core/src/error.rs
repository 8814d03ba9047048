//! Error taxonomy for the request pipeline.
//!
//! The pipeline recognizes two kinds of failure:
//!
//! | Kind | Raised by | Resolved by |
//! |------|-----------|-------------|
//! | [`PipelineError`] | codec and other pipeline stages | the dispatcher, using its status |
//! | domain ([`anyhow::Error`]) | the core handler | collaborator-supplied error translators |
//!
//! A domain error that reaches the dispatcher untranslated is fatal to the
//! request and is answered with `500 Internal Server Error`.

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};
use serde::Serialize;
use thiserror::Error;

/// A pipeline-internal failure with a pre-assigned status code.
///
/// Serializes to the JSON error body `{"code": "...", "message": "..."}`.
///
/// # Example
///
/// ```
/// use http::StatusCode;
/// use strata_core::PipelineError;
///
/// let err = PipelineError::bad_request("INVALID_BODY", "expected value at line 1");
/// assert_eq!(err.status(), StatusCode::BAD_REQUEST);
/// assert_eq!(err.code(), "INVALID_BODY");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{code}: {message}")]
pub struct PipelineError {
    #[serde(skip)]
    status: StatusCode,
    code: String,
    message: String,
}

impl PipelineError {
    /// Creates a pipeline error.
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Creates a `400 Bad Request` pipeline error.
    pub fn bad_request(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }

    /// Creates the generic `500 Internal Server Error` pipeline error.
    ///
    /// The message never leaks details of the underlying failure.
    #[must_use]
    pub fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL",
            "internal server error",
        )
    }

    /// Returns the HTTP status.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the machine-readable code.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Returns the human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Serializes the JSON error body.
    pub fn to_json(&self) -> Result<Bytes, serde_json::Error> {
        serde_json::to_vec(self).map(Bytes::from)
    }
}

/// The two structural error kinds.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// A failure detected by the pipeline itself.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// An opaque error raised by the core handler.
    #[error(transparent)]
    Domain(anyhow::Error),
}

/// The error half of a handler result.
///
/// Besides the error itself, a `HandlerError` carries the response headers
/// accumulated on the way out, so stages such as request identity can still
/// attach their headers when the inner chain failed.
///
/// # Example
///
/// ```
/// use strata_core::HandlerError;
///
/// let err = HandlerError::domain(std::io::Error::other("disk full"));
/// assert!(err.as_domain().is_some());
/// assert!(err.as_pipeline().is_none());
/// ```
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct HandlerError {
    kind: ErrorKind,
    headers: HeaderMap,
}

impl HandlerError {
    /// Wraps a domain error.
    pub fn domain(error: impl Into<anyhow::Error>) -> Self {
        ErrorKind::Domain(error.into()).into()
    }

    /// Reassembles an error split with [`HandlerError::into_parts`].
    pub fn from_parts(kind: ErrorKind, headers: HeaderMap) -> Self {
        Self { kind, headers }
    }

    /// Returns the error kind.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Returns `true` for pipeline errors.
    pub fn is_pipeline(&self) -> bool {
        matches!(self.kind, ErrorKind::Pipeline(_))
    }

    /// Returns the pipeline error, if this is one.
    pub fn as_pipeline(&self) -> Option<&PipelineError> {
        match &self.kind {
            ErrorKind::Pipeline(err) => Some(err),
            ErrorKind::Domain(_) => None,
        }
    }

    /// Returns the domain error, if this is one.
    pub fn as_domain(&self) -> Option<&anyhow::Error> {
        match &self.kind {
            ErrorKind::Domain(err) => Some(err),
            ErrorKind::Pipeline(_) => None,
        }
    }

    /// Appends a response header to carry on the error path.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Returns the carried headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the carried headers for modification.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Splits the error into its kind and carried headers.
    pub fn into_parts(self) -> (ErrorKind, HeaderMap) {
        (self.kind, self.headers)
    }
}

impl From<ErrorKind> for HandlerError {
    fn from(kind: ErrorKind) -> Self {
        Self {
            kind,
            headers: HeaderMap::new(),
        }
    }
}

impl From<PipelineError> for HandlerError {
    fn from(err: PipelineError) -> Self {
        ErrorKind::Pipeline(err).into()
    }
}

impl From<anyhow::Error> for HandlerError {
    fn from(err: anyhow::Error) -> Self {
        ErrorKind::Domain(err).into()
    }
}

//! The typed response envelope.
//!
//! An [`Envelope`] is what a handler returns on the success path. It carries
//! either a success payload or an error payload, an optional explicit status,
//! the headers accumulated on the way out, and (once the codec has run) the
//! serialized body.

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};

/// The payload half of an [`Envelope`].
///
/// Exactly one of the two variants is ever meaningful, so the
/// "payload present iff no error" rule cannot be broken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T, E> {
    /// The handler succeeded with this payload.
    Success(T),
    /// The handler failed; the error payload may be absent.
    Failure(Option<E>),
}

/// Typed container for a handler's response.
///
/// # Status defaults
///
/// A status of `None` means "unset". When the envelope is finalized the
/// dispatcher substitutes `200 OK` for successes and
/// `500 Internal Server Error` for failures (see [`Envelope::final_status`]).
///
/// # Example
///
/// ```
/// use http::StatusCode;
/// use strata_core::Envelope;
///
/// let ok: Envelope<&str, ()> = Envelope::ok("pong");
/// assert_eq!(ok.final_status(), StatusCode::OK);
///
/// let failed: Envelope<(), &str> = Envelope::failure("boom");
/// assert!(failed.error_occurred());
/// assert_eq!(failed.final_status(), StatusCode::INTERNAL_SERVER_ERROR);
/// ```
#[derive(Debug, Clone)]
pub struct Envelope<T, E> {
    outcome: Outcome<T, E>,
    status: Option<StatusCode>,
    headers: HeaderMap,
    serialized_body: Option<Bytes>,
}

impl<T, E> Envelope<T, E> {
    /// Creates a successful envelope with an unset status.
    #[must_use]
    pub fn ok(payload: T) -> Self {
        Self::from_outcome(Outcome::Success(payload))
    }

    /// Creates a failed envelope carrying an error payload.
    #[must_use]
    pub fn failure(error: E) -> Self {
        Self::from_outcome(Outcome::Failure(Some(error)))
    }

    /// Creates a failed envelope without an error payload.
    #[must_use]
    pub fn empty_failure() -> Self {
        Self::from_outcome(Outcome::Failure(None))
    }

    fn from_outcome(outcome: Outcome<T, E>) -> Self {
        Self {
            outcome,
            status: None,
            headers: HeaderMap::new(),
            serialized_body: None,
        }
    }

    /// Sets an explicit status code.
    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    /// Appends a header value, keeping any values already set for the name.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Returns the outcome.
    pub fn outcome(&self) -> &Outcome<T, E> {
        &self.outcome
    }

    /// Consumes the envelope and returns the outcome.
    pub fn into_outcome(self) -> Outcome<T, E> {
        self.outcome
    }

    /// Returns `true` if the envelope carries a failure.
    pub fn error_occurred(&self) -> bool {
        matches!(self.outcome, Outcome::Failure(_))
    }

    /// Returns the success payload, if any.
    pub fn payload(&self) -> Option<&T> {
        match &self.outcome {
            Outcome::Success(payload) => Some(payload),
            Outcome::Failure(_) => None,
        }
    }

    /// Returns the error payload, if any.
    pub fn error_payload(&self) -> Option<&E> {
        match &self.outcome {
            Outcome::Success(_) => None,
            Outcome::Failure(error) => error.as_ref(),
        }
    }

    /// Returns the explicit status, or `None` if unset.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Sets an explicit status code.
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = Some(status);
    }

    /// Returns the status the response will be written with.
    pub fn final_status(&self) -> StatusCode {
        match (self.status, self.error_occurred()) {
            (Some(status), _) => status,
            (None, true) => StatusCode::INTERNAL_SERVER_ERROR,
            (None, false) => StatusCode::OK,
        }
    }

    /// Returns the accumulated headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the accumulated headers for modification.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Returns the serialized body, or `None` if the codec has not run.
    pub fn serialized_body(&self) -> Option<&Bytes> {
        self.serialized_body.as_ref()
    }

    /// Stores the serialized body.
    pub fn set_serialized_body(&mut self, body: Bytes) {
        self.serialized_body = Some(body);
    }

    /// Splits the envelope into the parts written to the wire.
    ///
    /// The body is empty if nothing serialized the payload.
    pub fn into_response_parts(self) -> (StatusCode, HeaderMap, Bytes) {
        let status = self.final_status();
        (status, self.headers, self.serialized_body.unwrap_or_default())
    }
}

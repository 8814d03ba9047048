//! Correlation identifiers.

use std::borrow::Cow;

use http::HeaderValue;
use uuid::Uuid;

/// The header name used to receive and return the correlation identifier.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const NIL_ID: &str = "00000000-0000-0000-0000-000000000000";

/// A request-scoped correlation identifier.
///
/// Incoming identifiers are kept verbatim so clients can match responses
/// and log lines against the value they sent. Generated identifiers are
/// UUID v7, which are time-ordered and need no coordination.
///
/// The value is always a non-empty header value, so it can be written back
/// to a response without re-validation. Opaque (non-ASCII) bytes are kept
/// as sent; only their text rendering for logs is lossy.
///
/// # Example
///
/// ```
/// use http::HeaderValue;
/// use strata_core::RequestId;
///
/// let incoming = HeaderValue::from_static("abc-123");
/// let id = RequestId::from_header(&incoming).unwrap();
/// assert_eq!(id.to_string(), "abc-123");
///
/// let generated = RequestId::generate();
/// assert_eq!(generated.header_value().len(), 36);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(HeaderValue);

impl RequestId {
    /// Generates a new identifier using UUID v7.
    #[must_use]
    pub fn generate() -> Self {
        Self::from_uuid(Uuid::now_v7())
    }

    /// Creates an identifier from an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        let mut buffer = Uuid::encode_buffer();
        let text = uuid.hyphenated().encode_lower(&mut buffer);
        Self(HeaderValue::from_str(text).unwrap_or_else(|_| HeaderValue::from_static(NIL_ID)))
    }

    /// Reuses an incoming header value verbatim.
    ///
    /// Returns `None` only for empty or all-whitespace values.
    #[must_use]
    pub fn from_header(value: &HeaderValue) -> Option<Self> {
        if value.as_bytes().iter().all(u8::is_ascii_whitespace) {
            return None;
        }
        Some(Self(value.clone()))
    }

    /// Parses an identifier from a string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        HeaderValue::from_str(s)
            .ok()
            .and_then(|value| Self::from_header(&value))
    }

    /// Returns the identifier as text, replacing invalid UTF-8 sequences.
    #[must_use]
    pub fn to_str_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.0.as_bytes())
    }

    /// Returns the identifier as a header value.
    #[must_use]
    pub fn header_value(&self) -> &HeaderValue {
        &self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_str_lossy())
    }
}

impl From<Uuid> for RequestId {
    fn from(uuid: Uuid) -> Self {
        Self::from_uuid(uuid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_unique() {
        let a = RequestId::generate();
        let b = RequestId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_generated_is_uuid_v7() {
        let id = RequestId::generate();
        let parsed = Uuid::parse_str(&id.to_str_lossy()).unwrap();
        assert_eq!(parsed.get_version_num(), 7);
    }

    #[test]
    fn test_from_header_keeps_value_verbatim() {
        let value = HeaderValue::from_static("client-supplied-id");
        let id = RequestId::from_header(&value).unwrap();
        assert_eq!(id.to_str_lossy(), "client-supplied-id");
        assert_eq!(id.header_value(), &value);
    }

    #[test]
    fn test_from_header_rejects_empty() {
        let value = HeaderValue::from_static("");
        assert!(RequestId::from_header(&value).is_none());
    }

    #[test]
    fn test_from_header_rejects_whitespace() {
        let value = HeaderValue::from_static("   ");
        assert!(RequestId::from_header(&value).is_none());
    }

    #[test]
    fn test_from_header_keeps_non_ascii_bytes() {
        let value = HeaderValue::from_bytes(b"req-\xc3\xa9").unwrap();
        let id = RequestId::from_header(&value).unwrap();
        assert_eq!(id.header_value().as_bytes(), b"req-\xc3\xa9");
        assert_eq!(id.to_string(), "req-\u{e9}");
    }

    #[test]
    fn test_from_uuid_is_hyphenated() {
        let id = RequestId::from_uuid(Uuid::nil());
        assert_eq!(id.header_value(), NIL_ID);
    }

    #[test]
    fn test_display_is_the_header_text() {
        let id = RequestId::parse("req-42").unwrap();
        assert_eq!(id.to_string(), "req-42");
    }
}

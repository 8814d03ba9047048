//! Domain errors and their translation to HTTP.

use std::collections::BTreeMap;

use http::StatusCode;
use serde::{Deserialize, Serialize};
use strata_middleware::{ErrorTranslationMiddleware, Translation};
use thiserror::Error;
use tracing::{warn, Span};

use crate::storage::StorageError;

/// Error payload returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorData {
    /// Stable machine-readable code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Extra context; omitted when empty.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, String>,
}

impl ErrorData {
    /// Creates a payload without details.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: BTreeMap::new(),
        }
    }

    /// Adds a detail entry.
    #[must_use]
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

/// The ping endpoint chose to fail.
#[derive(Debug, Clone, Copy, Error)]
#[error("Random error")]
pub struct RandomError;

/// Error translation for every endpoint of the service.
///
/// | Error | Status | Code |
/// |-------|--------|------|
/// | [`RandomError`] | 418 | `TEAPOT` |
/// | [`StorageError`] | 424 | `DATABASE` |
pub fn translation() -> ErrorTranslationMiddleware<ErrorData> {
    ErrorTranslationMiddleware::new()
        .on(|err: &RandomError, span| {
            handled(
                span,
                StatusCode::IM_A_TEAPOT,
                ErrorData::new("TEAPOT", err.to_string()).with_detail("reason", "destiny"),
            )
        })
        .on(|err: &StorageError, span| {
            handled(
                span,
                StatusCode::FAILED_DEPENDENCY,
                ErrorData::new("DATABASE", err.to_string()),
            )
        })
}

fn handled(span: &Span, status: StatusCode, data: ErrorData) -> Translation<ErrorData> {
    warn!(
        parent: span,
        status_code = status.as_u16(),
        code = %data.code,
        error = %data.message,
        "handled error"
    );
    Translation::new(status, data)
}

//! Standard middleware stages.
//!
//! In the order [`Chain::standard`](crate::Chain::standard) registers them,
//! outermost first:
//!
//! 1. [`request_id`] - Assign or propagate the correlation id
//! 2. [`logging`] - Structured start/finish events with elapsed time
//! 3. [`codec`] - JSON body and query decoding, JSON payload encoding
//! 4. [`error_translation`] - Domain error to status and error payload

pub mod codec;
pub mod error_translation;
pub mod logging;
pub mod request_id;

pub use codec::{CodecMiddleware, CodecSettings};
pub use error_translation::{ErrorTranslationMiddleware, Translation, Translator, Unmatched};
pub use logging::RequestLoggerMiddleware;
pub use request_id::RequestIdMiddleware;

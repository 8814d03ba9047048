//! # Strata Core
//!
//! Core types for the Strata typed request pipeline.
//!
//! This crate provides the vocabulary shared by every other Strata crate:
//!
//! - [`Envelope`] - Typed response container (payload or error payload, status, headers, body)
//! - [`RequestContext`] - Per-request container (service provider, decoded body and query, raw request, span)
//! - [`RequestId`] - Correlation identifier propagated through `X-Request-Id`
//! - [`HandlerError`] / [`PipelineError`] - The error taxonomy
//! - [`Handler`] - The cloneable async function every middleware wraps
//!
//! # Example
//!
//! ```
//! use strata_core::{Empty, Envelope, Handler, RequestContext};
//!
//! struct Service;
//!
//! let handler: Handler<Service, Empty, Empty, String, ()> =
//!     Handler::from_fn(|_ctx: RequestContext<Service, Empty, Empty>| async move {
//!         Ok(Envelope::ok("pong".to_string()))
//!     });
//! # let _ = handler;
//! ```

#![doc(html_root_url = "https://docs.rs/strata-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod context;
mod envelope;
mod error;
mod handler;
mod request_id;

pub use context::{PathParams, RequestContext};
pub use envelope::{Envelope, Outcome};
pub use error::{ErrorKind, HandlerError, PipelineError};
pub use handler::{BoxFuture, Empty, Handler, HandlerResult};
pub use request_id::{RequestId, REQUEST_ID_HEADER};

use bytes::Bytes;
use http_body_util::Full;

/// The raw HTTP request carried by a [`RequestContext`].
///
/// The body is fully buffered by the host before the pipeline runs.
pub type RawRequest = http::Request<Full<Bytes>>;

/// The HTTP response produced by the dispatcher.
pub type HttpResponse = http::Response<Full<Bytes>>;

//! # Strata Middleware
//!
//! Middleware composition for the Strata request pipeline.
//!
//! A [`Middleware`] turns a [`Handler`](strata_core::Handler) into a decorated
//! handler of the same signature. A [`Chain`] holds an ordered list of them and
//! composes it around a core handler, first registered outermost.
//!
//! ## Standard stages
//!
//! | Stage | Concern |
//! |-------|---------|
//! | [`RequestIdMiddleware`] | `X-Request-Id` reuse or generation, request span |
//! | [`RequestLoggerMiddleware`] | "request started" / "request finished" events |
//! | [`CodecMiddleware`] | JSON body, query string, JSON response payload |
//! | [`ErrorTranslationMiddleware`] | domain error to status and error payload |

#![doc(html_root_url = "https://docs.rs/strata-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod chain;
pub mod middleware;
pub mod stages;

pub use chain::Chain;
pub use middleware::{BoxedMiddleware, FnMiddleware, Middleware};
pub use stages::codec::JSON_CONTENT_TYPE;
pub use stages::{
    CodecMiddleware, CodecSettings, ErrorTranslationMiddleware, RequestIdMiddleware,
    RequestLoggerMiddleware, Translation, Translator, Unmatched,
};

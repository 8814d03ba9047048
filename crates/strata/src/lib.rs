//! # Strata
//!
//! **A typed HTTP request/response pipeline with composable middleware.**
//!
//! Each endpoint is a core handler wrapped by an ordered middleware chain
//! that is composed once, when the endpoint is built:
//!
//! ```text
//! Request → RequestId → RequestLogger → Codec → ErrorTranslation → Core
//!                                                                   ↓
//! Response ← RequestId ← RequestLogger ← Codec ← ErrorTranslation ←┘
//! ```
//!
//! - Request identity: `X-Request-Id` reuse or generation, echoed on every response
//! - Request logging: "request started" / "request finished" with status and elapsed time
//! - Codec: JSON body and query string in, JSON payload out
//! - Error translation: domain errors mapped to a status and a typed error payload
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use strata::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::new().with_env_prefix("STRATA").load()?;
//!     init_logging(&config.logging.to_log_config())?;
//!
//!     let core = Handler::from_fn(|_ctx| async move { Ok(Envelope::ok("pong".to_string())) });
//!     let ping = Endpoint::<(), Empty, Empty, String, String>::builder("ping", Arc::new(()), core)
//!         .chain(Chain::standard(ErrorTranslationMiddleware::new(), config.codec.settings()))
//!         .build();
//!
//!     let router = Router::new().route(http::Method::GET, "/ping", ping);
//!     Server::new(config.server.to_server_config(), router).run().await?;
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/strata/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use strata_core as core;

// Re-export middleware types
pub use strata_middleware as middleware;

// Re-export server types
pub use strata_server as server;

// Re-export telemetry types
pub use strata_telemetry as telemetry;

// Re-export configuration types
pub use strata_config as config;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use strata::prelude::*;
///
/// let error = PipelineError::bad_request("INVALID_BODY", "expected value");
/// assert_eq!(error.code(), "INVALID_BODY");
/// ```
pub mod prelude {
    pub use strata_core::{
        Empty, Envelope, ErrorKind, Handler, HandlerError, HandlerResult, PathParams,
        PipelineError, RequestContext, RequestId, REQUEST_ID_HEADER,
    };

    pub use strata_middleware::{
        Chain, CodecSettings, ErrorTranslationMiddleware, Middleware, Translation, Unmatched,
    };

    pub use strata_server::{Endpoint, Router, Server, ServerConfig, ShutdownSignal};

    pub use strata_telemetry::{init_logging, service_span, LogConfig};

    pub use strata_config::{ConfigLoader, StrataConfig};
}

//! # Strata Server
//!
//! The dispatcher and the HTTP host for the Strata request pipeline.
//!
//! - [`Endpoint`] - composes a middleware chain around a core handler once and
//!   turns each raw request into an HTTP response
//! - [`Router`] - maps method and path templates to type-erased endpoints
//! - [`Server`] - accepts HTTP/1.1 connections with Hyper and Tokio and feeds
//!   buffered requests to the router
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use http::Method;
//! use strata_core::{Empty, Envelope, Handler};
//! use strata_middleware::{Chain, CodecSettings, ErrorTranslationMiddleware};
//! use strata_server::{Endpoint, Router, Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let core = Handler::from_fn(|_ctx| async move { Ok(Envelope::ok("pong".to_string())) });
//!     let ping = Endpoint::<(), Empty, Empty, String, String>::builder("ping", Arc::new(()), core)
//!         .chain(Chain::standard(ErrorTranslationMiddleware::new(), CodecSettings::default()))
//!         .build();
//!
//!     let router = Router::new().route(Method::GET, "/ping", ping);
//!     let config = ServerConfig::builder().http_addr("127.0.0.1:8080").build();
//!
//!     Server::new(config, router).run().await?;
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/strata-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod endpoint;
pub mod error;
pub mod router;
pub mod server;
pub mod shutdown;

pub use config::{
    ServerConfig, ServerConfigBuilder, DEFAULT_BODY_READ_TIMEOUT_SECS, DEFAULT_HTTP_ADDR,
    DEFAULT_MAX_BODY_SIZE, DEFAULT_SHUTDOWN_TIMEOUT_SECS,
};
pub use endpoint::{correlation_headers, error_response, Dispatch, Endpoint, EndpointBuilder};
pub use error::ServerError;
pub use router::{RouteMatch, Router};
pub use server::Server;
pub use shutdown::{ConnectionToken, ConnectionTracker, ShutdownSignal};

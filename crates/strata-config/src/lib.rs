//! Typed configuration for Strata services.
//!
//! - TOML and JSON configuration files
//! - Environment variable overrides
//! - Strict validation (fails on unknown fields)
//! - Layered configuration (defaults → file → env)
//!
//! [`StrataConfig`] holds three sections:
//!
//! - [`ServerSection`] - bind address and shutdown timeout for the HTTP host
//! - [`CodecSection`] - codec middleware settings
//! - [`LoggingSection`] - subscriber settings for `strata-telemetry`
//!
//! # Example
//!
//! ```no_run
//! use strata_config::ConfigLoader;
//!
//! # fn main() -> Result<(), strata_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_defaults()
//!     .with_file("strata.toml")?
//!     .with_env_prefix("STRATA")
//!     .load()?;
//!
//! let server = config.server.to_server_config();
//! let codec = config.codec.settings();
//! let logging = config.logging.to_log_config();
//! # let _ = (server, codec, logging);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! http_addr = "0.0.0.0:8080"
//! shutdown_timeout_secs = 30
//! max_body_bytes = 1048576
//! body_read_timeout_secs = 30
//!
//! [codec]
//! forbid_unknown_keys = false
//!
//! [logging]
//! level = "info"
//! format = "json"
//! service_name = "kv-store"
//! ```
//!
//! # Environment Variable Overrides
//!
//! Values can be overridden with `PREFIX__SECTION__KEY`, for example
//! `STRATA__SERVER__HTTP_ADDR=0.0.0.0:9000` or `STRATA__LOGGING__LEVEL=debug`.

#![doc(html_root_url = "https://docs.rs/strata-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::StrataConfig;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{CodecSection, LogFormat, LoggingSection, ServerSection};

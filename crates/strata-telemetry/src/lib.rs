//! Logging setup for Strata services.
//!
//! The pipeline stages emit `tracing` events and spans; this crate installs
//! the subscriber that prints them.
//!
//! - [`LogConfig`] - level, format and field options, with
//!   [`development`](LogConfig::development) and
//!   [`production`](LogConfig::production) presets
//! - [`init_logging`] - installs the global subscriber
//! - [`fields`] - standard field names used across the pipeline
//!
//! # Example
//!
//! ```rust,no_run
//! use strata_telemetry::{init_logging, service_span, LogConfig};
//!
//! let config = LogConfig::production().with_service_name("kv-store");
//! init_logging(&config).expect("Failed to init logging");
//!
//! let _root = service_span(&config).entered();
//! tracing::info!("service starting");
//! ```

#![doc(html_root_url = "https://docs.rs/strata-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{create_env_filter, fields, init_logging, service_span, LogConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

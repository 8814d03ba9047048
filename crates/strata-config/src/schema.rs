//! Configuration section types.
//!
//! Every section rejects unknown fields and fills missing ones from its
//! defaults, so a partial file only overrides what it names.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use strata_middleware::CodecSettings;
use strata_server::{
    ServerConfig, DEFAULT_BODY_READ_TIMEOUT_SECS, DEFAULT_HTTP_ADDR, DEFAULT_MAX_BODY_SIZE,
    DEFAULT_SHUTDOWN_TIMEOUT_SECS,
};
use strata_telemetry::LogConfig;

/// HTTP host settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    /// Bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_http_addr")]
    pub http_addr: String,

    /// Seconds to wait for in-flight connections during shutdown.
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,

    /// Largest request body accepted, in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Seconds a request body may take to arrive.
    #[serde(default = "default_body_read_timeout_secs")]
    pub body_read_timeout_secs: u64,
}

fn default_http_addr() -> String {
    DEFAULT_HTTP_ADDR.to_string()
}

fn default_shutdown_timeout_secs() -> u64 {
    DEFAULT_SHUTDOWN_TIMEOUT_SECS
}

fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_SIZE
}

fn default_body_read_timeout_secs() -> u64 {
    DEFAULT_BODY_READ_TIMEOUT_SECS
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
            max_body_bytes: default_max_body_bytes(),
            body_read_timeout_secs: default_body_read_timeout_secs(),
        }
    }
}

impl ServerSection {
    /// Converts to the host configuration.
    #[must_use]
    pub fn to_server_config(&self) -> ServerConfig {
        ServerConfig::builder()
            .http_addr(self.http_addr.clone())
            .shutdown_timeout(Duration::from_secs(self.shutdown_timeout_secs))
            .max_body_size(self.max_body_bytes)
            .body_read_timeout(Duration::from_secs(self.body_read_timeout_secs))
            .build()
    }
}

/// Body and query codec settings.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CodecSection {
    /// Reject query strings with keys the query type does not declare.
    #[serde(default)]
    pub forbid_unknown_keys: bool,
}

impl CodecSection {
    /// Converts to codec middleware settings.
    #[must_use]
    pub fn settings(&self) -> CodecSettings {
        CodecSettings {
            forbid_unknown_keys: self.forbid_unknown_keys,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Human-readable multi-line output.
    Pretty,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    /// Whether logging is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directives (e.g., "info" or "strata_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Log span open and close events.
    #[serde(default)]
    pub span_events: bool,

    /// Include source file and line.
    #[serde(default)]
    pub file_line_info: bool,

    /// Include thread IDs.
    #[serde(default)]
    pub thread_ids: bool,

    /// Include the event target (module path).
    #[serde(default = "default_true")]
    pub include_target: bool,

    /// Service name recorded on the root span.
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    "strata".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
            span_events: false,
            file_line_info: false,
            thread_ids: false,
            include_target: true,
            service_name: default_service_name(),
        }
    }
}

impl LoggingSection {
    /// Converts to the telemetry logging configuration.
    #[must_use]
    pub fn to_log_config(&self) -> LogConfig {
        LogConfig {
            enabled: self.enabled,
            level: self.level.clone(),
            json_format: self.format == LogFormat::Json,
            span_events: self.span_events,
            file_line_info: self.file_line_info,
            thread_ids: self.thread_ids,
            include_target: self.include_target,
            service_name: self.service_name.clone(),
        }
    }
}

//! Root configuration type.

use serde::{Deserialize, Serialize};

use crate::schema::{CodecSection, LogFormat, LoggingSection, ServerSection};
use crate::ConfigError;

/// Complete configuration of a Strata service.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and the
/// environment.
///
/// # Example
///
/// ```
/// use strata_config::StrataConfig;
///
/// let config = StrataConfig::default();
/// assert_eq!(config.server.http_addr, "0.0.0.0:8080");
/// assert!(!config.codec.forbid_unknown_keys);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct StrataConfig {
    /// HTTP host settings.
    #[serde(default)]
    pub server: ServerSection,

    /// Body and query codec settings.
    #[serde(default)]
    pub codec: CodecSection,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingSection,
}

impl StrataConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - the server address is not a socket address
    /// - the body limit or body read timeout is zero
    /// - the log level is empty
    /// - the service name is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self
            .server
            .http_addr
            .parse::<std::net::SocketAddr>()
            .is_err()
        {
            return Err(ConfigError::invalid_value(
                "server.http_addr",
                format!("invalid socket address: {}", self.server.http_addr),
            ));
        }

        if self.server.max_body_bytes == 0 {
            return Err(ConfigError::invalid_value(
                "server.max_body_bytes",
                "must be greater than zero",
            ));
        }

        if self.server.body_read_timeout_secs == 0 {
            return Err(ConfigError::invalid_value(
                "server.body_read_timeout_secs",
                "must be greater than zero",
            ));
        }

        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::invalid_value("logging.level", "must not be empty"));
        }

        if self.logging.service_name.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "logging.service_name",
                "must not be empty",
            ));
        }

        Ok(())
    }

    /// Development preset: debug level, pretty output with source locations.
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.logging.level = "debug".to_string();
        config.logging.format = LogFormat::Pretty;
        config.logging.span_events = true;
        config.logging.file_line_info = true;
        config
    }

    /// Production preset: info level JSON output and strict query keys.
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();
        config.logging.level = "info".to_string();
        config.logging.format = LogFormat::Json;
        config.codec.forbid_unknown_keys = true;
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(StrataConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_addr_rejected() {
        let mut config = StrataConfig::default();
        config.server.http_addr = "localhost".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "server.http_addr"
        ));
    }

    #[test]
    fn test_zero_body_limits_rejected() {
        let mut config = StrataConfig::default();
        config.server.max_body_bytes = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "server.max_body_bytes"
        ));

        let mut config = StrataConfig::default();
        config.server.body_read_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_level_rejected() {
        let mut config = StrataConfig::default();
        config.logging.level = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_presets() {
        let dev = StrataConfig::development();
        assert_eq!(dev.logging.level, "debug");
        assert_eq!(dev.logging.format, LogFormat::Pretty);
        assert!(!dev.codec.forbid_unknown_keys);

        let prod = StrataConfig::production();
        assert_eq!(prod.logging.format, LogFormat::Json);
        assert!(prod.codec.forbid_unknown_keys);
    }

    #[test]
    fn test_unknown_section_rejected() {
        let result: Result<StrataConfig, _> = toml::from_str("[metrics]\nenabled = true\n");
        assert!(result.is_err());
    }
}

//! Configuration management.
//!
//! All configuration is driven by environment variables.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::gate::GateConfig;
use crate::signature::SignatureScheme;

/// Log output format of the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Global configuration.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyAuthConfig {
    /// Bind address of the server.
    pub listen: String,
    /// Log level filter used when `RUST_LOG` is unset.
    pub log_level: String,
    /// Log output format.
    pub log_format: LogFormat,
    /// Signature construction expected from clients.
    pub signature_scheme: SignatureScheme,
    /// Freshness window for request timestamps; `None` disables the check.
    pub timestamp_tolerance: Option<Duration>,
    /// JSON file of stored credential associations.
    pub credentials_file: Option<PathBuf>,
}

impl Default for KeyAuthConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".to_owned(),
            log_level: "info".to_owned(),
            log_format: LogFormat::Text,
            signature_scheme: SignatureScheme::HmacSha256,
            timestamp_tolerance: None,
            credentials_file: None,
        }
    }
}

impl KeyAuthConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a variable cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a variable cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(v) = lookup("KEYAUTH_LISTEN") {
            config.listen = v;
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            config.log_level = v;
        }
        if let Some(v) = lookup("LOG_FORMAT") {
            config.log_format = match v.trim().to_ascii_lowercase().as_str() {
                "text" | "" => LogFormat::Text,
                "json" => LogFormat::Json,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        name: "LOG_FORMAT",
                        value: v,
                    });
                }
            };
        }
        if let Some(v) = lookup("KEYAUTH_SIGNATURE_SCHEME") {
            config.signature_scheme = v.parse()?;
        }
        if let Some(v) = lookup("KEYAUTH_TIMESTAMP_TOLERANCE_SECS") {
            let secs: u64 = v.trim().parse().map_err(|_| ConfigError::InvalidValue {
                name: "KEYAUTH_TIMESTAMP_TOLERANCE_SECS",
                value: v.clone(),
            })?;
            config.timestamp_tolerance = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(v) = lookup("KEYAUTH_CREDENTIALS_FILE") {
            config.credentials_file = (!v.is_empty()).then(|| PathBuf::from(v));
        }

        Ok(config)
    }

    /// Gate settings derived from this configuration.
    #[must_use]
    pub fn gate_config(&self) -> GateConfig {
        GateConfig {
            scheme: self.signature_scheme,
            timestamp_tolerance: self.timestamp_tolerance,
        }
    }
}

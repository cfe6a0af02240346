//! Configuration loading and constants.
//!
//! Loads application configuration from an optional TOML file and defines
//! constants for default paths and ports, the certificate validity window,
//! shutdown behavior, and logging. `AppConfig` is the root configuration
//! struct containing all settings; CLI flags override its values in `main`.

use serde::Deserialize;
use std::path::Path;

// =============================================================================
// Default Paths and Strings
// =============================================================================

/// Configuration file consulted when --config is not given
pub const DEFAULT_CONFIG_PATH: &str = "selfserve.toml";

/// Default bind address (loopback only; this is a development tool)
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default HTTPS port (unprivileged)
pub const DEFAULT_PORT: u16 = 8443;

/// Default document root
pub const DEFAULT_DOCUMENT_ROOT: &str = ".";

/// Default certificate path, relative to the working directory
pub const DEFAULT_CERT_PATH: &str = "cert.pem";

/// Default private key path, relative to the working directory
pub const DEFAULT_KEY_PATH: &str = "key.pem";

/// Default log filter when RUST_LOG is not set
pub const DEFAULT_LOG_FILTER: &str = "selfserve=info,tower_http=info";

/// Default log format (text or json)
pub const DEFAULT_LOG_FORMAT: &str = "text";

// =============================================================================
// Certificate Provisioning
// =============================================================================

/// Lifetime of a generated certificate
pub const CERT_VALIDITY_DAYS: i64 = 365;

/// How far not-before is backdated, so a skewed clock on either end
/// still lands inside the validity window
pub const CERT_NOT_BEFORE_SKEW_DAYS: i64 = 1;

// =============================================================================
// HTTP Response Cache Control / Shutdown
// =============================================================================

/// Cache-Control for everything served: force revalidation so edits in the
/// served directory show up on the next refresh
pub const CACHE_CONTROL_DEV: &str = "no-cache";

/// How long in-flight connections may drain after a termination signal
pub const SHUTDOWN_GRACE_SECS: u64 = 10;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// HTTPS listener configuration
    #[serde(default)]
    pub http: HttpServerConfig,
    /// Certificate paths and hostnames
    #[serde(default)]
    pub tls: TlsConfig,
    /// Document root configuration
    #[serde(default)]
    pub files: FilesConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTPS listener configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpServerConfig {
    #[serde(default = "HttpServerConfig::default_host")]
    pub host: String,
    #[serde(default = "HttpServerConfig::default_port")]
    pub port: u16,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
        }
    }
}

impl HttpServerConfig {
    fn default_host() -> String {
        DEFAULT_HOST.to_string()
    }

    fn default_port() -> u16 {
        DEFAULT_PORT
    }
}

/// Certificate paths and the hostnames the certificate must cover
#[derive(Debug, Clone, Deserialize)]
pub struct TlsConfig {
    /// Where the PEM certificate lives (created if missing)
    #[serde(default = "TlsConfig::default_cert_path")]
    pub cert_path: String,
    /// Where the PEM private key lives (created if missing)
    #[serde(default = "TlsConfig::default_key_path")]
    pub key_path: String,
    /// Subject alternative names; the first entry becomes the subject CN
    #[serde(default = "TlsConfig::default_hostnames")]
    pub hostnames: Vec<String>,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            cert_path: Self::default_cert_path(),
            key_path: Self::default_key_path(),
            hostnames: Self::default_hostnames(),
        }
    }
}

impl TlsConfig {
    fn default_cert_path() -> String {
        DEFAULT_CERT_PATH.to_string()
    }

    fn default_key_path() -> String {
        DEFAULT_KEY_PATH.to_string()
    }

    fn default_hostnames() -> Vec<String> {
        vec!["localhost".to_string(), "127.0.0.1".to_string()]
    }
}

/// Document root configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FilesConfig {
    /// Directory served at /
    #[serde(default = "FilesConfig::default_root")]
    pub root: String,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            root: Self::default_root(),
        }
    }
}

impl FilesConfig {
    fn default_root() -> String {
        DEFAULT_DOCUMENT_ROOT.to_string()
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log format: "text" (human-readable, default) or "json" (structured)
    #[serde(default = "LoggingConfig::default_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: DEFAULT_LOG_FORMAT.to_string(),
        }
    }
}

impl LoggingConfig {
    fn default_format() -> String {
        DEFAULT_LOG_FORMAT.to_string()
    }
}

impl AppConfig {
    /// Load configuration.
    ///
    /// An explicitly given path must exist and parse. Without one,
    /// `selfserve.toml` is used when present in the working directory,
    /// otherwise the compiled-in defaults apply.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::parse_file(path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::parse_file(DEFAULT_CONFIG_PATH)?
            }
            None => Self::default(),
        };

        config.validate()?;
        Ok(config)
    }

    fn parse_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.tls.hostnames.is_empty() {
            return Err(ConfigError::Validation(
                "tls.hostnames must name at least one host for the certificate".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Configuration error: {0}")]
    Validation(String),
}

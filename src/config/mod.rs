//! Configuration types for the device REST client.
//!
//! Provides configuration with builder pattern for:
//! - Endpoint (scheme, host, port, base path)
//! - Operation timeout
//! - TLS trust (CA certificate, alternate server identity, trust on first use)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::endpoint::scheme_for_port;
use crate::errors::{RestError, RestResult};
use crate::http::DEFAULT_TIMEOUT;

/// Environment variable prefix used by [`RestConfig::from_env`].
pub const ENV_PREFIX: &str = "DEVICE_REST_";

/// TLS configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsConfig {
    /// PEM file whose certificates replace the default trusted roots.
    pub ca_cert_path: Option<PathBuf>,
    /// Name accepted in place of the host name.
    pub alternate_server_identity: Option<String>,
    /// Pin self-signed certificates on first use.
    #[serde(default)]
    pub accept_self_signed: bool,
    /// Directory of pinned certificates. Defaults to the platform data
    /// directory.
    pub certificate_dir: Option<PathBuf>,
}

impl TlsConfig {
    /// Creates a new TLS config builder.
    pub fn builder() -> TlsConfigBuilder {
        TlsConfigBuilder::default()
    }

    /// Validates the TLS configuration.
    pub fn validate(&self) -> RestResult<()> {
        if let Some(identity) = &self.alternate_server_identity {
            if identity.trim().is_empty() {
                return Err(RestError::configuration(
                    "alternate server identity must not be blank",
                ));
            }
        }
        if self.accept_self_signed {
            tracing::warn!("Self-signed certificates will be trusted on first use");
        }
        Ok(())
    }
}

/// Builder for TLS configuration.
#[derive(Debug, Default)]
pub struct TlsConfigBuilder {
    config: TlsConfig,
}

impl TlsConfigBuilder {
    /// Sets the CA certificate path.
    pub fn ca_cert_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.ca_cert_path = Some(path.into());
        self
    }

    /// Sets the alternate server identity.
    pub fn alternate_server_identity(mut self, identity: impl Into<String>) -> Self {
        self.config.alternate_server_identity = Some(identity.into());
        self
    }

    /// Sets whether self-signed certificates are pinned on first use.
    pub fn accept_self_signed(mut self, accept: bool) -> Self {
        self.config.accept_self_signed = accept;
        self
    }

    /// Sets the pinned certificate directory.
    pub fn certificate_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.certificate_dir = Some(dir.into());
        self
    }

    /// Builds the TLS configuration.
    pub fn build(self) -> TlsConfig {
        self.config
    }
}

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestConfig {
    /// URL scheme, `http` or `https`.
    pub scheme: String,
    /// Host name or address.
    pub host: String,
    /// Port, the scheme default when `None`.
    pub port: Option<u16>,
    /// Path prefix of every request.
    #[serde(default)]
    pub base_path: String,
    /// Timeout of a whole operation.
    #[serde(default = "default_timeout", with = "duration_millis")]
    pub timeout: Duration,
    /// TLS configuration.
    #[serde(default)]
    pub tls: TlsConfig,
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

impl RestConfig {
    /// Creates a new config builder.
    pub fn builder() -> RestConfigBuilder {
        RestConfigBuilder::default()
    }

    /// Reads the configuration from `DEVICE_REST_*` environment variables.
    ///
    /// `DEVICE_REST_HOST` is required.
    pub fn from_env() -> RestResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> RestResult<Self> {
        let var = |suffix: &str| {
            lookup(&format!("{}{}", ENV_PREFIX, suffix)).filter(|value| !value.is_empty())
        };

        let host = var("HOST").ok_or_else(|| {
            RestError::configuration(format!("{}HOST must be set", ENV_PREFIX))
        })?;
        let mut builder = Self::builder().host(host);

        if let Some(port) = var("PORT") {
            let port = port.parse::<u16>().map_err(|e| {
                RestError::configuration(format!("{}PORT is invalid: {}", ENV_PREFIX, e))
            })?;
            builder = builder.port(port);
        }
        if let Some(scheme) = var("SCHEME") {
            builder = builder.scheme(scheme);
        }
        if let Some(base_path) = var("BASE_PATH") {
            builder = builder.base_path(base_path);
        }
        if let Some(timeout) = var("TIMEOUT_MS") {
            let millis = timeout.parse::<u64>().map_err(|e| {
                RestError::configuration(format!("{}TIMEOUT_MS is invalid: {}", ENV_PREFIX, e))
            })?;
            builder = builder.timeout(Duration::from_millis(millis));
        }

        let mut tls = TlsConfig::builder();
        if let Some(path) = var("CA_CERT") {
            tls = tls.ca_cert_path(path);
        }
        if let Some(identity) = var("SERVER_IDENTITY") {
            tls = tls.alternate_server_identity(identity);
        }
        if let Some(accept) = var("ACCEPT_SELF_SIGNED") {
            tls = tls.accept_self_signed(parse_flag(&accept).ok_or_else(|| {
                RestError::configuration(format!(
                    "{}ACCEPT_SELF_SIGNED is invalid: {}",
                    ENV_PREFIX, accept
                ))
            })?);
        }
        if let Some(dir) = var("CERT_DIR") {
            tls = tls.certificate_dir(dir);
        }

        builder.tls(tls.build()).build()
    }

    /// Validates the configuration.
    pub fn validate(&self) -> RestResult<()> {
        if self.host.is_empty() {
            return Err(RestError::configuration("host must not be empty"));
        }
        if !matches!(self.scheme.as_str(), "http" | "https") {
            return Err(RestError::configuration(format!(
                "unsupported scheme '{}'",
                self.scheme
            )));
        }
        if self.port == Some(0) {
            return Err(RestError::configuration("port must not be 0"));
        }
        if self.timeout.is_zero() {
            return Err(RestError::configuration("timeout must be greater than zero"));
        }
        self.tls.validate()
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Builder for client configuration.
#[derive(Debug, Default)]
pub struct RestConfigBuilder {
    scheme: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    base_path: String,
    timeout: Option<Duration>,
    tls: TlsConfig,
}

impl RestConfigBuilder {
    /// Sets the scheme. Defaults to `https` for port 443 and `http`
    /// otherwise.
    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = Some(scheme.into());
        self
    }

    /// Sets the host.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets the port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the base path.
    pub fn base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    /// Sets the operation timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the TLS configuration.
    pub fn tls(mut self, tls: TlsConfig) -> Self {
        self.tls = tls;
        self
    }

    /// Builds and validates the configuration.
    pub fn build(self) -> RestResult<RestConfig> {
        let host = self
            .host
            .ok_or_else(|| RestError::configuration("host is required"))?;
        let scheme = self
            .scheme
            .unwrap_or_else(|| scheme_for_port(self.port).to_string());

        let config = RestConfig {
            scheme,
            host,
            port: self.port,
            base_path: self.base_path,
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
            tls: self.tls,
        };
        config.validate()?;
        Ok(config)
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_config_builder() {
        let config = RestConfig::builder()
            .host("192.168.1.20")
            .port(8080)
            .base_path("/api")
            .timeout(Duration::from_secs(2))
            .build()
            .unwrap();

        assert_eq!(config.scheme, "http");
        assert_eq!(config.port, Some(8080));
        assert_eq!(config.base_path, "/api");
        assert_eq!(config.timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_config_defaults() {
        let config = RestConfig::builder().host("bridge").port(443).build().unwrap();
        assert_eq!(config.scheme, "https");
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.tls, TlsConfig::default());
    }

    #[test]
    fn test_config_validation() {
        assert!(RestConfig::builder().build().is_err());
        assert!(RestConfig::builder().host("").build().is_err());
        assert!(RestConfig::builder().host("h").scheme("ftp").build().is_err());
        assert!(RestConfig::builder().host("h").timeout(Duration::ZERO).build().is_err());
        assert!(RestConfig::builder()
            .host("h")
            .tls(TlsConfig::builder().alternate_server_identity(" ").build())
            .build()
            .is_err());
    }

    #[test]
    fn test_from_env() {
        let config = RestConfig::from_lookup(env(&[
            ("DEVICE_REST_HOST", "hue.local"),
            ("DEVICE_REST_PORT", "443"),
            ("DEVICE_REST_BASE_PATH", "/clip/v2"),
            ("DEVICE_REST_TIMEOUT_MS", "1500"),
            ("DEVICE_REST_SERVER_IDENTITY", "Hue Bridge"),
            ("DEVICE_REST_ACCEPT_SELF_SIGNED", "true"),
            ("DEVICE_REST_CERT_DIR", "/var/lib/device-rest"),
        ]))
        .unwrap();

        assert_eq!(config.scheme, "https");
        assert_eq!(config.host, "hue.local");
        assert_eq!(config.base_path, "/clip/v2");
        assert_eq!(config.timeout, Duration::from_millis(1500));
        assert_eq!(config.tls.alternate_server_identity.as_deref(), Some("Hue Bridge"));
        assert!(config.tls.accept_self_signed);
        assert_eq!(config.tls.certificate_dir, Some(PathBuf::from("/var/lib/device-rest")));
    }

    #[test]
    fn test_from_env_errors() {
        assert!(RestConfig::from_lookup(env(&[])).is_err());
        assert!(RestConfig::from_lookup(env(&[
            ("DEVICE_REST_HOST", "h"),
            ("DEVICE_REST_PORT", "http"),
        ]))
        .is_err());
        assert!(RestConfig::from_lookup(env(&[
            ("DEVICE_REST_HOST", "h"),
            ("DEVICE_REST_ACCEPT_SELF_SIGNED", "maybe"),
        ]))
        .is_err());
    }

    #[test]
    fn test_serde_round_trip() {
        let config = RestConfig::builder().host("wled.local").build().unwrap();
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["timeout"], 10_000);
        let parsed: RestConfig = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, config);
    }
}

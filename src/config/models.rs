//! Configuration data structures for hello-echo.
//!
//! These types map directly to the YAML layers under `configs/` (and to
//! `APP_*` environment overrides). Every section carries defaults so that a
//! minimal `default.yaml` stays concise.
use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};

/// Top-level application configuration, built once at startup.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub telemetry: TelemetryConfig,
}

/// HTTP listener settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface or hostname to bind
    pub host: String,
    /// TCP port, `0` picks an ephemeral port
    pub port: u16,
    /// Upper bound for reading a request body
    #[serde(with = "duration_format")]
    pub read_timeout: Duration,
    /// Upper bound for streaming a response body
    #[serde(with = "duration_format")]
    pub write_timeout: Duration,
    /// Keep-alive idle allowance advertised to operators
    #[serde(with = "duration_format")]
    pub idle_timeout: Duration,
}

impl ServerConfig {
    /// `host:port` as used for binding and logging.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Base URL a local client should use to reach this server.
    ///
    /// Wildcard bind hosts are not routable, so they are probed on loopback.
    pub fn local_url(&self) -> String {
        let host = match self.host.as_str() {
            "" | "0.0.0.0" => "127.0.0.1",
            "::" | "[::]" => "[::1]",
            other => other,
        };
        format!("http://{}:{}", host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            read_timeout: Duration::from_secs(15),
            write_timeout: Duration::from_secs(15),
            idle_timeout: Duration::from_secs(60),
        }
    }
}

/// Log output settings
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub format: LogFormat,
}

/// Minimum severity emitted by the subscriber.
///
/// Decoding ignores case and surrounding whitespace. `warning` is read as
/// `warn`; any other unrecognised name falls back to `info`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<String> for LogLevel {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "trace" => LogLevel::Trace,
            "debug" => LogLevel::Debug,
            "warn" | "warning" => LogLevel::Warn,
            "error" => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output encoding for log lines.
///
/// Decoding ignores case; names other than `json` and `pretty` select `text`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum LogFormat {
    /// One JSON object per line
    Json,
    /// Single-line human readable output
    #[default]
    Text,
    /// Multi-line human readable output for local development
    Pretty,
}

impl From<String> for LogFormat {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Text,
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogFormat::Json => "json",
            LogFormat::Text => "text",
            LogFormat::Pretty => "pretty",
        };
        f.write_str(name)
    }
}

/// Trace export settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct TelemetryConfig {
    pub service_name: String,
    pub service_version: String,
    pub enabled: bool,
    /// OTLP gRPC collector endpoint; exporter default (`http://localhost:4317`) when unset
    pub otlp_endpoint: Option<String>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: env!("CARGO_PKG_NAME").to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            enabled: false,
            otlp_endpoint: None,
        }
    }
}

/// Serde adapter for durations written either as humantime strings (`"15s"`,
/// `"1m 30s"`) or as plain integer seconds.
mod duration_format {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawDuration {
        Seconds(u64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        match RawDuration::deserialize(deserializer)? {
            RawDuration::Seconds(secs) => Ok(Duration::from_secs(secs)),
            RawDuration::Text(text) => humantime::parse_duration(text.trim())
                .map_err(|e| D::Error::custom(format!("invalid duration '{text}': {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_address() {
        let server = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 9090,
            ..ServerConfig::default()
        };
        assert_eq!(server.address(), "127.0.0.1:9090");
        assert_eq!(server.local_url(), "http://127.0.0.1:9090");
    }

    #[test]
    fn test_wildcard_host_is_probed_on_loopback() {
        let server = ServerConfig::default();
        assert_eq!(server.local_url(), "http://127.0.0.1:8080");
    }

    #[test]
    fn test_durations_accept_text_and_seconds() {
        let json = r#"{"read_timeout":"2m","write_timeout":5,"idle_timeout":"1m 30s"}"#;
        let server: ServerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(server.read_timeout, Duration::from_secs(120));
        assert_eq!(server.write_timeout, Duration::from_secs(5));
        assert_eq!(server.idle_timeout, Duration::from_secs(90));
    }

    #[test]
    fn test_bad_duration_is_rejected() {
        let json = r#"{"read_timeout":"soon"}"#;
        assert!(serde_json::from_str::<ServerConfig>(json).is_err());
    }

    #[test]
    fn test_warning_alias() {
        let logging: LoggingConfig =
            serde_json::from_str(r#"{"level":"warning","format":"json"}"#).unwrap();
        assert_eq!(logging.level, LogLevel::Warn);
        assert_eq!(logging.format, LogFormat::Json);
    }

    #[test]
    fn test_log_names_ignore_case() {
        let logging: LoggingConfig =
            serde_json::from_str(r#"{"level":" DEBUG ","format":"Pretty"}"#).unwrap();
        assert_eq!(logging.level, LogLevel::Debug);
        assert_eq!(logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_unknown_log_names_fall_back() {
        let logging: LoggingConfig =
            serde_json::from_str(r#"{"level":"verbose","format":"xml"}"#).unwrap();
        assert_eq!(logging.level, LogLevel::Info);
        assert_eq!(logging.format, LogFormat::Text);
    }

    #[test]
    fn test_log_names_serialize_lowercase() {
        let logging = LoggingConfig {
            level: LogLevel::Warn,
            format: LogFormat::Json,
        };
        assert_eq!(
            serde_json::to_string(&logging).unwrap(),
            r#"{"level":"warn","format":"json"}"#
        );
    }
}

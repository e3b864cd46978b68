use std::time::Duration;

use crate::config::models::{AppConfig, ServerConfig, TelemetryConfig};

/// Validation result type alias
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validation error types
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("Validation failed:\n{}", format_errors(.0))]
    Multiple(Vec<ValidationError>),
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Semantic checks that serde decoding cannot express
pub struct AppConfigValidator;

impl AppConfigValidator {
    /// Validate the entire configuration, collecting every problem found
    pub fn validate(config: &AppConfig) -> ValidationResult<()> {
        let mut errors = Vec::new();

        errors.extend(Self::validate_server(&config.server));
        errors.extend(Self::validate_telemetry(&config.telemetry));

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ValidationError::Multiple(errors)),
        }
    }

    fn validate_server(server: &ServerConfig) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if server.host.trim().is_empty() {
            errors.push(ValidationError::MissingField {
                field: "server.host".to_string(),
            });
        } else if server.host.contains(char::is_whitespace) {
            errors.push(ValidationError::InvalidField {
                field: "server.host".to_string(),
                message: "must not contain whitespace".to_string(),
            });
        }

        for (field, value) in [
            ("server.read_timeout", server.read_timeout),
            ("server.write_timeout", server.write_timeout),
            ("server.idle_timeout", server.idle_timeout),
        ] {
            if value == Duration::ZERO {
                errors.push(ValidationError::InvalidField {
                    field: field.to_string(),
                    message: "must be greater than zero".to_string(),
                });
            }
        }

        errors
    }

    fn validate_telemetry(telemetry: &TelemetryConfig) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if telemetry.enabled && telemetry.service_name.trim().is_empty() {
            errors.push(ValidationError::MissingField {
                field: "telemetry.service_name".to_string(),
            });
        }

        if let Some(endpoint) = &telemetry.otlp_endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                errors.push(ValidationError::InvalidField {
                    field: "telemetry.otlp_endpoint".to_string(),
                    message: format!("'{endpoint}' must start with http:// or https://"),
                });
            }
        }

        errors
    }
}

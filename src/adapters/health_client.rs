use std::time::Duration;

use crate::config::models::ServerConfig;

/// Call timeout for the one-shot liveness probe
pub const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum HealthCheckError {
    #[error("Health check request to {url} failed")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Health check returned status {0}")]
    Status(u16),
}

/// Probe `GET /healthz` on the server described by `config`.
///
/// The request is attempted once; any non-200 answer is a failure.
pub async fn check_health(config: &ServerConfig) -> Result<(), HealthCheckError> {
    let url = format!("{}/healthz", config.local_url());

    let request_error = |source| HealthCheckError::Request {
        url: url.clone(),
        source,
    };

    let client = reqwest::Client::builder()
        .timeout(HEALTH_CHECK_TIMEOUT)
        .build()
        .map_err(request_error)?;

    let response = client.get(&url).send().await.map_err(request_error)?;

    let status = response.status();
    if status != reqwest::StatusCode::OK {
        tracing::warn!(url = %url, status = status.as_u16(), "Health check failed");
        return Err(HealthCheckError::Status(status.as_u16()));
    }

    tracing::debug!(url = %url, "Health check passed");
    Ok(())
}

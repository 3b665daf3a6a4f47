// HTTP readiness check implementation

use crate::{HealthCheckData, HealthCheckError, HealthCheckResult};
use chrono::Utc;
use http_body_util::{BodyExt, Empty};
use hyper::body::Bytes;
use hyper::{Method, Request, Uri};
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

/// HTTP readiness check configuration
#[derive(Debug, Clone)]
pub struct HttpHealthCheckConfig {
    pub endpoint: String,
    pub timeout: Duration,
    pub expected_status: Vec<u16>,
    pub expected_body: Option<String>,
}

impl Default for HttpHealthCheckConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            timeout: Duration::from_secs(5),
            expected_status: vec![200],
            expected_body: None,
        }
    }
}

impl HttpHealthCheckConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_expected_status(mut self, status_codes: Vec<u16>) -> Self {
        self.expected_status = status_codes;
        self
    }

    pub fn with_expected_body(mut self, body: impl Into<String>) -> Self {
        self.expected_body = Some(body.into());
        self
    }
}

/// Build the URL of Pebble's health endpoint from an `--http` address.
///
/// `":4000"` binds every interface; the probe goes to loopback.
pub fn health_endpoint_for(http_address: &str) -> String {
    let host_port = if http_address.starts_with(':') {
        format!("127.0.0.1{}", http_address)
    } else {
        http_address.to_string()
    };
    format!("http://{}/v1/health", host_port)
}

/// Perform a GET readiness check.
pub async fn check_http_health(
    endpoint: &str,
    check_timeout: Duration,
) -> HealthCheckResult<HealthCheckData> {
    let config = HttpHealthCheckConfig::new(endpoint).with_timeout(check_timeout);
    check_http_health_with_config(&config).await
}

/// Perform a readiness check with custom configuration.
///
/// An unparsable endpoint is an error, and so is an exchange that is not
/// complete within `config.timeout`. An unreachable or unhealthy endpoint
/// is reported through [`HealthCheckData::is_healthy`].
pub async fn check_http_health_with_config(
    config: &HttpHealthCheckConfig,
) -> HealthCheckResult<HealthCheckData> {
    let start_time = std::time::Instant::now();

    debug!("Starting HTTP readiness check: {}", config.endpoint);

    let uri: Uri = config
        .endpoint
        .parse()
        .map_err(|e| HealthCheckError::InvalidResponse {
            id: config.endpoint.clone(),
            response: format!("Invalid URI: {}", e),
        })?;
    if uri.scheme_str() != Some("http") || uri.host().is_none() {
        return Err(HealthCheckError::InvalidResponse {
            id: config.endpoint.clone(),
            response: "Endpoint must be an absolute http:// URL".to_string(),
        });
    }

    let client = Client::builder(TokioExecutor::new()).build_http();

    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header("User-Agent", "pebble-fixture/0.1")
        .body(Empty::<Bytes>::new())
        .map_err(|e| HealthCheckError::InvalidResponse {
            id: config.endpoint.clone(),
            response: format!("Failed to build request: {}", e),
        })?;

    // Connecting, the response head and the body share one deadline
    let exchange = async {
        let response = match client.request(request).await {
            Ok(response) => response,
            Err(e) => return Ok(Err(format!("Connection failed: {}", e))),
        };
        let status = response.status();
        match response.into_body().collect().await {
            Ok(collected) => Ok(Ok((status, collected.to_bytes()))),
            Err(e) => Err(HealthCheckError::ConnectionFailed {
                id: config.endpoint.clone(),
                reason: format!("Failed to read body: {}", e),
            }),
        }
    };

    let (status, body_bytes) = match timeout(config.timeout, exchange).await {
        Ok(Ok(Ok(parts))) => parts,
        Ok(Ok(Err(reason))) => {
            warn!("Readiness check failed: {} - {}", config.endpoint, reason);
            let elapsed = start_time.elapsed().as_millis() as u64;
            return Ok(HealthCheckData::unhealthy(elapsed, reason));
        }
        Ok(Err(e)) => return Err(e),
        Err(_) => {
            warn!("Readiness check timeout: {}", config.endpoint);
            return Err(HealthCheckError::Timeout {
                id: config.endpoint.clone(),
            });
        }
    };

    let mut is_healthy = config.expected_status.contains(&status.as_u16());
    let mut error_message = if is_healthy {
        None
    } else {
        Some(format!("Unexpected status code: {}", status))
    };

    if is_healthy {
        if let Some(expected) = &config.expected_body {
            let body = String::from_utf8_lossy(&body_bytes);
            if !body.contains(expected.as_str()) {
                debug!(
                    "Readiness body mismatch: {} (expected '{}', got '{}')",
                    config.endpoint, expected, body
                );
                is_healthy = false;
                error_message = Some(format!("Body does not contain '{}'", expected));
            }
        }
    }

    let elapsed = start_time.elapsed().as_millis() as u64;
    debug!(
        "Readiness check complete: {} - status={} healthy={} time={}ms",
        config.endpoint, status, is_healthy, elapsed
    );

    Ok(HealthCheckData {
        is_healthy,
        checked_at: Utc::now(),
        response_time_ms: Some(elapsed),
        status_code: Some(status.as_u16()),
        error_message,
    })
}

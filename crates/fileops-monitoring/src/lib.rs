//! # fileops-monitoring
//!
//! Readiness checking for the Pebble test fixture.
//!
//! The fixture normally relies on a fixed settle delay. When a readiness
//! endpoint is configured it additionally issues one HTTP request after
//! the delay and refuses to run tests against a daemon that doesn't
//! answer.

pub mod http;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Health check error types.
#[derive(Error, Debug)]
pub enum HealthCheckError {
    #[error("Health check timeout: {id}")]
    Timeout { id: String },

    #[error("Health check connection failed: {id} - {reason}")]
    ConnectionFailed { id: String, reason: String },

    #[error("Health check invalid response: {id} - {response}")]
    InvalidResponse { id: String, response: String },
}

/// Result type for health check operations.
pub type HealthCheckResult<T> = Result<T, HealthCheckError>;

/// Outcome of a single readiness request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckData {
    pub is_healthy: bool,
    pub checked_at: DateTime<Utc>,
    pub response_time_ms: Option<u64>,
    pub status_code: Option<u16>,
    pub error_message: Option<String>,
}

impl HealthCheckData {
    fn unhealthy(response_time_ms: u64, message: impl Into<String>) -> Self {
        Self {
            is_healthy: false,
            checked_at: Utc::now(),
            response_time_ms: Some(response_time_ms),
            status_code: None,
            error_message: Some(message.into()),
        }
    }
}

pub use http::*;

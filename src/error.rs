//! Error types for the market cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache core, the scheduler and the API.
///
/// `Clone` because a single in-flight computation hands the same result
/// to every caller waiting on it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CacheError {
    /// The compute function could not obtain fresh data
    #[error("Upstream fetch failed ({source_name}): {message}")]
    UpstreamFetch {
        source_name: String,
        message: String,
    },

    /// The compute function exceeded its timeout
    #[error("Compute for '{key}' timed out after {after_ms}ms")]
    Timeout { key: String, after_ms: u64 },

    /// The durable tier could not be reached
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// A scheduled job failed after exhausting its attempts
    #[error("Job '{name}' failed after {attempts} attempt(s): {message}")]
    Job {
        name: String,
        attempts: u32,
        message: String,
    },

    /// Invalid TTL pair or configuration value
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A value could not be serialized or deserialized
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Malformed request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Requested record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// Shorthand for an upstream failure.
    pub fn upstream(source_name: impl Into<String>, message: impl ToString) -> Self {
        CacheError::UpstreamFetch {
            source_name: source_name.into(),
            message: message.to_string(),
        }
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::UpstreamFetch { .. } | CacheError::Timeout { .. } => {
                StatusCode::BAD_GATEWAY
            }
            CacheError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::Job { .. }
            | CacheError::Configuration(_)
            | CacheError::Serialization(_)
            | CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the market cache.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_status_is_bad_gateway() {
        let response = CacheError::upstream("prices", "rate limited").into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_not_found_status() {
        let response = CacheError::NotFound("farm".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_job_error_message_carries_attempts() {
        let err = CacheError::Job {
            name: "daily".to_string(),
            attempts: 10,
            message: "subgraph timeout".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Job 'daily' failed after 10 attempt(s): subgraph timeout"
        );
    }

    #[test]
    fn test_serde_error_converts() {
        let err: CacheError = serde_json::from_str::<u64>("nope").unwrap_err().into();
        assert!(matches!(err, CacheError::Serialization(_)));
    }
}

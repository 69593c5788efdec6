use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Failures reported by the upstream block source, pre-classified so the
/// fetch pipeline can decide whether a retry is worthwhile.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    #[error("upstream rate limited: {0}")]
    RateLimited(String),

    #[error("upstream request failed: {0}")]
    Request(String),
}

/// Non-fatal outcomes of a model fit. The previous model, if any, stays
/// valid when one of these is returned.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitError {
    #[error("not enough usable samples to fit a model")]
    InsufficientData,

    #[error("normal equations are singular at the required tolerance")]
    SingularSystem,
}

#[derive(Error, Debug)]
pub enum FeeOracleError {
    #[error("upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("no baseFeePerGas available yet")]
    FeeDataUnavailable,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub error_code: String,
    pub timestamp: chrono::DateTime<Utc>,
    pub request_id: String,
}

impl IntoResponse for FeeOracleError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self {
            FeeOracleError::Upstream(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
            FeeOracleError::FeeDataUnavailable => {
                (StatusCode::SERVICE_UNAVAILABLE, "FEE_DATA_UNAVAILABLE")
            }
            FeeOracleError::InvalidArgument(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INVALID_ARGUMENT")
            }
            FeeOracleError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = ErrorResponse {
            success: false,
            error: self.to_string(),
            error_code: error_code.to_string(),
            timestamp: Utc::now(),
            request_id: Uuid::new_v4().to_string(),
        };

        tracing::error!(
            error = ?self,
            error_code = error_code,
            "Request failed"
        );

        (status, Json(body)).into_response()
    }
}

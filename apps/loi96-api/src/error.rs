//! Error types for the Loi 96 API

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use analysis_engine::AnalysisError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Missing or invalid x-user-id header")]
    Unauthenticated,

    #[error("Analysis not found: {0}")]
    AnalysisNotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Pipeline(#[from] AnalysisError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Unauthenticated => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::AnalysisNotFound(id) => {
                (StatusCode::NOT_FOUND, format!("Analysis not found: {}", id))
            }
            ApiError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Pipeline(e) => pipeline_status(e),
            ApiError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                )
            }
            ApiError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

/// Map the pipeline taxonomy onto HTTP statuses. Display strings are
/// already caller-safe; detail for the opaque variants goes to the logs
/// here, with inference and parse failures distinguished so parsing
/// regressions are visible separately from provider outages.
fn pipeline_status(error: &AnalysisError) -> (StatusCode, String) {
    let status = match error {
        AnalysisError::Validation(_) => StatusCode::BAD_REQUEST,
        AnalysisError::Security { detail } => {
            tracing::warn!(detail = %detail, "file rejected by content verification");
            StatusCode::BAD_REQUEST
        }
        AnalysisError::Throttled { .. } => StatusCode::TOO_MANY_REQUESTS,
        AnalysisError::QuotaExceeded => StatusCode::PAYMENT_REQUIRED,
        AnalysisError::Extraction(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AnalysisError::Inference(e) => {
            tracing::error!(error = %e, "inference call failed");
            StatusCode::BAD_GATEWAY
        }
        AnalysisError::Parse(detail) => {
            tracing::error!(detail = %detail, "inference output unparseable");
            StatusCode::BAD_GATEWAY
        }
        AnalysisError::Storage(e) => {
            tracing::error!(error = %e, "analysis persistence failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, error.to_string())
}

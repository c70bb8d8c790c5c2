//! HTTP response DTOs and error mapping.

use axum::Json;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::application::ports::DatafeedError;
use crate::error::{ErrorCode, ErrorResponse, GatewayError};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service version.
    pub version: String,
    /// Live bar subscriptions.
    pub bar_subscriptions: usize,
    /// Live quote listeners.
    pub quote_subscriptions: usize,
}

/// Server clock response.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ServerTimeResponse {
    /// Unix seconds.
    pub time: i64,
}

/// Push ingest acknowledgement.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PriceIngestResponse {
    /// Listeners the update was fanned out to.
    pub listeners: usize,
}

/// Outcome of a cancel, close or reverse command.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CommandResponse {
    /// Command result.
    pub ok: bool,
}

/// API error rendered as `{code, message}` with the matching status.
#[derive(Debug)]
pub struct ApiError(ErrorResponse);

impl ApiError {
    /// Create an error with an explicit code.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self(ErrorResponse {
            code,
            message: message.into(),
        })
    }
}

impl From<GatewayError> for ApiError {
    fn from(error: GatewayError) -> Self {
        Self(error.to_response())
    }
}

impl From<DatafeedError> for ApiError {
    fn from(error: DatafeedError) -> Self {
        let code = match error {
            DatafeedError::UnknownSymbol { .. } => ErrorCode::NotFound,
            DatafeedError::UnsupportedResolution { .. } | DatafeedError::InvalidRange { .. } => {
                ErrorCode::ValidationError
            }
        };
        Self::new(code, error.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0.code.http_status(), Json(self.0)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn datafeed_errors_map_to_statuses() {
        let unknown = ApiError::from(DatafeedError::UnknownSymbol {
            name: "ZZZ".to_string(),
        });
        assert_eq!(unknown.into_response().status(), StatusCode::NOT_FOUND);

        let range = ApiError::from(DatafeedError::InvalidRange { from: 10, to: 5 });
        assert_eq!(range.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn gateway_errors_keep_their_status() {
        let err = ApiError::from(GatewayError::UpstreamUnavailable {
            message: "ledger down".to_string(),
        });
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }
}

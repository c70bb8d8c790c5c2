//! Error taxonomy surfaced to the front-end.
//!
//! | Code | HTTP | Usage |
//! |------|------|-------|
//! | `VALIDATION_ERROR` | 400 | Bad input, rejected before any network call |
//! | `NOT_FOUND` | 404 | Unknown order/position on a non-idempotent command |
//! | `STATE_CONFLICT` | 409 | Transition out of a terminal order status |
//! | `UPSTREAM_UNAVAILABLE` | 502 | Ledger or quote source failed on a write path |
//!
//! Read paths never produce these: they recover through fallbacks.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::ports::StoreError;
use crate::domain::shared::DomainError;

/// Stable machine-readable error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Bad input.
    ValidationError,
    /// A quote source or the ledger failed.
    UpstreamUnavailable,
    /// Unknown entity.
    NotFound,
    /// Transition from a terminal status.
    StateConflict,
}

impl ErrorCode {
    /// HTTP status for this code.
    #[must_use]
    pub const fn http_status(self) -> StatusCode {
        match self {
            Self::ValidationError => StatusCode::BAD_REQUEST,
            Self::UpstreamUnavailable => StatusCode::BAD_GATEWAY,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::StateConflict => StatusCode::CONFLICT,
        }
    }

    /// Code as a static string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ValidationError => "VALIDATION_ERROR",
            Self::UpstreamUnavailable => "UPSTREAM_UNAVAILABLE",
            Self::NotFound => "NOT_FOUND",
            Self::StateConflict => "STATE_CONFLICT",
        }
    }
}

/// Failure of a trading command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// Bad input.
    #[error("Validation error on {field}: {message}")]
    Validation {
        /// Offending field.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// The ledger or a quote source failed.
    #[error("Upstream unavailable: {message}")]
    UpstreamUnavailable {
        /// Upstream error description.
        message: String,
    },

    /// Unknown order or position.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind.
        entity: String,
        /// Requested id.
        id: String,
    },

    /// Transition out of a terminal status.
    #[error("State conflict: {message}")]
    StateConflict {
        /// Conflict description.
        message: String,
    },
}

impl GatewayError {
    /// Shorthand for a validation error.
    #[must_use]
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Shorthand for a not-found error.
    #[must_use]
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Machine-readable code.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Validation { .. } => ErrorCode::ValidationError,
            Self::UpstreamUnavailable { .. } => ErrorCode::UpstreamUnavailable,
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::StateConflict { .. } => ErrorCode::StateConflict,
        }
    }

    /// JSON body for HTTP responses.
    #[must_use]
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.code(),
            message: self.to_string(),
        }
    }
}

impl From<DomainError> for GatewayError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InvalidValue { field, message } => Self::Validation { field, message },
            transition @ DomainError::InvalidStateTransition { .. } => Self::StateConflict {
                message: transition.to_string(),
            },
        }
    }
}

impl From<StoreError> for GatewayError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => Self::NotFound { entity, id },
            other => Self::UpstreamUnavailable {
                message: other.to_string(),
            },
        }
    }
}

/// Error body returned over HTTP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

//! Domain errors for the terminal gateway.

use thiserror::Error;

/// Domain-level errors raised by business rules.
///
/// These errors are independent of infrastructure concerns.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// Invalid state transition attempted.
    #[error("Invalid {entity} state transition from {from} to {to}")]
    InvalidStateTransition {
        /// Entity type (e.g., "Order").
        entity: String,
        /// Current state.
        from: String,
        /// Attempted state.
        to: String,
    },

    /// Invalid value for a field.
    #[error("Invalid value for {field}: {message}")]
    InvalidValue {
        /// Field name.
        field: String,
        /// Error message.
        message: String,
    },
}

impl DomainError {
    /// Shorthand for an [`DomainError::InvalidValue`].
    #[must_use]
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_value_display() {
        let err = DomainError::invalid("qty", "must be positive");
        assert_eq!(err.to_string(), "Invalid value for qty: must be positive");
    }

    #[test]
    fn transition_display() {
        let err = DomainError::InvalidStateTransition {
            entity: "Order".to_string(),
            from: "FILLED".to_string(),
            to: "CANCELED".to_string(),
        };
        assert!(err.to_string().contains("FILLED"));
    }
}

//! Order State Machine Service
//!
//! Validates local status transitions before a command is sent to the ledger.

use crate::domain::shared::DomainError;
use crate::domain::trading::value_objects::OrderStatus;

/// Order State Machine for validating transitions.
pub struct OrderStateMachine;

impl OrderStateMachine {
    /// Check if a state transition is valid.
    #[must_use]
    pub const fn is_valid_transition(from: OrderStatus, to: OrderStatus) -> bool {
        matches!(
            (from, to),
            // From Pending
            (OrderStatus::Pending, OrderStatus::Working)
                | (OrderStatus::Pending, OrderStatus::Canceled)
                | (OrderStatus::Pending, OrderStatus::Rejected)
                // From Working
                | (OrderStatus::Working, OrderStatus::Partial)
                | (OrderStatus::Working, OrderStatus::Filled)
                | (OrderStatus::Working, OrderStatus::Canceled)
                | (OrderStatus::Working, OrderStatus::Rejected)
                // From Partial
                | (OrderStatus::Partial, OrderStatus::Partial)
                | (OrderStatus::Partial, OrderStatus::Filled)
                | (OrderStatus::Partial, OrderStatus::Canceled)
        )
    }

    /// Validate a state transition.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidStateTransition`] if the transition is invalid.
    pub fn validate_transition(from: OrderStatus, to: OrderStatus) -> Result<(), DomainError> {
        if Self::is_valid_transition(from, to) {
            Ok(())
        } else {
            Err(DomainError::InvalidStateTransition {
                entity: "Order".to_string(),
                from: from.to_string(),
                to: to.to_string(),
            })
        }
    }

    /// Get all valid next states from a given state.
    #[must_use]
    pub fn valid_next_states(from: OrderStatus) -> Vec<OrderStatus> {
        match from {
            OrderStatus::Pending => vec![
                OrderStatus::Working,
                OrderStatus::Canceled,
                OrderStatus::Rejected,
            ],
            OrderStatus::Working => vec![
                OrderStatus::Partial,
                OrderStatus::Filled,
                OrderStatus::Canceled,
                OrderStatus::Rejected,
            ],
            OrderStatus::Partial => vec![
                OrderStatus::Partial,
                OrderStatus::Filled,
                OrderStatus::Canceled,
            ],
            // Terminal states
            OrderStatus::Filled | OrderStatus::Canceled | OrderStatus::Rejected => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_can_be_canceled_or_rejected_directly() {
        assert!(OrderStateMachine::is_valid_transition(
            OrderStatus::Pending,
            OrderStatus::Canceled
        ));
        assert!(OrderStateMachine::is_valid_transition(
            OrderStatus::Pending,
            OrderStatus::Rejected
        ));
        assert!(!OrderStateMachine::is_valid_transition(
            OrderStatus::Pending,
            OrderStatus::Filled
        ));
    }

    #[test]
    fn working_progresses_to_fills() {
        assert!(OrderStateMachine::is_valid_transition(
            OrderStatus::Working,
            OrderStatus::Partial
        ));
        assert!(OrderStateMachine::is_valid_transition(
            OrderStatus::Partial,
            OrderStatus::Filled
        ));
        assert!(!OrderStateMachine::is_valid_transition(
            OrderStatus::Partial,
            OrderStatus::Working
        ));
    }

    #[test]
    fn no_transitions_from_terminal_states() {
        for terminal in [
            OrderStatus::Filled,
            OrderStatus::Canceled,
            OrderStatus::Rejected,
        ] {
            assert!(OrderStateMachine::valid_next_states(terminal).is_empty());
            for to in [OrderStatus::Working, OrderStatus::Canceled, OrderStatus::Filled] {
                assert!(!OrderStateMachine::is_valid_transition(terminal, to));
            }
        }
    }

    #[test]
    fn next_states_agree_with_transition_table() {
        for from in [
            OrderStatus::Pending,
            OrderStatus::Working,
            OrderStatus::Partial,
        ] {
            for to in OrderStateMachine::valid_next_states(from) {
                assert!(OrderStateMachine::is_valid_transition(from, to));
            }
        }
    }

    #[test]
    fn validate_transition_reports_states() {
        let err = OrderStateMachine::validate_transition(OrderStatus::Filled, OrderStatus::Canceled)
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidStateTransition {
                entity: "Order".to_string(),
                from: "FILLED".to_string(),
                to: "CANCELED".to_string(),
            }
        );
    }
}

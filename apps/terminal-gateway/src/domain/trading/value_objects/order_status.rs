//! Canonical order status.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::order_type::normalize;

/// Order status as shown to the front-end.
///
/// Lifecycle: `pending -> working -> {partial -> filled | canceled | rejected}`
/// with direct `pending -> canceled` and `pending -> rejected`. `filled`,
/// `canceled` and `rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Submitted, not yet live at the venue.
    Pending,
    /// Live and waiting to fill.
    Working,
    /// Partially filled, remainder still live.
    Partial,
    /// Completely filled.
    Filled,
    /// Canceled before completing.
    Canceled,
    /// Refused by the ledger.
    Rejected,
}

impl OrderStatus {
    /// Returns true if no further transition is permitted.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Filled | Self::Canceled | Self::Rejected)
    }

    /// Returns true if the order is still live.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Status code written to the ledger.
    #[must_use]
    pub const fn as_backend(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Working => "working",
            Self::Partial => "partially_filled",
            Self::Filled => "filled",
            Self::Canceled => "cancelled",
            Self::Rejected => "rejected",
        }
    }

    /// Map a ledger status string onto the canonical enum.
    ///
    /// Total: anything unrecognized maps to [`OrderStatus::Working`] so an
    /// unexpected ledger value never strands the UI in an error state.
    #[must_use]
    pub fn from_backend(raw: &str) -> Self {
        match normalize(raw).as_str() {
            "pending" | "pending_new" | "new" | "inactive" | "placing" | "queued" => {
                Self::Pending
            }
            "working" | "open" | "accepted" | "active" | "live" => Self::Working,
            "partial" | "partially_filled" | "partiallyfilled" | "partial_fill" => Self::Partial,
            "filled" | "executed" | "done" | "complete" | "completed" => Self::Filled,
            "canceled" | "cancelled" | "expired" | "done_for_day" => Self::Canceled,
            "rejected" | "failed" | "error" => Self::Rejected,
            other => {
                tracing::debug!(status = other, "Unrecognized order status, reading as working");
                Self::Working
            }
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Working => write!(f, "WORKING"),
            Self::Partial => write!(f, "PARTIAL"),
            Self::Filled => write!(f, "FILLED"),
            Self::Canceled => write!(f, "CANCELED"),
            Self::Rejected => write!(f, "REJECTED"),
        }
    }
}

//! Shared Value Objects
//!
//! Immutable domain types compared by value, not identity.

mod identifiers;
mod symbol;

pub use identifiers::{AccountId, OrderId, PositionId, SubscriberId};
pub use symbol::Symbol;

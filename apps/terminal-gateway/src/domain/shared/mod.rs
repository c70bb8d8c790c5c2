//! Shared Domain Types
//!
//! Value objects and errors shared across the market data and trading contexts.

pub mod errors;
pub mod value_objects;

pub use errors::DomainError;
pub use value_objects::{AccountId, OrderId, PositionId, SubscriberId, Symbol};

//! Trading Bounded Context
//!
//! Canonical orders, positions and account state, plus the order status
//! state machine.

mod account;
mod order;
mod position;
pub mod services;
pub mod value_objects;

pub use account::{AccountMetainfo, AccountState};
pub use order::{CanonicalOrder, PreOrder};
pub use position::CanonicalPosition;
pub use services::OrderStateMachine;
pub use value_objects::{OrderSide, OrderStatus, OrderType};

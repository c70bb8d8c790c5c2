//! Domain Layer
//!
//! Pure business types and rules, free of I/O.

pub mod market_data;
pub mod shared;
pub mod trading;

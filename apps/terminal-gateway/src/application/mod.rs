//! Application Layer
//!
//! Orchestrates the domain through ports and services:
//!
//! - **Ports**: the datafeed and broker contracts the front-end drives, and
//!   the quote, bar, ledger and push-channel interfaces the core drives
//! - **Services**: quote multiplexing, bar subscriptions, history, account
//!   normalization and trading commands

pub mod ports;
pub mod services;

pub use ports::*;
pub use services::*;

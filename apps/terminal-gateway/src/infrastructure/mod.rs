//! Infrastructure Layer
//!
//! Adapters implementing the application ports, the HTTP driver adapter and
//! the container that wires them.

pub mod backend;
pub mod container;
pub mod http;
pub mod persistence;
pub mod quote_sources;
pub mod realtime;

pub use container::{Container, ContainerError};

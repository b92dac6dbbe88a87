//! Network subsystem.
//!
//! # Data Flow
//! ```text
//! target URL (opaque string)
//!     → connection.rs (ConnectionFactory: parse, connect under AttemptContext)
//!     → live connection handed to the caller
//! ```
//!
//! # Design Decisions
//! - The core only sees the `ConnectionFactory` trait
//! - Targets are opaque to everything but the concrete factory
//! - Credentials never reach the logs (see `redact_target`)

pub mod connection;

pub use connection::{redact_target, ConnectError, ConnectionFactory, PgConnector};
pub use crate::resilience::timeouts::AttemptContext;

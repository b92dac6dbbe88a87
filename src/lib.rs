//! Database bootstrap library: failure-gated connection establishment
//! with a deadline-bounded retry loop.

pub mod config;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod provision;
pub mod resilience;

pub use config::schema::BootstrapConfig;
pub use lifecycle::startup::{BootstrapError, Bootstrapped, Bootstrapper, RetrySettings};
pub use net::{AttemptContext, ConnectError, ConnectionFactory, PgConnector};
pub use resilience::circuit_breaker::{FailureGate, GateError, GateSnapshot};

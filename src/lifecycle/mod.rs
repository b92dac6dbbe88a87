//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Gated attempt → on failure spawn retry session
//!     → retry session polls the gate until success or deadline
//!     → result handed back to the caller over a oneshot channel
//! ```
//!
//! # Design Decisions
//! - Fail fast: a missed deadline is returned to `main`, which exits
//! - At most one background task per bootstrap
//! - The retry session is not externally cancellable

pub mod startup;

pub use startup::{BootstrapError, Bootstrapped, Bootstrapper, RetrySettings};

//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Connection attempt:
//!     → circuit_breaker.rs (admission check against the failure history)
//!     → backoff.rs (cooldown length for the current failure count)
//!     → timeouts.rs (attempt context: cancellation and optional deadline)
//!     → factory call, then circuit_breaker.rs records the outcome
//! ```
//!
//! # Design Decisions
//! - The gate never retries; retry policy lives in lifecycle/startup.rs
//! - The gate never masks a factory error, it only adds its own rejection
//! - Cooldown is recomputed per call, there is no background clock

pub mod backoff;
pub mod circuit_breaker;
pub mod timeouts;

//! Pure-logic fault tolerance primitives for calling the LLM backend
//!
//! # Overview
//!
//! This crate provides the circuit breaker used to protect calls to an
//! [`LLMClient`](../orchestrator/trait.LLMClient.html) implementation from
//! cascading failures. It has no knowledge of HTTP, providers, or prompts —
//! it only knows how to track consecutive failures and decide whether a call
//! should be attempted.
//!
//! # Key Principles
//!
//! This crate is **pure logic** with zero knowledge of:
//! - Storage systems (databases, file systems)
//! - Network protocols or provider wire formats
//! - Application-specific concerns
//!
//! # Usage Example
//!
//! ```no_run
//! use llm_resilience::{CircuitBreaker, CircuitBreakerConfig, ResilienceError};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), ResilienceError> {
//! let config = CircuitBreakerConfig {
//!     failure_threshold: 5,
//!     success_threshold: 2,
//!     cooldown: Duration::from_secs(60),
//!     ..Default::default()
//! };
//!
//! let breaker = CircuitBreaker::new(config);
//!
//! let result = breaker.execute(|| async {
//!     Ok::<_, ResilienceError>(42)
//! }).await?;
//! # Ok(())
//! # }
//! ```

pub mod circuit_breaker;
pub mod error;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use error::ResilienceError;

/// Prelude module for convenient imports
///
/// # Example
/// ```
/// use llm_resilience::prelude::*;
/// ```
pub mod prelude {
    pub use super::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
    pub use super::error::ResilienceError;
}

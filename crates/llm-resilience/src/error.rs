//! Error types for resilience primitives

use thiserror::Error;

/// Errors that can occur while executing an operation through a [`crate::CircuitBreaker`]
#[derive(Debug, Error)]
pub enum ResilienceError {
    /// The circuit is open and the call was rejected without being attempted
    #[error("circuit is open")]
    CircuitOpen,

    /// A failure that is expected to be temporary (timeout, connection reset, 429/5xx).
    /// Eligible for retry with backoff.
    #[error("transient failure: {0}")]
    Transient(String),

    /// A failure that retrying will not fix (bad request, auth failure, validation error).
    /// Not retried and does not count against the circuit breaker's failure threshold.
    #[error("permanent failure: {0}")]
    Permanent(String),
}

impl ResilienceError {
    /// Whether this error should be retried with backoff by [`crate::CircuitBreaker::execute`]
    pub fn is_transient(&self) -> bool {
        matches!(self, ResilienceError::Transient(_))
    }

    /// Whether this error is known to be unrecoverable by retrying
    pub fn is_permanent(&self) -> bool {
        matches!(self, ResilienceError::Permanent(_))
    }

    /// Whether this error should count as a failure against the circuit breaker
    pub fn should_trip_breaker(&self) -> bool {
        !matches!(self, ResilienceError::Permanent(_))
    }
}

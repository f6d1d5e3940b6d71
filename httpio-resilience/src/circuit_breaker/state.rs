//! Circuit breaker states.

use std::fmt;

/// The state of a circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CircuitState {
    /// Requests pass through and consecutive failures are counted.
    #[default]
    Closed,
    /// Requests are rejected until the recovery timeout elapses.
    Open,
    /// A limited number of probe requests are let through.
    HalfOpen,
}

impl CircuitState {
    /// Upper-case name, as shown in logs and [`Display`](fmt::Display).
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "CLOSED",
            CircuitState::Open => "OPEN",
            CircuitState::HalfOpen => "HALF_OPEN",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

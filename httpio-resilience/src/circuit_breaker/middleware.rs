use std::sync::Arc;

use async_trait::async_trait;
use httpio_core::{Context, Middleware, Next, Request, Response, Result};

use super::{CircuitBreaker, CircuitBreakerConfig};

/// Guards the rest of the chain with a [`CircuitBreaker`].
///
/// Rejected requests fail with `Error::CircuitOpen` and never reach the
/// transport. Every admitted request's outcome is classified with the
/// breaker's failure predicate and then returned unchanged.
#[derive(Clone, Debug)]
pub struct CircuitBreakerMiddleware {
    breaker: Arc<CircuitBreaker>,
}

impl CircuitBreakerMiddleware {
    /// Creates a middleware owning a new breaker.
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self::from_breaker(Arc::new(CircuitBreaker::new(config)))
    }

    /// Creates a middleware over a breaker shared with other code.
    pub fn from_breaker(breaker: Arc<CircuitBreaker>) -> Self {
        Self { breaker }
    }

    /// The underlying breaker, for inspection or manual reset.
    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }
}

impl Default for CircuitBreakerMiddleware {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

#[async_trait]
impl Middleware for CircuitBreakerMiddleware {
    async fn handle(&self, ctx: &Context, req: Request, next: Next<'_>) -> Result<Response> {
        let permit = self.breaker.acquire()?;
        let outcome = next.run(ctx, req).await;
        permit.record(self.breaker.is_failure(&outcome));
        outcome
    }
}

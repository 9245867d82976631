use super::backend::BackendPool;
use super::balancer::Selector;
use crate::config::{ConfigError, FailoverConfig, MAX_TIMEOUT};
use crate::s3::StoreError;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, error, info};

/// Why one candidate's attempt failed
#[derive(Debug, Error)]
pub enum AttemptCause {
    #[error("attempt timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One failed attempt, recorded for diagnostics
#[derive(Debug)]
pub struct AttemptFailure {
    /// Pool index of the backend
    pub index: usize,
    pub endpoint: String,
    /// How long the attempt ran
    pub elapsed: Duration,
    pub cause: AttemptCause,
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} after {:?}: {}",
            self.index, self.endpoint, self.elapsed, self.cause
        )
    }
}

/// Errors surfaced to callers of a routed operation
#[derive(Debug, Error)]
pub enum FailoverError {
    /// No backend succeeded before the candidates or the overall budget ran out
    #[error("{operation} failed on all backends: {} attempt(s) within {elapsed:?}", .causes.len())]
    Exhausted {
        operation: String,
        elapsed: Duration,
        /// One entry per attempted backend, in attempt order
        causes: Vec<AttemptFailure>,
    },

    /// A backend answered with an error every replica would repeat
    /// (missing key, bad credentials, not an S3 endpoint)
    #[error("{operation} rejected by {endpoint}: {source}")]
    Rejected {
        operation: String,
        index: usize,
        endpoint: String,
        source: StoreError,
    },
}

impl FailoverError {
    /// Per-attempt failures, empty for [`FailoverError::Rejected`]
    pub fn causes(&self) -> &[AttemptFailure] {
        match self {
            FailoverError::Exhausted { causes, .. } => causes,
            FailoverError::Rejected { .. } => &[],
        }
    }
}

/// Successful result together with how it was obtained
#[derive(Debug)]
pub struct Routed<T> {
    pub value: T,
    /// Pool index of the backend that served the request
    pub index: usize,
    pub endpoint: String,
    /// Attempts that failed before the serving backend answered
    pub failures: Vec<AttemptFailure>,
}

/// Runs one logical request across the pool's candidates.
///
/// Candidate order comes from the [`Selector`]; the executor only applies
/// budgets. Each attempt is bounded by `min(max_try_timeout, remaining)`, so
/// a request never runs past `fallback_timeout`. Attempt outcomes are fed back
/// into the backend's health right away rather than waiting for the next
/// monitor sweep.
pub struct FailoverExecutor {
    selector: Box<dyn Selector>,
    fallback_timeout: Duration,
    max_try_timeout: Duration,
}

impl FailoverExecutor {
    pub fn new(
        selector: Box<dyn Selector>,
        fallback_timeout: Duration,
        max_try_timeout: Duration,
    ) -> Self {
        Self {
            selector,
            fallback_timeout,
            max_try_timeout,
        }
    }

    pub fn from_config(config: &FailoverConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(
            config.algorithm.selector()?,
            config.fallback_timeout,
            config.max_try_timeout,
        ))
    }

    pub fn fallback_timeout(&self) -> Duration {
        self.fallback_timeout
    }

    pub fn max_try_timeout(&self) -> Duration {
        self.max_try_timeout
    }

    /// Run `op` against candidates until one succeeds.
    ///
    /// `operation` names the call in logs and errors.
    pub async fn execute<C, T, F, Fut>(
        &self,
        pool: &BackendPool<C>,
        operation: &str,
        op: F,
    ) -> Result<Routed<T>, FailoverError>
    where
        F: Fn(Arc<C>) -> Fut,
        Fut: Future<Output = crate::s3::Result<T>>,
    {
        let start = Instant::now();
        // Executors built with `new` may carry an unvalidated budget
        let deadline = start
            .checked_add(self.fallback_timeout)
            .unwrap_or_else(|| start + MAX_TIMEOUT);
        let candidates = self.selector.select_candidates(&pool.snapshot());
        let mut failures: Vec<AttemptFailure> = Vec::new();

        for index in candidates {
            let Some(backend) = pool.get(index) else {
                continue;
            };

            let attempt_start = Instant::now();
            if attempt_start >= deadline {
                debug!(operation, "fallback timeout reached before trying every backend");
                break;
            }
            let budget = self.max_try_timeout.min(deadline - attempt_start);

            let cause = match tokio::time::timeout(budget, op(Arc::clone(backend.client()))).await
            {
                Ok(Ok(value)) => {
                    backend.mark_healthy();
                    if !failures.is_empty() {
                        info!(
                            operation,
                            endpoint = %backend.endpoint(),
                            index,
                            failed_attempts = failures.len(),
                            "request served by fallback backend"
                        );
                    }
                    return Ok(Routed {
                        value,
                        index,
                        endpoint: backend.endpoint().to_string(),
                        failures,
                    });
                }
                Ok(Err(e)) if !e.is_retryable() => {
                    // The backend answered; it is alive even if the request was refused
                    backend.mark_healthy();
                    debug!(operation, endpoint = %backend.endpoint(), error = %e, "request rejected");
                    return Err(FailoverError::Rejected {
                        operation: operation.to_string(),
                        index,
                        endpoint: backend.endpoint().to_string(),
                        source: e,
                    });
                }
                Ok(Err(e)) => AttemptCause::Store(e),
                Err(_) => AttemptCause::Timeout(budget),
            };

            backend.mark_unhealthy();
            error!(
                operation,
                endpoint = %backend.endpoint(),
                index,
                error = %cause,
                "backend call failed, searching for a healthy backend"
            );
            failures.push(AttemptFailure {
                index,
                endpoint: backend.endpoint().to_string(),
                elapsed: attempt_start.elapsed(),
                cause,
            });
        }

        let elapsed = start.elapsed();
        error!(
            operation,
            attempts = failures.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "request failed on all backends"
        );
        Err(FailoverError::Exhausted {
            operation: operation.to_string(),
            elapsed,
            causes: failures,
        })
    }
}

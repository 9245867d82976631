use crate::config::ConfigError;
use crate::s3::HealthProbe;
use std::fmt;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::time::Instant;

/// Liveness of a backend as last observed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HealthStatus {
    /// No probe or request has completed against the backend yet
    Unknown,
    Healthy,
    Unhealthy,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HealthStatus::Unknown => "unknown",
            HealthStatus::Healthy => "healthy",
            HealthStatus::Unhealthy => "unhealthy",
        };
        f.write_str(name)
    }
}

/// Point-in-time copy of one backend's health
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthSnapshot {
    pub status: HealthStatus,
    /// When the most recent probe (or opportunistic update) completed
    pub last_checked_at: Option<Instant>,
}

#[derive(Debug)]
struct HealthState {
    status: HealthStatus,
    last_checked_at: Option<Instant>,
    consecutive_failures: u32,
    last_latency: Option<Duration>,
    last_error: Option<String>,
}

/// One storage client plus its health state.
///
/// Status and timestamp are updated together under a per-backend lock, so a
/// reader never observes one without the other and updating one backend never
/// contends with another.
pub struct Backend<C> {
    client: Arc<C>,
    endpoint: String,
    state: RwLock<HealthState>,
}

impl<C: HealthProbe> Backend<C> {
    pub fn new(client: C) -> Self {
        Self::from_arc(Arc::new(client))
    }

    pub fn from_arc(client: Arc<C>) -> Self {
        let endpoint = client.endpoint().to_string();
        Self {
            client,
            endpoint,
            state: RwLock::new(HealthState {
                status: HealthStatus::Unknown,
                last_checked_at: None,
                consecutive_failures: 0,
                last_latency: None,
                last_error: None,
            }),
        }
    }
}

impl<C> Backend<C> {
    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Record a successful probe or request
    pub fn mark_healthy(&self) {
        self.update(HealthStatus::Healthy, None, None);
    }

    /// Record a failed probe or request
    pub fn mark_unhealthy(&self) {
        self.update(HealthStatus::Unhealthy, None, None);
    }

    /// Record a probe outcome together with its latency and failure reason
    pub(crate) fn record_probe(&self, healthy: bool, latency: Duration, error: Option<String>) {
        let status = if healthy {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        };
        self.update(status, Some(latency), error);
    }

    fn update(&self, status: HealthStatus, latency: Option<Duration>, error: Option<String>) {
        let mut state = match self.state.write() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };

        // last_checked_at strictly advances, even when the clock has not
        let now = Instant::now();
        let checked_at = match state.last_checked_at {
            Some(prev) if now <= prev => prev + Duration::from_nanos(1),
            _ => now,
        };

        state.status = status;
        state.last_checked_at = Some(checked_at);
        if latency.is_some() {
            state.last_latency = latency;
        }
        match status {
            HealthStatus::Healthy => {
                state.consecutive_failures = 0;
                state.last_error = None;
            }
            _ => {
                state.consecutive_failures = state.consecutive_failures.saturating_add(1);
                if error.is_some() {
                    state.last_error = error;
                }
            }
        }
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        let state = match self.state.read() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        HealthSnapshot {
            status: state.status,
            last_checked_at: state.last_checked_at,
        }
    }

    pub fn status(&self) -> HealthStatus {
        self.snapshot().status
    }

    /// Time since the last completed check, `None` if never checked
    pub fn time_since_last_check(&self) -> Option<Duration> {
        self.snapshot().last_checked_at.map(|at| at.elapsed())
    }

    /// Whether a probe is due given the minimum spacing between probes
    pub fn needs_check(&self, min_interval: Duration) -> bool {
        match self.time_since_last_check() {
            Some(age) => age >= min_interval,
            None => true,
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.read_state(|s| s.consecutive_failures)
    }

    pub fn last_latency(&self) -> Option<Duration> {
        self.read_state(|s| s.last_latency)
    }

    pub fn last_error(&self) -> Option<String> {
        self.read_state(|s| s.last_error.clone())
    }

    fn read_state<T>(&self, f: impl FnOnce(&HealthState) -> T) -> T {
        match self.state.read() {
            Ok(state) => f(&state),
            Err(poisoned) => f(&poisoned.into_inner()),
        }
    }
}

impl<C> fmt::Debug for Backend<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backend")
            .field("endpoint", &self.endpoint)
            .field("health", &self.snapshot())
            .finish()
    }
}

/// Ordered, non-empty set of backends fixed at construction
pub struct BackendPool<C> {
    backends: Vec<Backend<C>>,
}

impl<C: HealthProbe> BackendPool<C> {
    pub fn new(clients: impl IntoIterator<Item = C>) -> Result<Self, ConfigError> {
        Self::from_backends(clients.into_iter().map(Backend::new).collect())
    }
}

impl<C> BackendPool<C> {
    pub fn from_backends(backends: Vec<Backend<C>>) -> Result<Self, ConfigError> {
        if backends.is_empty() {
            return Err(ConfigError::EmptyPool);
        }
        Ok(Self { backends })
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Backend<C>> {
        self.backends.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Backend<C>> {
        self.backends.iter()
    }

    /// Health of every backend, in pool order
    pub fn snapshot(&self) -> Vec<HealthSnapshot> {
        self.backends.iter().map(Backend::snapshot).collect()
    }
}

impl<C> fmt::Debug for BackendPool<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.backends.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::thread;

    struct Named(&'static str);

    #[async_trait]
    impl HealthProbe for Named {
        fn endpoint(&self) -> &str {
            self.0
        }

        async fn probe(&self) -> crate::s3::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_backend_creation() {
        let backend = Backend::new(Named("http://minio1:9000"));
        assert_eq!(backend.endpoint(), "http://minio1:9000");
        assert_eq!(backend.status(), HealthStatus::Unknown);
        assert!(backend.snapshot().last_checked_at.is_none());
        assert!(backend.needs_check(Duration::from_secs(10)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_transitions() {
        let backend = Backend::new(Named("http://minio1:9000"));

        backend.mark_unhealthy();
        assert_eq!(backend.status(), HealthStatus::Unhealthy);
        assert_eq!(backend.consecutive_failures(), 1);

        backend.mark_unhealthy();
        assert_eq!(backend.consecutive_failures(), 2);

        backend.mark_healthy();
        assert_eq!(backend.status(), HealthStatus::Healthy);
        assert_eq!(backend.consecutive_failures(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_checked_strictly_increases() {
        let backend = Backend::new(Named("http://minio1:9000"));

        backend.mark_healthy();
        let first = backend.snapshot().last_checked_at.unwrap();
        // The paused clock has not moved
        backend.mark_healthy();
        let second = backend.snapshot().last_checked_at.unwrap();
        assert!(second > first);
        assert_eq!(backend.status(), HealthStatus::Healthy);
    }

    #[tokio::test(start_paused = true)]
    async fn test_needs_check_respects_interval() {
        let backend = Backend::new(Named("http://minio1:9000"));
        backend.mark_healthy();
        assert!(!backend.needs_check(Duration::from_secs(10)));

        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(backend.needs_check(Duration::from_secs(10)));
    }

    #[test]
    fn test_probe_details_recorded() {
        let backend = Backend::new(Named("http://minio1:9000"));
        backend.record_probe(false, Duration::from_millis(40), Some("refused".to_string()));
        assert_eq!(backend.last_error().as_deref(), Some("refused"));
        assert_eq!(backend.last_latency(), Some(Duration::from_millis(40)));

        backend.record_probe(true, Duration::from_millis(3), None);
        assert!(backend.last_error().is_none());
        assert_eq!(backend.last_latency(), Some(Duration::from_millis(3)));
    }

    #[test]
    fn test_concurrent_updates() {
        let backend = Arc::new(Backend::new(Named("http://minio1:9000")));
        let other = Arc::clone(&backend);

        let handle = thread::spawn(move || {
            for _ in 0..100 {
                other.mark_unhealthy();
            }
        });
        for _ in 0..100 {
            backend.mark_unhealthy();
        }
        handle.join().unwrap();

        assert_eq!(backend.consecutive_failures(), 200);
        assert_eq!(backend.status(), HealthStatus::Unhealthy);
    }

    #[test]
    fn test_empty_pool_rejected() {
        let result = BackendPool::<Named>::new(Vec::new());
        assert!(matches!(result, Err(ConfigError::EmptyPool)));
    }

    #[test]
    fn test_pool_snapshot_order() {
        let pool = BackendPool::new([Named("a"), Named("b"), Named("c")]).unwrap();
        pool.get(1).unwrap().mark_unhealthy();

        assert_eq!(pool.len(), 3);
        assert!(!pool.is_empty());

        let snapshot = pool.snapshot();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot[0].status, HealthStatus::Unknown);
        assert_eq!(snapshot[1].status, HealthStatus::Unhealthy);
        assert_eq!(snapshot[2].status, HealthStatus::Unknown);
    }
}

use super::backend::{Backend, BackendPool, HealthStatus};
use crate::config::FailoverConfig;
use crate::s3::HealthProbe;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Configuration for health checking
#[derive(Debug, Clone, PartialEq)]
pub struct HealthCheckConfig {
    /// Bound on a single probe
    pub timeout: Duration,
    /// Minimum time between two probes of the same backend
    pub interval: Duration,
    /// Time between monitor sweeps
    pub heartbeat: Duration,
}

impl From<&FailoverConfig> for HealthCheckConfig {
    fn from(config: &FailoverConfig) -> Self {
        Self {
            timeout: config.health_check_timeout,
            interval: config.health_check_interval,
            heartbeat: config.health_check_heartbeat,
        }
    }
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self::from(&FailoverConfig::default())
    }
}

/// Why a probe marked its backend unhealthy
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeFailure {
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),

    #[error("probe failed: {0}")]
    Failed(String),
}

/// Result of one probe, already applied to the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Healthy { latency: Duration },
    Unhealthy { latency: Duration, failure: ProbeFailure },
}

impl ProbeOutcome {
    pub fn is_healthy(&self) -> bool {
        matches!(self, ProbeOutcome::Healthy { .. })
    }
}

/// Probe one backend, bounded by `timeout`, and record the outcome.
///
/// Probe failure is the expected unhealthy signal and is returned as a value.
/// The health update happens in one step after the probe resolves, so
/// cancelling this future never leaves a half-applied update.
pub async fn probe<C: HealthProbe>(backend: &Backend<C>, timeout: Duration) -> ProbeOutcome {
    let previous = backend.status();
    let start = Instant::now();
    let result = tokio::time::timeout(timeout, backend.client().probe()).await;
    let latency = start.elapsed();

    let outcome = match result {
        Ok(Ok(())) => ProbeOutcome::Healthy { latency },
        Ok(Err(e)) => ProbeOutcome::Unhealthy {
            latency,
            failure: ProbeFailure::Failed(e.to_string()),
        },
        Err(_) => ProbeOutcome::Unhealthy {
            latency,
            failure: ProbeFailure::Timeout(timeout),
        },
    };

    match &outcome {
        ProbeOutcome::Healthy { latency } => {
            backend.record_probe(true, *latency, None);
            if previous != HealthStatus::Healthy {
                info!(
                    endpoint = %backend.endpoint(),
                    latency_ms = latency.as_millis() as u64,
                    "backend healthy"
                );
            } else {
                debug!(
                    endpoint = %backend.endpoint(),
                    latency_ms = latency.as_millis() as u64,
                    "health check ok"
                );
            }
        }
        ProbeOutcome::Unhealthy { latency, failure } => {
            backend.record_probe(false, *latency, Some(failure.to_string()));
            if previous != HealthStatus::Unhealthy {
                warn!(endpoint = %backend.endpoint(), error = %failure, "backend unhealthy");
            } else {
                debug!(endpoint = %backend.endpoint(), error = %failure, "health check still failing");
            }
        }
    }

    outcome
}

/// Probe the given backends concurrently; returns how many were probed
async fn probe_many<C: HealthProbe>(
    pool: &BackendPool<C>,
    indices: Vec<usize>,
    timeout: Duration,
) -> usize {
    let probes: Vec<_> = indices
        .iter()
        .filter_map(|&idx| pool.get(idx))
        .map(|backend| probe(backend, timeout))
        .collect();
    let count = probes.len();
    futures::future::join_all(probes).await;
    count
}

/// Probe every backend whose last check is older than `config.interval`
pub async fn sweep<C: HealthProbe>(pool: &BackendPool<C>, config: &HealthCheckConfig) -> usize {
    let due: Vec<usize> = pool
        .iter()
        .enumerate()
        .filter(|(_, backend)| backend.needs_check(config.interval))
        .map(|(idx, _)| idx)
        .collect();
    probe_many(pool, due, config.timeout).await
}

/// Monitor lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Stopped,
    Running,
}

struct RunningMonitor {
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

/// Background health checker sweeping the pool every heartbeat
pub struct HealthMonitor<C> {
    pool: Arc<BackendPool<C>>,
    config: HealthCheckConfig,
    running: Mutex<Option<RunningMonitor>>,
}

impl<C: HealthProbe> HealthMonitor<C> {
    pub fn new(pool: Arc<BackendPool<C>>, config: HealthCheckConfig) -> Self {
        Self {
            pool,
            config,
            running: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &HealthCheckConfig {
        &self.config
    }

    /// Start the background sweep task.
    ///
    /// The first sweep runs immediately. Returns false if the monitor was
    /// already running. Must be called from within a tokio runtime.
    pub fn start(&self) -> bool {
        let mut running = self.lock_running();
        if let Some(current) = running.as_ref() {
            if !current.task.is_finished() {
                return false;
            }
        }

        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        let pool = Arc::clone(&self.pool);
        let config = self.config.clone();

        info!(
            backends = pool.len(),
            heartbeat_secs = config.heartbeat.as_secs_f64(),
            interval_secs = config.interval.as_secs_f64(),
            timeout_secs = config.timeout.as_secs_f64(),
            "health monitor started"
        );

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(config.heartbeat);

            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        info!("health monitor shutting down");
                        break;
                    }
                    probed = async {
                        ticker.tick().await;
                        let start = Instant::now();
                        let probed = sweep(&pool, &config).await;
                        (probed, start.elapsed())
                    } => {
                        let (probed, elapsed) = probed;
                        debug!(
                            probed,
                            elapsed_ms = elapsed.as_millis() as u64,
                            "health sweep completed"
                        );
                    }
                }
            }
        });

        *running = Some(RunningMonitor { shutdown, task });
        true
    }

    /// Stop sweeping and cancel in-flight probes; health state is kept as-is
    pub fn shutdown(&self) {
        if let Some(current) = self.lock_running().take() {
            current.shutdown.cancel();
        }
    }

    /// Like [`shutdown`](Self::shutdown), but waits for the task to exit
    pub async fn shutdown_and_wait(&self) {
        let current = self.lock_running().take();
        if let Some(current) = current {
            current.shutdown.cancel();
            let _ = current.task.await;
        }
    }

    pub fn state(&self) -> MonitorState {
        match self.lock_running().as_ref() {
            Some(current) if !current.task.is_finished() => MonitorState::Running,
            _ => MonitorState::Stopped,
        }
    }

    /// Run one sweep now, probing only backends that are due
    pub async fn sweep(&self) -> usize {
        sweep(&self.pool, &self.config).await
    }

    /// Probe every backend now, ignoring the minimum interval
    pub async fn check_all(&self) -> usize {
        probe_many(&self.pool, (0..self.pool.len()).collect(), self.config.timeout).await
    }

    /// Get health statistics for all backends
    pub fn health_stats(&self) -> Vec<BackendHealthStats> {
        health_stats(&self.pool)
    }

    fn lock_running(&self) -> std::sync::MutexGuard<'_, Option<RunningMonitor>> {
        match self.running.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<C> Drop for HealthMonitor<C> {
    fn drop(&mut self) {
        let running = match self.running.get_mut() {
            Ok(running) => running.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(current) = running {
            current.shutdown.cancel();
        }
    }
}

/// Health statistics for a single backend
#[derive(Debug, Clone)]
pub struct BackendHealthStats {
    pub index: usize,
    pub endpoint: String,
    pub status: HealthStatus,
    pub last_check: Option<Duration>,
    pub consecutive_failures: u32,
    pub last_latency: Option<Duration>,
    pub last_error: Option<String>,
}

/// Get health statistics for all backends in pool order
pub fn health_stats<C>(pool: &BackendPool<C>) -> Vec<BackendHealthStats> {
    pool.iter()
        .enumerate()
        .map(|(index, backend)| BackendHealthStats {
            index,
            endpoint: backend.endpoint().to_string(),
            status: backend.status(),
            last_check: backend.time_since_last_check(),
            consecutive_failures: backend.consecutive_failures(),
            last_latency: backend.last_latency(),
            last_error: backend.last_error(),
        })
        .collect()
}

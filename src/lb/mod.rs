//! Failover and health-tracking engine
//!
//! # Components
//!
//! - [`Backend`]: one storage client plus its health state
//! - [`BackendPool`]: the ordered, fixed set of backends
//! - [`probe`] / [`HealthMonitor`]: bounded liveness probes and the background
//!   loop that runs them every heartbeat
//! - [`Selector`] / [`Fallback`]: candidate ordering for one request
//! - [`FailoverExecutor`]: runs one request across candidates under
//!   per-attempt and overall timeouts
//!
//! # Health states
//!
//! Every backend starts `Unknown`. A successful probe or request marks it
//! `Healthy`, a failed or timed-out one marks it `Unhealthy`. Status and the
//! last-checked timestamp are updated together under a lock owned by that
//! backend alone; there is no pool-wide lock.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use multiminio::lb::{BackendPool, FailoverExecutor, HealthCheckConfig, HealthMonitor};
//! use multiminio::s3::HttpProbe;
//! use multiminio::FailoverConfig;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = Arc::new(BackendPool::new([
//!     HttpProbe::new("http://minio-1:9000", false)?,
//!     HttpProbe::new("http://minio-2:9000", false)?,
//! ])?);
//!
//! let config = FailoverConfig::default();
//! let monitor = HealthMonitor::new(Arc::clone(&pool), HealthCheckConfig::from(&config));
//! monitor.start();
//!
//! let executor = FailoverExecutor::from_config(&config)?;
//! let routed = executor
//!     .execute(&pool, "probe", |client| async move {
//!         use multiminio::s3::HealthProbe;
//!         client.probe().await
//!     })
//!     .await?;
//! println!("served by {}", routed.endpoint);
//!
//! monitor.shutdown();
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod balancer;
pub mod executor;
pub mod health;

pub use backend::{Backend, BackendPool, HealthSnapshot, HealthStatus};
pub use balancer::{Algorithm, Fallback, Selector};
pub use executor::{AttemptCause, AttemptFailure, FailoverError, FailoverExecutor, Routed};
pub use health::{
    health_stats, probe, sweep, BackendHealthStats, HealthCheckConfig, HealthMonitor,
    MonitorState, ProbeFailure, ProbeOutcome,
};

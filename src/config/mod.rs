use crate::lb::Algorithm;
use crate::s3::DEFAULT_HEALTH_PATH;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Default total budget per logical request across all candidates
pub const DEFAULT_FALLBACK_TIMEOUT: Duration = Duration::from_secs(60);
/// Default bound on a single health probe
pub const DEFAULT_HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);
/// Default interval between health monitor sweeps
pub const DEFAULT_HEALTH_CHECK_HEARTBEAT: Duration = Duration::from_secs(300);
/// Default bound on a single candidate attempt
pub const DEFAULT_MAX_TRY_TIMEOUT: Duration = Duration::from_secs(60);
/// Default minimum time between two probes of the same backend
pub const DEFAULT_HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(10);
/// Upper bound accepted for any timeout (one year)
pub const MAX_TIMEOUT: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Construction-time configuration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("backend pool is empty")]
    EmptyPool,

    #[error("invalid {name}: {reason}")]
    InvalidTimeout { name: &'static str, reason: String },

    #[error("unknown load balancing strategy: {0}")]
    UnknownAlgorithm(String),

    #[error("load balancing strategy '{0}' is not supported, only 'fallback' is")]
    UnsupportedAlgorithm(Algorithm),
}

/// Timeouts and policy of the failover engine
#[derive(Debug, Clone, PartialEq)]
pub struct FailoverConfig {
    /// Total budget per logical request across all candidates
    pub fallback_timeout: Duration,
    /// Bound on a single health probe
    pub health_check_timeout: Duration,
    /// Interval between health monitor sweeps
    pub health_check_heartbeat: Duration,
    /// Bound on a single candidate attempt
    pub max_try_timeout: Duration,
    /// Minimum time between two probes of the same backend
    pub health_check_interval: Duration,
    /// Candidate ordering policy
    pub algorithm: Algorithm,
}

impl Default for FailoverConfig {
    fn default() -> Self {
        Self {
            fallback_timeout: DEFAULT_FALLBACK_TIMEOUT,
            health_check_timeout: DEFAULT_HEALTH_CHECK_TIMEOUT,
            health_check_heartbeat: DEFAULT_HEALTH_CHECK_HEARTBEAT,
            max_try_timeout: DEFAULT_MAX_TRY_TIMEOUT,
            health_check_interval: DEFAULT_HEALTH_CHECK_INTERVAL,
            algorithm: Algorithm::Fallback,
        }
    }
}

impl FailoverConfig {
    pub fn with_fallback_timeout(mut self, timeout: Duration) -> Self {
        self.fallback_timeout = timeout;
        self
    }

    pub fn with_max_try_timeout(mut self, timeout: Duration) -> Self {
        self.max_try_timeout = timeout;
        self
    }

    pub fn with_health_check_timeout(mut self, timeout: Duration) -> Self {
        self.health_check_timeout = timeout;
        self
    }

    pub fn with_health_check_interval(mut self, interval: Duration) -> Self {
        self.health_check_interval = interval;
        self
    }

    pub fn with_health_check_heartbeat(mut self, heartbeat: Duration) -> Self {
        self.health_check_heartbeat = heartbeat;
        self
    }

    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Check that every timeout lies in `(0, MAX_TIMEOUT]` and that health
    /// checking is paced consistently:
    ///
    /// - `health_check_heartbeat >= 2 * health_check_interval`
    /// - `health_check_interval >= 2 * health_check_timeout`
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let timeouts = [
            ("fallback_timeout", self.fallback_timeout),
            ("health_check_timeout", self.health_check_timeout),
            ("health_check_heartbeat", self.health_check_heartbeat),
            ("max_try_timeout", self.max_try_timeout),
            ("health_check_interval", self.health_check_interval),
        ];
        for (name, value) in timeouts {
            if value.is_zero() {
                return Err(ConfigError::InvalidTimeout {
                    name,
                    reason: "must be greater than zero".to_string(),
                });
            }
            if value > MAX_TIMEOUT {
                return Err(ConfigError::InvalidTimeout {
                    name,
                    reason: format!("{:?} exceeds the maximum of {:?}", value, MAX_TIMEOUT),
                });
            }
        }

        if !at_least_twice(self.health_check_heartbeat, self.health_check_interval) {
            return Err(ConfigError::InvalidTimeout {
                name: "health_check_heartbeat",
                reason: format!(
                    "{:?} is less than twice health_check_interval ({:?})",
                    self.health_check_heartbeat, self.health_check_interval
                ),
            });
        }
        if !at_least_twice(self.health_check_interval, self.health_check_timeout) {
            return Err(ConfigError::InvalidTimeout {
                name: "health_check_interval",
                reason: format!(
                    "{:?} is less than twice health_check_timeout ({:?})",
                    self.health_check_interval, self.health_check_timeout
                ),
            });
        }

        if self.algorithm != Algorithm::Fallback {
            return Err(ConfigError::UnsupportedAlgorithm(self.algorithm));
        }

        Ok(())
    }
}

fn at_least_twice(value: Duration, base: Duration) -> bool {
    base.checked_mul(2).is_some_and(|doubled| value >= doubled)
}

/// Named set of replicated endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// Endpoint URLs, in fallback order
    pub endpoints: Vec<String>,

    /// Liveness path probed on every endpoint
    #[serde(default = "default_health_path")]
    pub health_path: String,

    /// Skip TLS certificate verification for probes
    #[serde(default)]
    pub insecure: bool,
}

fn default_health_path() -> String {
    DEFAULT_HEALTH_PATH.to_string()
}

/// Load balancer settings as written in config files (seconds as floats)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadBalancerConfig {
    /// Load balancing strategy: fallback, round_robin, random
    #[serde(default = "default_strategy")]
    pub strategy: String,

    #[serde(default = "default_fallback_timeout")]
    pub fallback_timeout: f64,

    #[serde(default = "default_health_check_timeout")]
    pub health_check_timeout: f64,

    #[serde(default = "default_health_check_heartbeat")]
    pub health_check_heartbeat: f64,

    #[serde(default = "default_max_try_timeout")]
    pub max_try_timeout: f64,

    #[serde(default = "default_health_check_interval")]
    pub health_check_interval: f64,
}

fn default_strategy() -> String {
    "fallback".to_string()
}

fn default_fallback_timeout() -> f64 {
    DEFAULT_FALLBACK_TIMEOUT.as_secs_f64()
}

fn default_health_check_timeout() -> f64 {
    DEFAULT_HEALTH_CHECK_TIMEOUT.as_secs_f64()
}

fn default_health_check_heartbeat() -> f64 {
    DEFAULT_HEALTH_CHECK_HEARTBEAT.as_secs_f64()
}

fn default_max_try_timeout() -> f64 {
    DEFAULT_MAX_TRY_TIMEOUT.as_secs_f64()
}

fn default_health_check_interval() -> f64 {
    DEFAULT_HEALTH_CHECK_INTERVAL.as_secs_f64()
}

impl Default for LoadBalancerConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            fallback_timeout: default_fallback_timeout(),
            health_check_timeout: default_health_check_timeout(),
            health_check_heartbeat: default_health_check_heartbeat(),
            max_try_timeout: default_max_try_timeout(),
            health_check_interval: default_health_check_interval(),
        }
    }
}

fn secs(name: &'static str, value: f64) -> std::result::Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(value).map_err(|e| ConfigError::InvalidTimeout {
        name,
        reason: format!("{} ({})", value, e),
    })
}

impl LoadBalancerConfig {
    /// Convert to a validated [`FailoverConfig`]
    pub fn to_failover_config(&self) -> std::result::Result<FailoverConfig, ConfigError> {
        let config = FailoverConfig {
            fallback_timeout: secs("fallback_timeout", self.fallback_timeout)?,
            health_check_timeout: secs("health_check_timeout", self.health_check_timeout)?,
            health_check_heartbeat: secs("health_check_heartbeat", self.health_check_heartbeat)?,
            max_try_timeout: secs("max_try_timeout", self.max_try_timeout)?,
            health_check_interval: secs("health_check_interval", self.health_check_interval)?,
            algorithm: self.strategy.parse()?,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Named endpoint profiles
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,

    /// Load balancer settings
    #[serde(default)]
    pub load_balancer: LoadBalancerConfig,

    /// Profile used when none is requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_profile: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a profile by name, or the default profile if not specified
    pub fn get_profile(&self, name: Option<&str>) -> Option<&Profile> {
        if let Some(name) = name {
            self.profiles.get(name)
        } else if let Some(default) = &self.default_profile {
            self.profiles.get(default)
        } else {
            self.profiles.values().next()
        }
    }
}

/// Load configuration from a YAML file
pub fn load_from_yaml<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = std::fs::read_to_string(path.as_ref())
        .context(format!("Failed to read config file: {:?}", path.as_ref()))?;

    let config: Config =
        serde_yaml::from_str(&content).context("Failed to parse YAML configuration")?;

    Ok(config)
}

fn env_secs(var: &str, target: &mut f64) -> Result<()> {
    if let Ok(value) = std::env::var(var) {
        *target = value
            .trim()
            .parse()
            .with_context(|| format!("{} is not a number of seconds: {}", var, value))?;
    }
    Ok(())
}

/// Load configuration from environment variables
///
/// - MULTIMINIO_ENDPOINTS (comma-separated list of endpoints, required)
/// - MULTIMINIO_HEALTH_PATH (optional, defaults to /minio/health/live)
/// - MULTIMINIO_INSECURE (optional, "true" or "1")
/// - MULTIMINIO_STRATEGY (optional, defaults to fallback)
/// - MULTIMINIO_FALLBACK_TIMEOUT, MULTIMINIO_HEALTH_CHECK_TIMEOUT,
///   MULTIMINIO_HEALTH_CHECK_HEARTBEAT, MULTIMINIO_MAX_TRY_TIMEOUT,
///   MULTIMINIO_HEALTH_CHECK_INTERVAL (optional, seconds)
pub fn load_from_env() -> Result<Config> {
    // Try to load .env file if it exists (don't fail if it doesn't)
    let _ = dotenvy::dotenv();

    let endpoints_str = std::env::var("MULTIMINIO_ENDPOINTS")
        .context("MULTIMINIO_ENDPOINTS environment variable not set")?;

    let endpoints: Vec<String> = endpoints_str
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if endpoints.is_empty() {
        anyhow::bail!("MULTIMINIO_ENDPOINTS contains no valid endpoints");
    }

    let health_path =
        std::env::var("MULTIMINIO_HEALTH_PATH").unwrap_or_else(|_| default_health_path());
    let insecure = std::env::var("MULTIMINIO_INSECURE")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false);

    let mut config = Config::new();
    config.profiles.insert(
        "default".to_string(),
        Profile {
            endpoints,
            health_path,
            insecure,
        },
    );
    config.default_profile = Some("default".to_string());

    let lb = &mut config.load_balancer;
    if let Ok(strategy) = std::env::var("MULTIMINIO_STRATEGY") {
        lb.strategy = strategy;
    }
    env_secs("MULTIMINIO_FALLBACK_TIMEOUT", &mut lb.fallback_timeout)?;
    env_secs("MULTIMINIO_HEALTH_CHECK_TIMEOUT", &mut lb.health_check_timeout)?;
    env_secs("MULTIMINIO_HEALTH_CHECK_HEARTBEAT", &mut lb.health_check_heartbeat)?;
    env_secs("MULTIMINIO_MAX_TRY_TIMEOUT", &mut lb.max_try_timeout)?;
    env_secs("MULTIMINIO_HEALTH_CHECK_INTERVAL", &mut lb.health_check_interval)?;

    Ok(config)
}

/// Load configuration from file or environment
///
/// Reads the YAML file when `config_path` is given, otherwise falls back to
/// environment variables. A requested `profile_name` becomes the default
/// profile and must exist in the file.
pub fn load_config(config_path: Option<&str>, profile_name: Option<&str>) -> Result<Config> {
    if let Some(path) = config_path {
        let mut config = load_from_yaml(path)?;

        if let Some(name) = profile_name {
            if !config.profiles.contains_key(name) {
                anyhow::bail!("Profile '{}' not found in config file", name);
            }
            config.default_profile = Some(name.to_string());
        }

        Ok(config)
    } else {
        load_from_env()
    }
}

use super::backend::{HealthSnapshot, HealthStatus};
use crate::config::ConfigError;
use std::fmt;
use std::str::FromStr;

/// Load balancing algorithm selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    /// Try backends in pool order, healthy ones first
    Fallback,
    /// Rotate the starting backend per request (not implemented)
    RoundRobin,
    /// Random starting backend per request (not implemented)
    Random,
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Algorithm::Fallback => "fallback",
            Algorithm::RoundRobin => "round_robin",
            Algorithm::Random => "random",
        };
        f.write_str(name)
    }
}

impl FromStr for Algorithm {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fallback" => Ok(Algorithm::Fallback),
            "round_robin" | "roundrobin" => Ok(Algorithm::RoundRobin),
            "random" => Ok(Algorithm::Random),
            other => Err(ConfigError::UnknownAlgorithm(other.to_string())),
        }
    }
}

impl Algorithm {
    /// Build the candidate selector for this algorithm
    pub fn selector(self) -> Result<Box<dyn Selector>, ConfigError> {
        match self {
            Algorithm::Fallback => Ok(Box::new(Fallback)),
            other => Err(ConfigError::UnsupportedAlgorithm(other)),
        }
    }
}

/// Orders the backends to try for one logical request.
///
/// Receives a health snapshot in pool order and returns pool indices in the
/// order they should be attempted. Policies that rotate across calls keep that
/// state inside the selector; the executor only consumes the returned order.
pub trait Selector: Send + Sync {
    fn select_candidates(&self, health: &[HealthSnapshot]) -> Vec<usize>;
}

/// Healthy backends first, then unknown, then unhealthy; pool order within
/// each group. Every backend is returned so a recovered one can still serve.
#[derive(Debug, Clone, Copy, Default)]
pub struct Fallback;

impl Selector for Fallback {
    fn select_candidates(&self, health: &[HealthSnapshot]) -> Vec<usize> {
        let mut candidates = Vec::with_capacity(health.len());
        for wanted in [
            HealthStatus::Healthy,
            HealthStatus::Unknown,
            HealthStatus::Unhealthy,
        ] {
            candidates.extend(
                health
                    .iter()
                    .enumerate()
                    .filter(|(_, h)| h.status == wanted)
                    .map(|(idx, _)| idx),
            );
        }
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(statuses: &[HealthStatus]) -> Vec<HealthSnapshot> {
        statuses
            .iter()
            .map(|&status| HealthSnapshot {
                status,
                last_checked_at: None,
            })
            .collect()
    }

    #[test]
    fn test_unknown_keeps_pool_order() {
        let health = snapshot(&[HealthStatus::Unknown, HealthStatus::Unknown]);
        assert_eq!(Fallback.select_candidates(&health), vec![0, 1]);
    }

    #[test]
    fn test_healthy_first_unhealthy_last() {
        use HealthStatus::*;
        let health = snapshot(&[Unhealthy, Unknown, Healthy, Unhealthy, Healthy, Unknown]);
        assert_eq!(Fallback.select_candidates(&health), vec![2, 4, 1, 5, 0, 3]);
    }

    #[test]
    fn test_all_unhealthy_still_returned() {
        let health = snapshot(&[HealthStatus::Unhealthy; 3]);
        assert_eq!(Fallback.select_candidates(&health), vec![0, 1, 2]);
    }

    #[test]
    fn test_single_backend() {
        let health = snapshot(&[HealthStatus::Unhealthy]);
        assert_eq!(Fallback.select_candidates(&health), vec![0]);
    }

    #[test]
    fn test_algorithm_parse() {
        assert_eq!("fallback".parse::<Algorithm>(), Ok(Algorithm::Fallback));
        assert_eq!("ROUND_ROBIN".parse::<Algorithm>(), Ok(Algorithm::RoundRobin));
        assert_eq!("random".parse::<Algorithm>(), Ok(Algorithm::Random));
        assert_eq!(
            "weighted".parse::<Algorithm>(),
            Err(ConfigError::UnknownAlgorithm("weighted".to_string()))
        );
    }

    #[test]
    fn test_only_fallback_has_selector() {
        assert!(Algorithm::Fallback.selector().is_ok());
        assert!(matches!(
            Algorithm::Random.selector(),
            Err(ConfigError::UnsupportedAlgorithm(Algorithm::Random))
        ));
    }
}

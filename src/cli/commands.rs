use crate::config::{Config, FailoverConfig, Profile};
use crate::lb::{BackendHealthStats, BackendPool, HealthCheckConfig, HealthMonitor, HealthStatus};
use crate::s3::HttpProbe;
use anyhow::{Context, Result};
use std::fmt::Write as FmtWrite;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Resolve the profile and timeouts the commands run with
fn resolve<'a>(config: &'a Config, profile: Option<&str>) -> Result<(&'a Profile, FailoverConfig)> {
    let profile = config
        .get_profile(profile)
        .ok_or_else(|| anyhow::anyhow!("No profile found in configuration"))?;
    let failover = config
        .load_balancer
        .to_failover_config()
        .context("Invalid load balancer configuration")?;
    Ok((profile, failover))
}

fn build_monitor(
    profile: &Profile,
    failover: &FailoverConfig,
    insecure: bool,
) -> Result<HealthMonitor<HttpProbe>> {
    let probes = profile
        .endpoints
        .iter()
        .map(|endpoint| {
            HttpProbe::with_path(endpoint, &profile.health_path, insecure || profile.insecure)
                .with_context(|| format!("Invalid endpoint: {}", endpoint))
        })
        .collect::<Result<Vec<_>>>()?;

    let pool = Arc::new(BackendPool::new(probes)?);
    Ok(HealthMonitor::new(pool, HealthCheckConfig::from(failover)))
}

fn format_duration(d: Option<Duration>) -> String {
    match d {
        Some(d) if d < Duration::from_secs(1) => format!("{}ms", d.as_millis()),
        Some(d) => format!("{:.1}s", d.as_secs_f64()),
        None => "-".to_string(),
    }
}

/// Render health statistics as a plain-text table
pub fn render_health_table(stats: &[BackendHealthStats]) -> String {
    let width = stats
        .iter()
        .map(|s| s.endpoint.len())
        .max()
        .unwrap_or(0)
        .max("ENDPOINT".len());

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<3} {:<width$} {:<10} {:>8} {:>10} {:>8}  ERROR",
        "#", "ENDPOINT", "STATUS", "LATENCY", "CHECKED", "FAILURES"
    );
    for s in stats {
        let checked = s
            .last_check
            .map(|d| format!("{} ago", format_duration(Some(d))))
            .unwrap_or_else(|| "never".to_string());
        let _ = writeln!(
            out,
            "{:<3} {:<width$} {:<10} {:>8} {:>10} {:>8}  {}",
            s.index,
            s.endpoint,
            s.status.to_string(),
            format_duration(s.last_latency),
            checked,
            s.consecutive_failures,
            s.last_error.as_deref().unwrap_or("")
        );
    }
    out
}

/// Health command - probe every endpoint once
pub async fn cmd_health(config: &Config, profile: Option<&str>, insecure: bool) -> Result<()> {
    let (profile, failover) = resolve(config, profile)?;
    let monitor = build_monitor(profile, &failover, insecure)?;

    monitor.check_all().await;
    let stats = monitor.health_stats();
    print!("{}", render_health_table(&stats));

    let healthy = stats
        .iter()
        .filter(|s| s.status == HealthStatus::Healthy)
        .count();
    if healthy == 0 {
        anyhow::bail!("No healthy endpoints out of {}", stats.len());
    }
    info!(healthy, total = stats.len(), "health check complete");
    Ok(())
}

/// Watch command - run the health monitor until Ctrl-C
pub async fn cmd_watch(config: &Config, profile: Option<&str>, insecure: bool) -> Result<()> {
    let (profile, failover) = resolve(config, profile)?;
    let monitor = build_monitor(profile, &failover, insecure)?;
    let heartbeat = monitor.config().heartbeat;

    monitor.start();
    // Let the initial sweep finish before the first report
    tokio::time::sleep(monitor.config().timeout).await;

    loop {
        print!("{}", render_health_table(&monitor.health_stats()));
        println!();

        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result.context("Failed to listen for Ctrl-C")?;
                break;
            }
            _ = tokio::time::sleep(heartbeat) => {}
        }
    }

    monitor.shutdown_and_wait().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(endpoint: &str, status: HealthStatus) -> BackendHealthStats {
        BackendHealthStats {
            index: 0,
            endpoint: endpoint.to_string(),
            status,
            last_check: None,
            consecutive_failures: 0,
            last_latency: None,
            last_error: None,
        }
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(None), "-");
        assert_eq!(format_duration(Some(Duration::from_millis(42))), "42ms");
        assert_eq!(format_duration(Some(Duration::from_millis(2500))), "2.5s");
    }

    #[test]
    fn test_render_health_table() {
        let mut down = stats("http://minio-2:9000", HealthStatus::Unhealthy);
        down.index = 1;
        down.consecutive_failures = 3;
        down.last_error = Some("probe timed out after 5s".to_string());
        down.last_check = Some(Duration::from_secs(4));

        let table = render_health_table(&[stats("http://minio-1:9000", HealthStatus::Unknown), down]);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("#"));
        assert!(lines[1].contains("http://minio-1:9000"));
        assert!(lines[1].contains("unknown"));
        assert!(lines[1].contains("never"));
        assert!(lines[2].contains("unhealthy"));
        assert!(lines[2].contains("4.0s ago"));
        assert!(lines[2].ends_with("probe timed out after 5s"));
    }

    #[test]
    fn test_resolve_requires_profile() {
        let config = Config::new();
        assert!(resolve(&config, None).is_err());
    }

    #[test]
    fn test_build_monitor_uses_profile_path() {
        let profile = Profile {
            endpoints: vec!["http://minio-1:9000".to_string(), "minio-2:9000".to_string()],
            health_path: "/minio/health/ready".to_string(),
            insecure: false,
        };
        let monitor = build_monitor(&profile, &FailoverConfig::default(), false).unwrap();
        let stats = monitor.health_stats();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[1].endpoint, "http://minio-2:9000");
        assert!(stats.iter().all(|s| s.status == HealthStatus::Unknown));
    }
}

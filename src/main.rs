use anyhow::Result;
use clap::{Parser, Subcommand};
use multiminio::{cli, config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "multiminio")]
#[command(version, about = "Failover router and health monitor for replicated MinIO endpoints", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path (environment variables are used when omitted)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Profile to use from config
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Disable SSL certificate verification for health probes
    #[arg(long, global = true)]
    insecure: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe every endpoint once and print its health
    Health,

    /// Run the health monitor and print the pool's health every heartbeat
    Watch,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // One-shot probing is sequential I/O; only watch keeps running
    let runtime = match cli.command {
        Commands::Watch => tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?,
        Commands::Health => tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?,
    };

    runtime.block_on(async_main(cli))
}

async fn async_main(cli: Cli) -> Result<()> {
    let config = config::load_config(cli.config.as_deref(), cli.profile.as_deref())?;

    match cli.command {
        Commands::Health => {
            cli::cmd_health(&config, cli.profile.as_deref(), cli.insecure).await?;
        }
        Commands::Watch => {
            cli::cmd_watch(&config, cli.profile.as_deref(), cli.insecure).await?;
        }
    }

    Ok(())
}

//! warmpoold: the warm pool promotion reactor.
//!
//! Receives lifecycle notifications for instances leaving a warm pool and
//! tells the fleet manager to CONTINUE each launch, so promoted instances
//! join the group without waiting out the hook timeout.
//!
//! # Usage
//!
//! ```text
//! warmpoold serve --config warmpool.toml
//! warmpoold invoke --config warmpool.toml --event notification.json
//! warmpoold plan --config warmpool.toml --strict
//! warmpoold fleet-sim --listen 127.0.0.1:8481
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use warmpool_api::{ApiState, FleetSimState, build_router, fleet_sim_router};
use warmpool_core::config::DEFAULT_CREDENTIAL_ENV;
use warmpool_fleet::InMemoryFleet;
use warmpoold::{WarmPoolPlan, build_reactor, load_config, read_credential};

#[derive(Parser)]
#[command(name = "warmpoold", about = "Warm pool promotion reactor")]
struct Cli {
    /// Log output format.
    #[arg(long, global = true, value_enum, default_value = "text")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the notification endpoint.
    Serve {
        /// Path to warmpool.toml.
        #[arg(long, default_value = "warmpool.toml")]
        config: PathBuf,

        /// Override server.listen.
        #[arg(long)]
        listen: Option<SocketAddr>,
    },

    /// Run a single notification through the reactor and print the result.
    Invoke {
        #[arg(long, default_value = "warmpool.toml")]
        config: PathBuf,

        /// Notification JSON file, or `-` for stdin.
        #[arg(long)]
        event: PathBuf,
    },

    /// Print the resolved warm pool settings, event rule and policy.
    Plan {
        #[arg(long, default_value = "warmpool.toml")]
        config: PathBuf,

        /// Fail on an unrecognized pool state instead of using RUNNING.
        #[arg(long)]
        strict: bool,
    },

    /// Run an in-memory fleet manager for local testing.
    FleetSim {
        #[arg(long, default_value = "127.0.0.1:8481")]
        listen: SocketAddr,

        /// Environment variable holding the credential callers must present.
        #[arg(long, default_value = DEFAULT_CREDENTIAL_ENV)]
        credential_env: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        Command::Serve { config, listen } => run_serve(&config, listen).await,
        Command::Invoke { config, event } => run_invoke(&config, &event).await,
        Command::Plan { config, strict } => run_plan(&config, strict),
        Command::FleetSim {
            listen,
            credential_env,
        } => run_fleet_sim(listen, &credential_env).await,
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,warmpoold=debug,warmpool=debug"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn run_serve(config_path: &Path, listen: Option<SocketAddr>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let settings = config.reactor_settings()?;
    let reactor = build_reactor(&config)?;

    let router = build_router(ApiState {
        reactor: Arc::new(reactor),
        invocation_timeout: settings.invocation_timeout,
    });
    let addr = match listen {
        Some(addr) => addr,
        None => config.listen_addr()?,
    };

    info!(%addr, group = %config.pool.group_name, "reactor listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("warmpoold stopped");
    Ok(())
}

async fn run_invoke(config_path: &Path, event_path: &Path) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let settings = config.reactor_settings()?;
    let reactor = build_reactor(&config)?;

    let raw = if event_path == Path::new("-") {
        std::io::read_to_string(std::io::stdin())?
    } else {
        std::fs::read_to_string(event_path)
            .with_context(|| format!("failed to read {}", event_path.display()))?
    };
    let event: serde_json::Value =
        serde_json::from_str(&raw).context("notification is not valid JSON")?;

    let invocation = tokio::time::timeout(settings.invocation_timeout, reactor.handle_value(&event))
        .await
        .context("invocation deadline exceeded")?;
    println!("{}", serde_json::to_string_pretty(&invocation)?);

    if invocation.is_failed() {
        anyhow::bail!("invocation failed for instance {:?}", invocation.instance);
    }
    Ok(())
}

fn run_plan(config_path: &Path, strict: bool) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let plan = WarmPoolPlan::resolve(&config, strict)?;
    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}

async fn run_fleet_sim(addr: SocketAddr, credential_env: &str) -> anyhow::Result<()> {
    let router = fleet_sim_router(FleetSimState {
        fleet: InMemoryFleet::new(),
        credential: read_credential(credential_env),
    });

    info!(%addr, "fleet simulator listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

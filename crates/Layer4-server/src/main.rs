//! Parley - talk to any agent from your phone

use anyhow::Context;
use clap::Parser;
use parley_foundation::{ProviderKind, ServerConfig, WrappedCommand};
use parley_server::{build_router, AppState};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Parley - chat with hosted, remote and local agents over one stream protocol
#[derive(Parser, Debug)]
#[command(name = "parley")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to listen on (overrides PARLEY_BIND)
    #[arg(short, long)]
    bind: Option<String>,

    /// Default provider kind reported to clients
    #[arg(long)]
    provider: Option<String>,

    /// Answer every contact with this local command
    #[arg(long)]
    wrap: Option<String>,

    /// Arguments for the wrapped command, after `--`; `{prompt}` is substituted
    #[arg(last = true)]
    wrap_args: Vec<String>,

    /// Hosted model name
    #[arg(long)]
    model: Option<String>,

    /// API key for the hosted model (overrides OPENAI_API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    /// Base URL for the hosted model API
    #[arg(long)]
    base_url: Option<String>,

    /// Log push notifications instead of sending them
    #[arg(long)]
    no_push: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

impl Args {
    /// Apply command-line overrides on top of the environment
    fn apply(self, config: &mut ServerConfig) -> anyhow::Result<()> {
        if let Some(bind) = self.bind {
            config.bind_addr = bind;
        }
        if let Some(kind) = self.provider {
            config.default_kind = kind
                .parse::<ProviderKind>()
                .with_context(|| format!("--provider '{}'", kind))?;
        }
        if let Some(command) = self.wrap {
            config.wrapped = Some(WrappedCommand::new(command, self.wrap_args));
        }
        if let Some(model) = self.model {
            config.hosted.model = model;
        }
        if let Some(api_key) = self.api_key {
            config.hosted.api_key = Some(api_key);
        }
        if let Some(base_url) = self.base_url {
            config.hosted.base_url = base_url;
        }
        if self.no_push {
            config.push.enabled = false;
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let mut config = ServerConfig::from_env().context("Invalid environment configuration")?;
    args.apply(&mut config)?;

    match &config.wrapped {
        Some(command) => info!(
            "Wrapped mode: {} {:?} ({})",
            command.command,
            command.args,
            command.kind()
        ),
        None => info!("Default provider: {}", config.effective_default_kind()),
    }

    let app = build_router(AppState::from_config(&config));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!("Parley listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Parley stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

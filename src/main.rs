//! Fusion swap relayer - cross-chain swaps over a Fusion+ style intents network
//!
//! Quotes, places and settles swaps from the command line, or serves the
//! swap job API.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use fusion_swap_relayer::api::{self, AppState};
use fusion_swap_relayer::chain::ChainRegistry;
use fusion_swap_relayer::config::{Settings, WalletConfig};
use fusion_swap_relayer::fusion::{FusionApi, HttpFusionApi};
use fusion_swap_relayer::metrics::MetricsServer;
use fusion_swap_relayer::wallet::Credential;
use fusion_swap_relayer::{SwapClientFactory, SwapIntent, SwapOrchestrator, SwapResult};

const DEFAULT_KEY_ENV: &str = "FUSION_SWAP_PRIVATE_KEY";
const SHUTDOWN_MARGIN: Duration = Duration::from_secs(2);

#[derive(Parser, Debug)]
#[command(name = "fusion-swap")]
#[command(about = "Cross-chain swaps through a Fusion+ intents network")]
#[command(version)]
struct Cli {
    /// Configuration file
    #[arg(long, env = "FUSION_SWAP_CONFIG")]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a quote for a swap
    Quote(IntentArgs),

    /// Quote, place and settle a swap with the configured wallet
    Swap(IntentArgs),

    /// Print the live status of an order
    Status { order_hash: String },

    /// Run the HTTP API until interrupted
    Serve,
}

#[derive(Args, Debug)]
struct IntentArgs {
    source_chain: String,
    destination_chain: String,
    source_token: String,
    destination_token: String,
    /// Amount in base units of the source token
    amount: String,
    wallet_address: String,
}

impl From<IntentArgs> for SwapIntent {
    fn from(args: IntentArgs) -> Self {
        SwapIntent {
            source_chain: args.source_chain,
            destination_chain: args.destination_chain,
            source_token: args.source_token,
            destination_token: args.destination_token,
            amount: args.amount,
            wallet_address: args.wallet_address,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let settings = match &cli.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };

    // Initialize logging
    init_logging(cli.json || settings.logging.json);

    info!("Starting Fusion swap relayer v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Loaded configuration for {} chains",
        settings.enabled_chains().len()
    );

    let registry = Arc::new(ChainRegistry::from_settings(&settings)?);
    let fusion: Arc<dyn FusionApi> = Arc::new(HttpFusionApi::new(&settings.fusion)?);

    let shutdown = Arc::new(RwLock::new(false));
    let factory = SwapClientFactory::new(fusion, registry, settings.monitor.clone())
        .with_cancellation(shutdown.clone());
    let orchestrator = SwapOrchestrator::new(factory);

    match cli.command {
        Command::Quote(args) => {
            let quote = orchestrator.quote(&args.into()).await?;
            println!("{}", serde_json::to_string_pretty(&quote)?);
        }
        Command::Status { order_hash } => {
            let status = orchestrator.order_status(&order_hash).await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Command::Swap(args) => {
            let credential = load_credential(&settings.wallet)
                .context("a wallet credential is required to swap")?;

            // Ctrl+C stops monitoring but keeps the order hash in the outcome
            tokio::spawn({
                let shutdown = shutdown.clone();
                async move {
                    shutdown_signal().await;
                    warn!("Shutdown signal received, abandoning monitoring");
                    *shutdown.write().await = true;
                }
            });

            let outcome = orchestrator.execute(&args.into(), Some(credential)).await;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            if !outcome.success {
                std::process::exit(1);
            }
        }
        Command::Serve => serve(settings, orchestrator, shutdown).await?,
    }

    Ok(())
}

async fn serve(
    settings: Settings,
    orchestrator: SwapOrchestrator,
    shutdown: Arc<RwLock<bool>>,
) -> Result<()> {
    let credential = match load_credential(&settings.wallet) {
        Ok(credential) => {
            info!("Swap jobs will sign as {:?}", credential.address());
            Some(credential)
        }
        Err(e) => {
            warn!("{}; POST /swaps is disabled", e);
            None
        }
    };

    // Start metrics server
    let metrics_handle = if settings.metrics.enabled {
        let server = MetricsServer::new(settings.metrics.port);
        info!("Metrics: http://0.0.0.0:{}/metrics", settings.metrics.port);
        Some(tokio::spawn(async move {
            if let Err(e) = server.run().await {
                error!("Metrics server error: {}", e);
            }
        }))
    } else {
        None
    };

    info!("API server: http://{}:{}", settings.api.host, settings.api.port);

    let state = AppState::new(orchestrator, credential)
        .with_job_retention(settings.api.job_retention());
    let result = api::run_server(settings.api.clone(), state.clone(), shutdown_signal()).await;

    info!("Shutdown signal received, stopping...");

    // Running jobs stop monitoring at their next poll, which may sit behind
    // one poll interval and one in-flight request
    *shutdown.write().await = true;
    let grace = settings.monitor.poll_interval()
        + Duration::from_secs(settings.fusion.request_timeout_secs)
        + SHUTDOWN_MARGIN;
    let abandoned = state.drain_jobs(grace).await;
    if abandoned > 0 {
        warn!("{} swap job(s) aborted at shutdown", abandoned);
    }

    if let Some(handle) = metrics_handle {
        handle.abort();
    }

    result?;
    info!("Fusion swap relayer stopped");
    Ok(())
}

fn load_credential(wallet: &WalletConfig) -> SwapResult<Credential> {
    let var = wallet.private_key_env.as_deref().unwrap_or(DEFAULT_KEY_ENV);
    Credential::from_env(var)
}

fn init_logging(json: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,fusion_swap_relayer=debug,hyper=warn"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

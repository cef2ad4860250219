//! Faucet service binary

use anyhow::Context;
use clap::Parser;
use spigot_faucet::{api, ChainRpcClient, FaucetConfig, FaucetService, ThrottleStore};
use spigot_wallet::UserWallet;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Faucet service CLI
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Listen host
    #[arg(long)]
    host: Option<String>,

    /// Listen port
    #[arg(long)]
    port: Option<u16>,

    /// Throttle database path
    #[arg(long)]
    db_path: Option<String>,

    /// Ledger node RPC URL
    #[arg(long)]
    rpc_url: Option<String>,

    /// Static asset directory
    #[arg(long)]
    static_dir: Option<String>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let env_filter = if args.debug {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::from_default_env()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting spigot faucet v0.1.0");

    // Load configuration; missing wallet credentials abort startup.
    let mut config = FaucetConfig::from_env()?;

    // Override with CLI arguments
    if let Some(host) = args.host {
        config.listen_host = host;
    }

    if let Some(port) = args.port {
        config.listen_port = port;
    }

    if let Some(db_path) = args.db_path {
        config.db_path = db_path;
    }

    if let Some(rpc_url) = args.rpc_url {
        config.rpc_url = rpc_url;
    }

    if let Some(static_dir) = args.static_dir {
        config.static_dir = static_dir;
    }

    info!("Configuration:");
    info!("  Listen address: {}", config.listen_addr());
    info!("  RPC URL: {}", config.rpc_url);
    info!(
        "  Disbursement: {} share / {} coin",
        config.share_amount, config.coin_amount
    );
    info!("  Client quota: {} attempts / day", config.max_attempts_per_day);

    // Throttle database
    let store = ThrottleStore::open(&config.db_path)?;
    info!("Throttle database initialized at: {}", config.db_path);

    // Wallet
    let wallet = Arc::new(
        UserWallet::open(&config.wallet_path, &config.wallet_password)
            .context("opening the faucet wallet")?,
    );
    info!("Faucet address: {}", wallet.address());

    // Ledger node client, shared as relay gateway and chain view
    let rpc = Arc::new(ChainRpcClient::new(config.rpc_url.clone(), config.rpc_timeout())?);

    let service = Arc::new(FaucetService::new(
        config.clone(),
        store,
        wallet,
        rpc.clone(),
        rpc,
    ));
    info!("Faucet service initialized");

    // Wallet block-ingestion loop
    let ingester = service.clone();
    let ingest_interval = config.ingest_interval();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(ingest_interval);
        loop {
            interval.tick().await;
            if let Err(e) = ingester.ingest_blocks().await {
                warn!("block ingestion failed: {}", e);
            }
        }
    });

    // Throttle-store persistence loop
    let persister = service.clone();
    let persist_interval = config.persist_interval();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(persist_interval);
        loop {
            interval.tick().await;
            if let Err(e) = persister.persist().await {
                warn!("throttle persistence failed: {}", e);
            }
        }
    });

    // Start server
    let app = api::router(service, &config.static_dir);
    let listener = tokio::net::TcpListener::bind(config.listen_addr()).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Shutting down gracefully");
    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }
}

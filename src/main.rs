//! Cross-chain relayer
//!
//! Relays one validated swap request to its destination chain and prints
//! the submission result as JSON. EVM requests print the assembled bridge
//! contract call instead, for the external EVM signer.

use anyhow::{bail, Context, Result};
use clap::Parser;
use crosschain_relayer::config::Config;
use crosschain_relayer::endpoints;
use crosschain_relayer::evm::EvmCallBuilder;
use crosschain_relayer::near::{NearJsonRpcClient, NearRelay};
use crosschain_relayer::persistence::{HttpTradeParamsStore, InMemoryTradeParamsStore, TradeParamsStore};
use crosschain_relayer::pricing::{AggregatorClient, JsonHttpClient, PriceOracle};
use crosschain_relayer::relayer::Relayer;
use crosschain_relayer::solana::{HttpPoolSource, SolanaRelay, SolanaRpcClient};
use crosschain_relayer::types::{ChainFamily, SwapRequest};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Path to the swap request JSON
    #[arg(short, long)]
    request: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Metrics port
    #[arg(long, default_value = "9090")]
    metrics_port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose)?;

    info!("🚀 Starting cross-chain relayer");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    info!("📋 Loading configuration from: {}", args.config);
    let config = load_config(&args.config)?;

    if config.monitoring.enable_metrics {
        info!("📊 Starting metrics server on port {}", args.metrics_port);
        let metrics_port = args.metrics_port;
        tokio::spawn(async move {
            if let Err(e) = endpoints::endpoint_server(metrics_port).await {
                error!("Metrics server error: {}", e);
            }
        });
    }

    let request = load_request(&args.request)?;
    info!(
        "📥 Request {} -> {} ({} tokens in path)",
        request.short_hash(),
        request.destination_chain,
        request.token_path.len()
    );

    let http = JsonHttpClient::new(Duration::from_secs(config.pricing.request_timeout_secs))?;

    if let Some(receive_token) = request.receive_token() {
        let oracle = PriceOracle::new(http.clone(), config.pricing.clone());
        let price = oracle
            .fiat_usd_price(receive_token, &request.destination_network)
            .await;
        info!("💵 Receive token USD price: {}", price);
    }

    if request.destination_chain == ChainFamily::Evm {
        let builder = EvmCallBuilder::new(AggregatorClient::new(http, config.pricing.clone()));
        let call = builder.build(&request).await.context("Failed to assemble EVM call")?;
        println!("{}", serde_json::to_string_pretty(&call)?);
        return Ok(());
    }

    let relayer = build_relayer(&config, http)?;
    let result = relayer.relay(&request).await.context("Relay failed")?;

    info!("✅ Relay confirmed: {}", result.transaction_hash);
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}

/// Initialize logging subsystem
fn init_logging(verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        "crosschain_relayer=debug,relayer=debug,info"
    } else {
        "crosschain_relayer=info,relayer=info,warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    Ok(())
}

/// Load configuration from file with fallback to defaults
fn load_config(path: &str) -> Result<Config> {
    if std::path::Path::new(path).exists() {
        Config::from_file_with_env(path)
            .with_context(|| format!("Failed to load config from {}", path))
    } else {
        warn!("Config file '{}' not found, using defaults", path);
        Ok(Config::default())
    }
}

fn load_request(path: &str) -> Result<SwapRequest> {
    let body = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read request from {}", path))?;
    serde_json::from_str(&body).with_context(|| format!("Malformed request in {}", path))
}

fn build_relayer(config: &Config, http: JsonHttpClient) -> Result<Relayer> {
    let Some(solana_endpoint) = config.solana.rpc_endpoints.first() else {
        bail!("No Solana RPC endpoint configured");
    };
    let Some(near_endpoint) = config.near.rpc_endpoints.first() else {
        bail!("No NEAR RPC endpoint configured");
    };
    info!("🌐 Solana RPC: {}", solana_endpoint);
    info!("🌐 NEAR RPC: {}", near_endpoint);

    let trade_params: Arc<dyn TradeParamsStore> = match &config.relay.trade_params_url {
        Some(url) => Arc::new(HttpTradeParamsStore::new(http.clone(), url.clone())),
        None => {
            warn!("No trade-params API configured, default sentinels cannot be resolved");
            Arc::new(InMemoryTradeParamsStore::new())
        }
    };

    let solana = SolanaRelay::new(
        config,
        Arc::new(SolanaRpcClient::new(solana_endpoint.clone())),
        Arc::new(HttpPoolSource::new(http, config.solana.pool_api_url.clone())),
    )?;

    let near_rpc = NearJsonRpcClient::new(
        near_endpoint.clone(),
        Duration::from_secs(config.pricing.request_timeout_secs),
    )?;
    let near = NearRelay::new(&config.near, &config.relay, Arc::new(near_rpc), trade_params);

    Ok(Relayer::builder(config.relay.restart.clone())
        .with_chain(Arc::new(solana))
        .with_chain(Arc::new(near))
        .build())
}

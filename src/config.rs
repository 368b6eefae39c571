//! Configuration module for the cross-chain relayer
//!
//! This module handles configuration loading from TOML files and
//! environment variables. Program ids, pool tables and sentinel addresses
//! live here rather than in code so a chain can be re-pointed without a
//! rebuild; the loaded `Config` is immutable and shared read-only.

use crate::retry::RetryConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Solana destination settings
    #[serde(default)]
    pub solana: SolanaConfig,

    /// NEAR destination settings
    #[serde(default)]
    pub near: NearConfig,

    /// Price index and DEX aggregator settings
    #[serde(default)]
    pub pricing: PricingConfig,

    /// Retry policies, key material and collaborator endpoints
    #[serde(default)]
    pub relay: RelayConfig,

    /// Monitoring and metrics
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolanaConfig {
    /// RPC endpoints, the first one is used for submission
    #[serde(default = "default_solana_rpc")]
    pub rpc_endpoints: Vec<String>,

    /// Bridge program receiving the relay instruction
    #[serde(default = "default_program_id")]
    pub program_id: String,

    /// First seed of every bridge PDA
    #[serde(default = "default_seed_prefix")]
    pub seed_prefix: String,

    /// Version baked into the config PDA seeds
    #[serde(default)]
    pub config_version: u64,

    /// Receive-token sentinel meaning "deliver native SOL"
    #[serde(default = "default_native_token")]
    pub native_token_address: String,

    /// Receive-token sentinel meaning "plain SPL transfer of the bridge token"
    #[serde(default = "default_transfer_token")]
    pub transfer_token_address: String,

    /// Wrapped SOL mint
    #[serde(default = "default_wrapped_token")]
    pub wrapped_token_address: String,

    /// Bridge PDA holding wrapped SOL during native payouts
    #[serde(default = "default_wrapped_pda")]
    pub wrapped_pda: String,

    /// Raydium AMM authority
    #[serde(default = "default_amm_authority")]
    pub amm_authority: String,

    /// Raydium liquidity pool program (v4)
    #[serde(default = "default_liquidity_pool_program")]
    pub liquidity_pool_program_id: String,

    /// Serum DEX program (v3)
    #[serde(default = "default_serum_program")]
    pub serum_program_id: String,

    /// Bridge pool PDA
    #[serde(default = "default_pool_pda")]
    pub pool_pda: String,

    /// Bridge pool token vault
    #[serde(default = "default_pool_vault")]
    pub pool_vault: String,

    /// Pool listing API returning raw AMM account blobs
    #[serde(default = "default_pool_api_url")]
    pub pool_api_url: String,

    /// Serum order book accounts keyed by AMM id
    #[serde(default = "default_serum_markets")]
    pub serum_markets: HashMap<String, SerumMarket>,

    /// Sleep between confirmation checks
    #[serde(default = "default_confirm_poll_interval")]
    pub confirm_poll_interval_secs: u64,

    /// Checks before a sent transaction counts as unconfirmed
    #[serde(default = "default_confirm_max_polls")]
    pub confirm_max_polls: u32,

    /// Sleep between visibility checks of a freshly created token account
    #[serde(default = "default_token_account_poll_interval")]
    pub token_account_poll_interval_secs: u64,

    /// Visibility checks of a freshly created token account
    #[serde(default = "default_token_account_max_polls")]
    pub token_account_max_polls: u32,
}

/// Serum market accounts used by the AMM swap route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerumMarket {
    pub serum_market: String,
    pub serum_bids: String,
    pub serum_asks: String,
    pub serum_event_queue: String,
    pub serum_coin_vault_account: String,
    pub serum_pc_vault_account: String,
    pub serum_vault_signer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NearConfig {
    /// RPC endpoints, the first one is used
    #[serde(default = "default_near_rpc")]
    pub rpc_endpoints: Vec<String>,

    /// Account signing relay calls
    #[serde(default = "default_near_relayer_account")]
    pub relayer_account_id: String,

    /// `ed25519:<base58>` secret key of the relayer account
    #[serde(default)]
    pub private_key: Option<String>,

    /// Bridge contract exposing `swap_tokens_to_user_with_fee`
    #[serde(default = "default_near_multichain_contract")]
    pub multichain_contract: String,

    /// Ref Finance router contract
    #[serde(default = "default_ref_finance_contract")]
    pub ref_finance_contract: String,

    /// Pools fetched per `get_pools` call
    #[serde(default = "default_pool_page_size")]
    pub pool_page_size: u64,

    /// Gas attached to function calls
    #[serde(default = "default_function_call_gas")]
    pub function_call_gas: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Primary price index, `{network}` and `{token_address}` placeholders
    #[serde(default = "default_price_index_url")]
    pub price_index_url: String,

    /// Network name -> price index platform id
    #[serde(default = "default_price_index_networks")]
    pub price_index_networks: HashMap<String, String>,

    /// Fallback token-data service, `{network}` and `{token_address}` placeholders
    #[serde(default = "default_backend_token_url")]
    pub backend_token_url: String,

    /// DEX aggregator, `{network_id}` and `{endpoint_type}` placeholders
    #[serde(default = "default_aggregator_url")]
    pub aggregator_url: String,

    /// Network name -> aggregator chain id
    #[serde(default = "default_aggregator_networks")]
    pub aggregator_networks: HashMap<String, u64>,

    /// Extra swap-quote requests after an empty answer
    #[serde(default = "default_quote_retry_attempts")]
    pub quote_retry_attempts: usize,

    /// Fixed spacing between swap-quote retries
    #[serde(default = "default_quote_retry_spacing")]
    pub quote_retry_spacing_secs: u64,

    /// Slippage (percent) at or above which a quote is refused
    #[serde(default = "default_max_slippage")]
    pub max_slippage_percent: u32,

    /// HTTP request timeout
    #[serde(default = "default_http_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// JSON secret file holding `SOLANA_RELAYER_PRIVATE_KEY`
    #[serde(default = "default_secret_file")]
    pub secret_file: String,

    /// Whole-pipeline restarts after connection failures
    #[serde(default = "default_restart_policy")]
    pub restart: RetryConfig,

    /// Resubmissions of the same signed payload after unconfirmed results
    #[serde(default = "default_resubmit_policy")]
    pub resubmit: RetryConfig,

    /// Sentinel wallet/token meaning "use the recorded trade parameters"
    #[serde(default = "default_crypto_address")]
    pub default_crypto_address: String,

    /// Second accepted spelling of the sentinel
    #[serde(default = "default_alternative_crypto_address")]
    pub alternative_default_crypto_address: String,

    /// Trade-params API, `{network}` and `{from_tx_hash}` placeholders
    #[serde(default)]
    pub trade_params_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    /// Enable Prometheus metrics
    #[serde(default = "default_true")]
    pub enable_metrics: bool,

    /// Metrics port
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

// Default value functions
fn default_solana_rpc() -> Vec<String> { vec!["https://api.mainnet-beta.solana.com".to_string()] }
fn default_program_id() -> String { "r2TGRLHRtQ2Uj1CR7TCBYKgRxJi5M8FRjcqZnyQzYDB".to_string() }
fn default_seed_prefix() -> String { "rubic".to_string() }
fn default_native_token() -> String { "11111111111111111111111111111111".to_string() }
fn default_transfer_token() -> String { "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v".to_string() }
fn default_wrapped_token() -> String { "So11111111111111111111111111111111111111112".to_string() }
fn default_wrapped_pda() -> String { "6jVSCbM1MVZWCSepdBXY65U4uszY7rY6Lm3oEU5ZeE7q".to_string() }
fn default_amm_authority() -> String { "5Q544fKrFoe6tsEbD7S8EmxGTJYAKtTVhAW5Q5pge4j1".to_string() }
fn default_liquidity_pool_program() -> String { "675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8".to_string() }
fn default_serum_program() -> String { "9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin".to_string() }
fn default_pool_pda() -> String { "6rvuMQ7B3cwpmPHhbMGQFBsfDfkgnxiwmWxxSnkd9FjK".to_string() }
fn default_pool_vault() -> String { "DrmQS74dx5yDPzAJdGpVMqpSkVP9RXFQnMQAdeo1P7mj".to_string() }
fn default_pool_api_url() -> String { "http://localhost:8081/raydium/pools".to_string() }
fn default_confirm_poll_interval() -> u64 { 10 }
fn default_confirm_max_polls() -> u32 { 6 }
fn default_token_account_poll_interval() -> u64 { 5 }
fn default_token_account_max_polls() -> u32 { 6 }
fn default_near_rpc() -> Vec<String> {
    vec![
        "https://rpc.mainnet.near.org".to_string(),
        "https://archival-rpc.mainnet.near.org".to_string(),
    ]
}
fn default_near_relayer_account() -> String { "relayer.rubic-finance.near".to_string() }
fn default_near_multichain_contract() -> String { "multichain.rubic-finance.near".to_string() }
fn default_ref_finance_contract() -> String { "v2.ref-finance.near".to_string() }
fn default_pool_page_size() -> u64 { 100 }
fn default_function_call_gas() -> u64 { 100_000_000_000_000 }
fn default_price_index_url() -> String {
    "https://api.coingecko.com/api/v3/coins/{network}/contract/{token_address}".to_string()
}
fn default_backend_token_url() -> String {
    "https://api.rubic.exchange/api/v1/tokens/?network={network}&address={token_address}".to_string()
}
fn default_aggregator_url() -> String { "https://api.1inch.io/v4.0/{network_id}/{endpoint_type}".to_string() }
fn default_quote_retry_attempts() -> usize { 30 }
fn default_quote_retry_spacing() -> u64 { 3 }
fn default_max_slippage() -> u32 { 50 }
fn default_http_timeout() -> u64 { 30 }
fn default_secret_file() -> String { "secrets.json".to_string() }
fn default_crypto_address() -> String { "0x0000000000000000000000000000000000000000".to_string() }
fn default_alternative_crypto_address() -> String { "0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE".to_string() }
fn default_metrics_port() -> u16 { 9090 }
fn default_true() -> bool { true }

fn default_restart_policy() -> RetryConfig {
    RetryConfig {
        max_attempts: 5,
        base_backoff_ms: 1_000,
        max_backoff_ms: 30_000,
        jitter_factor: 0.2,
    }
}

fn default_resubmit_policy() -> RetryConfig {
    RetryConfig {
        max_attempts: 10,
        base_backoff_ms: 500,
        max_backoff_ms: 20_000,
        jitter_factor: 0.2,
    }
}

fn default_price_index_networks() -> HashMap<String, String> {
    [
        ("ethereum", "ethereum"),
        ("binance-smart-chain", "binance-smart-chain"),
        ("polygon", "polygon-pos"),
        ("avalanche", "avalanche"),
        ("fantom", "fantom"),
        ("solana", "solana"),
        ("near", "near-protocol"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn default_aggregator_networks() -> HashMap<String, u64> {
    [
        ("ethereum", 1),
        ("binance-smart-chain", 56),
        ("polygon", 137),
        ("avalanche", 43114),
        ("fantom", 250),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

fn default_serum_markets() -> HashMap<String, SerumMarket> {
    let mut markets = HashMap::new();
    // SOL-USDC
    markets.insert(
        "58oQChx4yWmvKdwLLZzBi4ChoCc2fqCUWBkwMihLYQo2".to_string(),
        SerumMarket {
            serum_market: "9wFFyRfZBsuAha4YcuxcXLKwMxJR43S7fPfQLusDBzvT".to_string(),
            serum_bids: "14ivtgssEBoBjuZJtSAPKYgpUK7DmnSwuPMqJoVTSgKJ".to_string(),
            serum_asks: "CEQdAFKdycHugujQg9k2wbmxjcpdYZyVLfV9WerTnafJ".to_string(),
            serum_event_queue: "5KKsLVU6TcbVDK4BS6K1DGDxnh4Q9xjYJ8XaDCG5t8ht".to_string(),
            serum_coin_vault_account: "36c6YqAwyGKQG66XEp2dJc5JqjaBNv7sVghEtJv4c7u6".to_string(),
            serum_pc_vault_account: "8CFo8bL8mZQK8abbFyypFMwEDd8tVJjHTTojMLgQTUSZ".to_string(),
            serum_vault_signer: "F8Vyqk3unwxkXukZFQeYyGmFfTG3CAX4v24iyrjEYBJV".to_string(),
        },
    );
    // RAY-USDC
    markets.insert(
        "6UmmUiYoBjSrhakAobJw8BvkmJtDVxaeBtbt7rxWo1mg".to_string(),
        SerumMarket {
            serum_market: "2xiv8A5xrJ7RnGdxXB42uFEkYHJjszEhaJyKKt4WaLep".to_string(),
            serum_bids: "Hf84mYadE1VqSvVWAvCWc9wqLXak4RwXiPb4A91EAUn5".to_string(),
            serum_asks: "DC1HsWWRCXVg3wk2NndS5LTbce3axwUwUZH1RgnV4oDN".to_string(),
            serum_event_queue: "H9dZt8kvz1Fe5FyRisb77KcYTaN8LEbuVAfJSnAaEABz".to_string(),
            serum_coin_vault_account: "GGcdamvNDYFhAXr93DWyJ8QmwawUHLCyRqWL3KngtLRa".to_string(),
            serum_pc_vault_account: "22jHt5WmosAykp3LPGSAKgY45p7VGh4DFWSwp21SWBVe".to_string(),
            serum_vault_signer: "FmhXe9uG6zun49p222xt3nG1rBAkWvzVz7dxERQ6ouGw".to_string(),
        },
    );
    markets
}

impl Default for SolanaConfig {
    fn default() -> Self {
        Self {
            rpc_endpoints: default_solana_rpc(),
            program_id: default_program_id(),
            seed_prefix: default_seed_prefix(),
            config_version: 0,
            native_token_address: default_native_token(),
            transfer_token_address: default_transfer_token(),
            wrapped_token_address: default_wrapped_token(),
            wrapped_pda: default_wrapped_pda(),
            amm_authority: default_amm_authority(),
            liquidity_pool_program_id: default_liquidity_pool_program(),
            serum_program_id: default_serum_program(),
            pool_pda: default_pool_pda(),
            pool_vault: default_pool_vault(),
            pool_api_url: default_pool_api_url(),
            serum_markets: default_serum_markets(),
            confirm_poll_interval_secs: default_confirm_poll_interval(),
            confirm_max_polls: default_confirm_max_polls(),
            token_account_poll_interval_secs: default_token_account_poll_interval(),
            token_account_max_polls: default_token_account_max_polls(),
        }
    }
}

impl Default for NearConfig {
    fn default() -> Self {
        Self {
            rpc_endpoints: default_near_rpc(),
            relayer_account_id: default_near_relayer_account(),
            private_key: None,
            multichain_contract: default_near_multichain_contract(),
            ref_finance_contract: default_ref_finance_contract(),
            pool_page_size: default_pool_page_size(),
            function_call_gas: default_function_call_gas(),
        }
    }
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            price_index_url: default_price_index_url(),
            price_index_networks: default_price_index_networks(),
            backend_token_url: default_backend_token_url(),
            aggregator_url: default_aggregator_url(),
            aggregator_networks: default_aggregator_networks(),
            quote_retry_attempts: default_quote_retry_attempts(),
            quote_retry_spacing_secs: default_quote_retry_spacing(),
            max_slippage_percent: default_max_slippage(),
            request_timeout_secs: default_http_timeout(),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            secret_file: default_secret_file(),
            restart: default_restart_policy(),
            resubmit: default_resubmit_policy(),
            default_crypto_address: default_crypto_address(),
            alternative_default_crypto_address: default_alternative_crypto_address(),
            trade_params_url: None,
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enable_metrics: default_true(),
            metrics_port: default_metrics_port(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            solana: SolanaConfig::default(),
            near: NearConfig::default(),
            pricing: PricingConfig::default(),
            relay: RelayConfig::default(),
            monitoring: MonitoringConfig::default(),
        }
    }
}

impl SolanaConfig {
    pub fn confirm_poll_interval(&self) -> Duration {
        Duration::from_secs(self.confirm_poll_interval_secs)
    }

    pub fn token_account_poll_interval(&self) -> Duration {
        Duration::from_secs(self.token_account_poll_interval_secs)
    }
}

impl PricingConfig {
    pub fn quote_retry_spacing(&self) -> Duration {
        Duration::from_secs(self.quote_retry_spacing_secs)
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides
    ///
    /// `NEAR_PRIVATE_KEY` and `RELAYER_SECRET_FILE` take precedence over the
    /// file so secrets can stay out of it.
    pub fn from_file_with_env(path: &str) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("NEAR_PRIVATE_KEY") {
            self.near.private_key = Some(key);
        }
        if let Ok(path) = std::env::var("RELAYER_SECRET_FILE") {
            self.relay.secret_file = path;
        }
    }
}

//! Pricing oracle against mock HTTP services: price index with backend
//! fallback, aggregator slippage gate, swap-data retries and EVM call
//! assembly on top of them.

use crosschain_relayer::config::PricingConfig;
use crosschain_relayer::evm::{EvmCallBuilder, EvmMethod};
use crosschain_relayer::pricing::{AggregatorClient, JsonHttpClient, PriceOracle, QuoteRequest};
use crosschain_relayer::types::{ChainFamily, SwapRequest};
use crosschain_relayer::RelayError;
use mockito::Matcher;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::time::Duration;

const TX_HASH: &str = "0x5308c3aad15b60452bf14b06509c3d1b45bfc1f39ce0628f655a6f9e34f15d04";

fn pricing_config(base: &str) -> PricingConfig {
    PricingConfig {
        price_index_url: format!("{}/coins/{{network}}/contract/{{token_address}}", base),
        backend_token_url: format!("{}/tokens/?network={{network}}&address={{token_address}}", base),
        aggregator_url: format!("{}/{{network_id}}/{{endpoint_type}}", base),
        quote_retry_attempts: 2,
        quote_retry_spacing_secs: 0,
        ..PricingConfig::default()
    }
}

fn http() -> JsonHttpClient {
    JsonHttpClient::new(Duration::from_secs(5)).unwrap()
}

fn quote(amount_out_min: u128) -> QuoteRequest<'static> {
    QuoteRequest {
        network: "ethereum",
        from_token: "0xdac17f958d2ee523a2206206994597c13d831ec7",
        to_token: "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48",
        amount_in: 1_000_000,
        amount_out_min,
        original_tx_hash: TX_HASH,
    }
}

#[tokio::test]
async fn test_price_index_is_queried_with_lowercase_token() {
    let mut server = mockito::Server::new_async().await;
    let index = server
        .mock("GET", "/coins/ethereum/contract/0xabcdef")
        .with_status(200)
        .with_body(r#"{"market_data": {"current_price": {"usd": 1.0021}}}"#)
        .create_async()
        .await;

    let oracle = PriceOracle::new(http(), pricing_config(&server.url()));
    let price = oracle.token_usd_price("0xABCDEF", "ethereum").await;

    assert_eq!(price, Decimal::from_str("1.0021").unwrap());
    index.assert_async().await;
}

#[tokio::test]
async fn test_reported_price_is_rounded_to_cents() {
    let mut server = mockito::Server::new_async().await;
    let _index = server
        .mock("GET", "/coins/ethereum/contract/0xabcdef")
        .with_status(200)
        .with_body(r#"{"market_data": {"current_price": {"usd": 1.005}}}"#)
        .create_async()
        .await;

    let oracle = PriceOracle::new(http(), pricing_config(&server.url()));
    let price = oracle.fiat_usd_price("0xabcdef", "ethereum").await;

    assert_eq!(price.to_string(), "1.01");
}

#[tokio::test]
async fn test_backend_fallback_when_index_misses() {
    let mut server = mockito::Server::new_async().await;
    let _index = server
        .mock("GET", Matcher::Regex(r"^/coins/.*".to_string()))
        .with_status(404)
        .create_async()
        .await;
    let backend = server
        .mock("GET", "/tokens/")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("network".into(), "polygon".into()),
            Matcher::UrlEncoded("address".into(), "0xToken".into()),
        ]))
        .with_status(200)
        .with_body(r#"[{"usd_price": 0.98}]"#)
        .create_async()
        .await;

    let oracle = PriceOracle::new(http(), pricing_config(&server.url()));
    let price = oracle.token_usd_price("0xToken", "polygon").await;

    assert_eq!(price, Decimal::from_str("0.98").unwrap());
    backend.assert_async().await;
}

#[tokio::test]
async fn test_missing_price_is_zero() {
    let server = mockito::Server::new_async().await;
    let oracle = PriceOracle::new(http(), pricing_config(&server.url()));
    assert_eq!(oracle.token_usd_price("0xunknown", "fantom").await, Decimal::ZERO);
}

#[tokio::test]
async fn test_empty_quote_gives_default_slippage() {
    let mut server = mockito::Server::new_async().await;
    let _quote = server
        .mock("GET", "/1/quote")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    let aggregator = AggregatorClient::new(http(), pricing_config(&server.url()));
    assert_eq!(aggregator.slippage(&quote(990_000)).await.unwrap(), 1);
}

#[tokio::test]
async fn test_stale_quote_is_refused() {
    let mut server = mockito::Server::new_async().await;
    let _quote = server
        .mock("GET", "/1/quote")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"toTokenAmount": "100"}"#)
        .create_async()
        .await;

    let aggregator = AggregatorClient::new(http(), pricing_config(&server.url()));
    let err = aggregator.slippage(&quote(40)).await.unwrap_err();
    assert!(matches!(err, RelayError::SlippageExceeded { slippage: 60, max: 50 }));
}

#[tokio::test]
async fn test_swap_request_carries_routing_params() {
    let mut server = mockito::Server::new_async().await;
    let _quote = server
        .mock("GET", "/1/quote")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"toTokenAmount": "1000000"}"#)
        .create_async()
        .await;
    let swap = server
        .mock("GET", "/1/swap")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("slippage".into(), "1".into()),
            Matcher::UrlEncoded("fromAddress".into(), "0xbridge".into()),
            Matcher::UrlEncoded("destReceiver".into(), "0xreceiver".into()),
            Matcher::UrlEncoded("disableEstimate".into(), "true".into()),
        ]))
        .with_status(200)
        .with_body(r#"{"tx": {"data": "0x12345678"}}"#)
        .expect(1)
        .create_async()
        .await;

    let aggregator = AggregatorClient::new(http(), pricing_config(&server.url()));
    let data = aggregator
        .swap_data(&quote(990_000), "0xbridge", "0xreceiver")
        .await
        .unwrap();

    assert_eq!(data.as_deref(), Some("0x12345678"));
    swap.assert_async().await;
}

#[tokio::test]
async fn test_swap_data_gives_up_after_bounded_retries() {
    let mut server = mockito::Server::new_async().await;
    let _quote = server
        .mock("GET", "/1/quote")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"toTokenAmount": "1000000"}"#)
        .create_async()
        .await;
    let swap = server
        .mock("GET", "/1/swap")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("{}")
        .expect(3)
        .create_async()
        .await;

    let aggregator = AggregatorClient::new(http(), pricing_config(&server.url()));
    let data = aggregator
        .swap_data(&quote(990_000), "0xbridge", "0xreceiver")
        .await
        .unwrap();

    assert_eq!(data, None);
    swap.assert_async().await;
}

#[tokio::test]
async fn test_evm_multi_hop_call_embeds_aggregator_data() {
    let mut server = mockito::Server::new_async().await;
    let _quote = server
        .mock("GET", "/56/quote")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"toTokenAmount": "1000000"}"#)
        .create_async()
        .await;
    let _swap = server
        .mock("GET", "/56/swap")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"tx": {"data": "0xdeadbeef"}}"#)
        .create_async()
        .await;

    let builder = EvmCallBuilder::new(AggregatorClient::new(http(), pricing_config(&server.url())));
    let request = SwapRequest {
        source_network: "ethereum".into(),
        destination_chain: ChainFamily::Evm,
        destination_network: "binance-smart-chain".into(),
        contract_address: "0xbridge".into(),
        wallet_address: "0xreceiver".into(),
        token_path: vec!["0x55d398326f99059ff775485246999027b3197955".into(), "0xbb4cdb9cbd36b01bd1cbaebf2de08d9173bc095c".into()],
        amount_in: 1_000_000,
        amount_out_min: 990_000,
        original_tx_hash: TX_HASH.into(),
        validator_signature: format!("0x{}", "11".repeat(65)),
    };

    let call = builder.build(&request).await.unwrap();
    assert_eq!(call.method, EvmMethod::SwapTokensToUserWithFee);
    assert_eq!(call.aggregator_data, Some(vec![0xde, 0xad, 0xbe, 0xef]));
    assert_eq!(call.new_address, "0xreceiver");
}

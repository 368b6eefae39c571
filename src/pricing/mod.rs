//! Pricing oracle client
//!
//! - `price`: token USD price with backend fallback
//! - `aggregator`: DEX aggregator slippage and swap call data
//! - `http`: shared JSON GET client and response helpers

pub mod aggregator;
pub mod http;
pub mod price;

pub use aggregator::{compute_slippage, AggregatorClient, QuoteRequest};
pub use http::JsonHttpClient;
pub use price::PriceOracle;

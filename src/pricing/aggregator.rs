//! DEX aggregator client: quote slippage and swap call data
//!
//! Slippage is a hard safety gate: a quote whose output deviates from the
//! requested minimum by the configured ceiling or more is refused. The swap
//! request, in contrast, tolerates "no data" after its retries run out.

use super::http::{fill_template, is_empty_json, json_to_u128, JsonHttpClient};
use crate::config::PricingConfig;
use crate::errors::{RelayError, RelayResult};
use crate::metrics::metrics;
use serde_json::Value;
use tokio_retry::strategy::FixedInterval;
use tokio_retry::Retry;
use tracing::info;

/// Returned when the aggregator gives no quote at all
pub const DEFAULT_EMPTY_QUOTE_SLIPPAGE: u32 = 1;

/// Inputs shared by quote and swap requests
#[derive(Debug, Clone)]
pub struct QuoteRequest<'a> {
    pub network: &'a str,
    pub from_token: &'a str,
    pub to_token: &'a str,
    pub amount_in: u128,
    pub amount_out_min: u128,
    pub original_tx_hash: &'a str,
}

/// Integer slippage percentage of `quoted_out` against `min_out`
///
/// Truncates toward zero. Fails with `SlippageExceeded` at or above
/// `max_percent`, and with `Validation` for a zero quote.
pub fn compute_slippage(quoted_out: u128, min_out: u128, max_percent: u32) -> RelayResult<u32> {
    if quoted_out == 0 {
        return Err(RelayError::validation("Aggregator quoted a zero output amount"));
    }

    let diff = quoted_out.abs_diff(min_out);
    let percent = match diff.checked_mul(100) {
        Some(scaled) => scaled / quoted_out,
        None => diff / (quoted_out / 100).max(1),
    };
    let slippage = u32::try_from(percent).unwrap_or(u32::MAX);

    if slippage >= max_percent {
        return Err(RelayError::SlippageExceeded {
            slippage,
            max: max_percent,
        });
    }

    Ok(slippage)
}

pub struct AggregatorClient {
    http: JsonHttpClient,
    config: PricingConfig,
}

impl AggregatorClient {
    pub fn new(http: JsonHttpClient, config: PricingConfig) -> Self {
        Self { http, config }
    }

    fn endpoint(&self, network: &str, endpoint_type: &str) -> RelayResult<String> {
        let network_id = self.config.aggregator_networks.get(network).ok_or_else(|| {
            RelayError::configuration(format!("No aggregator network id for '{}'", network))
        })?;

        Ok(fill_template(
            &self.config.aggregator_url,
            &[
                ("network_id", &network_id.to_string()),
                ("endpoint_type", endpoint_type),
            ],
        ))
    }

    /// Slippage of the current aggregator quote against `amount_out_min`
    pub async fn slippage(&self, request: &QuoteRequest<'_>) -> RelayResult<u32> {
        let url = self.endpoint(request.network, "quote")?;
        let params = [
            ("fromTokenAddress", request.from_token.to_string()),
            ("toTokenAddress", request.to_token.to_string()),
            ("amount", request.amount_in.to_string()),
        ];

        let response = self.http.get_json(&url, &params).await;
        info!(
            original_tx_hash = %request.original_tx_hash,
            response = ?response,
            "Aggregator quote response"
        );

        let response = match response {
            Some(body) if !is_empty_json(&body) => body,
            _ => return Ok(DEFAULT_EMPTY_QUOTE_SLIPPAGE),
        };

        let quoted_out = match response.get("toTokenAmount") {
            None => request.amount_out_min,
            Some(value) => json_to_u128(value).ok_or_else(|| {
                RelayError::validation(format!("Unparsable toTokenAmount: {}", value))
            })?,
        };

        compute_slippage(quoted_out, request.amount_out_min, self.config.max_slippage_percent)
    }

    /// Swap call data routing `amount_in` to `receiver`
    ///
    /// Retries an empty answer with fixed spacing; returns `None` once the
    /// retries are used up.
    pub async fn swap_data(
        &self,
        request: &QuoteRequest<'_>,
        contract_address: &str,
        receiver: &str,
    ) -> RelayResult<Option<String>> {
        info!(original_tx_hash = %request.original_tx_hash, "Requesting aggregator swap data");

        let slippage = self.slippage(request).await?;
        let url = self.endpoint(request.network, "swap")?;
        let params = [
            ("fromTokenAddress", request.from_token.to_string()),
            ("toTokenAddress", request.to_token.to_string()),
            ("amount", request.amount_in.to_string()),
            ("fromAddress", contract_address.to_string()),
            ("slippage", slippage.to_string()),
            ("destReceiver", receiver.to_string()),
            ("disableEstimate", "true".to_string()),
        ];

        let strategy = FixedInterval::new(self.config.quote_retry_spacing())
            .take(self.config.quote_retry_attempts);
        let mut first = true;

        let response = Retry::spawn(strategy, || {
            if !first {
                metrics().quote_retries.inc();
            }
            first = false;
            let url = url.as_str();
            let params = &params;
            async move {
                match self.http.get_json(url, params).await {
                    Some(body) if !is_empty_json(&body) => Ok(body),
                    _ => Err(()),
                }
            }
        })
        .await;

        let response = match response {
            Ok(body) => body,
            Err(()) => {
                info!(
                    original_tx_hash = %request.original_tx_hash,
                    attempts = self.config.quote_retry_attempts + 1,
                    "Aggregator swap data unavailable"
                );
                return Ok(None);
            }
        };
        info!(original_tx_hash = %request.original_tx_hash, "Aggregator swap response received");

        Ok(Some(
            response
                .pointer("/tx/data")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slippage_over_ceiling_raises() {
        assert!(matches!(
            compute_slippage(100, 40, 50),
            Err(RelayError::SlippageExceeded { slippage: 60, max: 50 })
        ));
    }

    #[test]
    fn test_slippage_at_ceiling_raises() {
        assert!(matches!(
            compute_slippage(100, 50, 50),
            Err(RelayError::SlippageExceeded { slippage: 50, .. })
        ));
    }

    #[test]
    fn test_slippage_below_ceiling() {
        assert_eq!(compute_slippage(100, 95, 50).unwrap(), 5);
        assert_eq!(compute_slippage(100, 105, 50).unwrap(), 5);
        assert_eq!(compute_slippage(1_000, 999, 50).unwrap(), 0);
    }

    #[test]
    fn test_slippage_truncates() {
        assert!(compute_slippage(3, 10, 50).is_err());
        assert_eq!(compute_slippage(300, 293, 50).unwrap(), 2);
    }

    #[test]
    fn test_zero_quote_is_validation_error() {
        assert!(matches!(compute_slippage(0, 10, 50), Err(RelayError::Validation(_))));
    }

    #[test]
    fn test_huge_amounts_do_not_overflow() {
        let quoted = u128::MAX / 2;
        assert_eq!(compute_slippage(quoted, quoted - quoted / 10, 50).unwrap(), 10);
    }
}

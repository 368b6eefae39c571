//! Shared JSON-over-HTTP GET client
//!
//! Price and quote services are optional data sources: `get_json` logs a
//! failed request or a non-200 answer and reports it as `None` so callers
//! can apply their own "empty means default" rule. The pool listing and
//! the trade-params API are required and go through `try_get_json`.

use crate::errors::{RelayError, RelayResult};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct JsonHttpClient {
    client: Client,
}

impl JsonHttpClient {
    pub fn new(timeout: Duration) -> RelayResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert("Accept", HeaderValue::from_static("application/json"));
        headers.insert("User-Agent", HeaderValue::from_static("crosschain-relayer/0.1"));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| RelayError::configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// GET `url` and parse the body as JSON
    ///
    /// Returns `None` for transport errors, non-200 statuses and bodies
    /// that are not JSON.
    pub async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Option<Value> {
        let response = match self.client.get(url).query(query).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(url = %url, error = %e, "HTTP request failed");
                return None;
            }
        };

        if response.status() != StatusCode::OK {
            warn!(url = %url, status = %response.status(), "Unexpected HTTP status");
            return None;
        }

        match response.json::<Value>().await {
            Ok(body) => Some(body),
            Err(e) => {
                debug!(url = %url, error = %e, "Response body is not JSON");
                None
            }
        }
    }

    /// GET `url` from a service the relay cannot proceed without
    ///
    /// A 404 is `Ok(None)`. Transport failures and 5xx/429 answers are
    /// [`RelayError::TransientNetwork`] so the relay restart picks them up;
    /// any other status is [`RelayError::Http`].
    pub async fn try_get_json(&self, url: &str, query: &[(&str, String)]) -> RelayResult<Option<Value>> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| RelayError::from_reqwest(e, url))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(RelayError::network(url, format!("service answered {}", status)));
        }
        if !status.is_success() {
            return Err(RelayError::Http(format!("{} returned {}", url, status)));
        }

        response
            .json::<Value>()
            .await
            .map(Some)
            .map_err(|e| RelayError::Http(format!("{} returned a non-JSON body: {}", url, e)))
    }
}

/// JSON "falsy": null, false, zero, and empty strings, arrays or objects
pub fn is_empty_json(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// Read a JSON number or numeric string as a decimal
pub fn json_to_decimal(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

/// Read a JSON number or numeric string as an unsigned integer amount
pub fn json_to_u128(value: &Value) -> Option<u128> {
    match value {
        Value::Number(n) => n.as_u64().map(u128::from).or_else(|| n.to_string().parse().ok()),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Substitute `{name}` placeholders of a URL template
pub fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    values.iter().fold(template.to_string(), |url, (name, value)| {
        url.replace(&format!("{{{}}}", name), value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_is_empty_json() {
        assert!(is_empty_json(&json!(null)));
        assert!(is_empty_json(&json!({})));
        assert!(is_empty_json(&json!([])));
        assert!(is_empty_json(&json!("")));
        assert!(is_empty_json(&json!(0)));
        assert!(!is_empty_json(&json!({"a": 1})));
        assert!(!is_empty_json(&json!([0])));
    }

    #[test]
    fn test_json_numbers() {
        assert_eq!(json_to_decimal(&json!(1.25)), Some(Decimal::from_str("1.25").unwrap()));
        assert_eq!(json_to_decimal(&json!("0.5")), Some(Decimal::from_str("0.5").unwrap()));
        assert!(json_to_decimal(&json!(1e-7)).is_some());
        assert_eq!(json_to_decimal(&json!([1])), None);

        assert_eq!(json_to_u128(&json!("340282366920938463463374607431768211455")), Some(u128::MAX));
        assert_eq!(json_to_u128(&json!(42)), Some(42));
        assert_eq!(json_to_u128(&json!("abc")), None);
    }

    #[test]
    fn test_fill_template() {
        let url = fill_template(
            "https://api/{network_id}/{endpoint_type}",
            &[("network_id", "56"), ("endpoint_type", "quote")],
        );
        assert_eq!(url, "https://api/56/quote");
    }

    #[tokio::test]
    async fn test_get_json_non_200_is_none() {
        let mut server = mockito::Server::new_async().await;
        let _m = server.mock("GET", "/missing").with_status(404).create_async().await;

        let client = JsonHttpClient::new(Duration::from_secs(5)).unwrap();
        let url = format!("{}/missing", server.url());
        assert!(client.get_json(&url, &[]).await.is_none());
        assert!(client.try_get_json(&url, &[]).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_try_get_json_status_classes() {
        let mut server = mockito::Server::new_async().await;
        let _down = server.mock("GET", "/down").with_status(503).create_async().await;
        let _limited = server.mock("GET", "/limited").with_status(429).create_async().await;
        let _denied = server.mock("GET", "/denied").with_status(403).create_async().await;
        let _ok = server
            .mock("GET", "/ok")
            .with_status(200)
            .with_body(r#"{"a": 1}"#)
            .create_async()
            .await;

        let client = JsonHttpClient::new(Duration::from_secs(5)).unwrap();
        let get = |path: &str| format!("{}{}", server.url(), path);

        assert!(client.try_get_json(&get("/down"), &[]).await.unwrap_err().is_connection_failure());
        assert!(client.try_get_json(&get("/limited"), &[]).await.unwrap_err().is_connection_failure());
        assert!(matches!(
            client.try_get_json(&get("/denied"), &[]).await,
            Err(RelayError::Http(_))
        ));
        assert_eq!(client.try_get_json(&get("/ok"), &[]).await.unwrap(), Some(serde_json::json!({"a": 1})));
    }
}

//! CryptoCompare `/data/price` client.
//!
//! `GET {base}/data/price?fsym=USD&tsyms=ETH,USDT` answers with
//! `{"ETH": 0.0005, "USDT": 1.0}`. Errors are reported in-band as
//! `{"Response": "Error", "Message": "..."}` with HTTP 200.

use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::FetchError;
use crate::source::FiatRateSource;

pub const DEFAULT_API_URL: &str = "https://min-api.cryptocompare.com";

/// Quote source backed by the CryptoCompare REST API.
#[derive(Debug, Clone)]
pub struct CryptoCompareSource {
    client: reqwest::Client,
    base_url: String,
    fiat_symbol: String,
}

impl CryptoCompareSource {
    /// Build a client whose requests are bounded by `timeout`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            fiat_symbol: "USD".to_string(),
        })
    }

    /// Quote against a fiat currency other than USD.
    pub fn with_fiat_symbol(mut self, fiat_symbol: impl Into<String>) -> Self {
        self.fiat_symbol = fiat_symbol.into();
        self
    }

    fn price_url(&self) -> String {
        format!("{}/data/price", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl FiatRateSource for CryptoCompareSource {
    async fn fetch(&self, symbols: &BTreeSet<String>) -> Result<HashMap<String, f64>, FetchError> {
        let tsyms = symbols.iter().cloned().collect::<Vec<_>>().join(",");

        let response = self
            .client
            .get(self.price_url())
            .query(&[("fsym", self.fiat_symbol.as_str()), ("tsyms", tsyms.as_str())])
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))?;

        parse_price_response(&body)
    }
}

/// Extract `symbol → rate` pairs; non-numeric entries are dropped.
fn parse_price_response(body: &serde_json::Value) -> Result<HashMap<String, f64>, FetchError> {
    let object = body
        .as_object()
        .ok_or_else(|| FetchError::Decode("expected a JSON object".to_string()))?;

    if object.get("Response").and_then(|v| v.as_str()) == Some("Error") {
        let message = object
            .get("Message")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown error");
        return Err(FetchError::Service(message.to_string()));
    }

    Ok(object
        .iter()
        .filter_map(|(symbol, value)| value.as_f64().map(|v| (symbol.clone(), v)))
        .collect())
}

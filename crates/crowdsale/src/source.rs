//! Fiat quote sources.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::error::FetchError;

/// An external service quoting how much of each symbol one unit of fiat buys.
#[async_trait]
pub trait FiatRateSource: Send + Sync {
    /// Fetch rates for all `symbols` in a single request.
    ///
    /// The returned map may omit symbols the service does not know.
    async fn fetch(&self, symbols: &BTreeSet<String>) -> Result<HashMap<String, f64>, FetchError>;
}

/// In-memory quote source, for tests and offline hosts.
#[derive(Debug, Default)]
pub struct StaticRateSource {
    state: Mutex<StaticState>,
}

#[derive(Debug, Default)]
struct StaticState {
    rates: HashMap<String, f64>,
    failing_status: Option<u16>,
}

impl StaticRateSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rates<I, S>(rates: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let source = Self::new();
        for (symbol, value) in rates {
            source.set_rate(symbol, value);
        }
        source
    }

    pub fn set_rate(&self, symbol: impl Into<String>, value: f64) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.rates.insert(symbol.into(), value);
    }

    pub fn remove_rate(&self, symbol: &str) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.rates.remove(symbol);
    }

    /// Make every subsequent fetch fail with the given HTTP status, or
    /// succeed again with `None`.
    pub fn set_failing_status(&self, status: Option<u16>) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.failing_status = status;
    }
}

#[async_trait]
impl FiatRateSource for StaticRateSource {
    async fn fetch(&self, symbols: &BTreeSet<String>) -> Result<HashMap<String, f64>, FetchError> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(status) = state.failing_status {
            return Err(FetchError::Status(status));
        }
        Ok(symbols
            .iter()
            .filter_map(|symbol| state.rates.get(symbol).map(|v| (symbol.clone(), *v)))
            .collect())
    }
}

//! Refreshing the rate cache from the fiat quote source.

use std::collections::BTreeMap;
use std::sync::Arc;

use time::OffsetDateTime;

use crate::clock::Clock;
use crate::error::RefreshError;
use crate::rates::{ExchangeRate, RateCache};
use crate::source::FiatRateSource;
use crate::token::TokenRegistry;

/// Outcome of a fully successful refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshReport {
    /// Symbols written to the cache, sorted.
    pub updated: Vec<String>,
    pub fetched_at: OffsetDateTime,
}

/// Pulls current rates for every registered token into the [`RateCache`].
///
/// Meant to be driven by an external timer that runs one refresh at a time.
/// No lock is held while the source is queried, so a stalled fetch never
/// blocks the next invocation. A failed refresh leaves the cache as it was.
pub struct RateSynchronizer {
    registry: Arc<TokenRegistry>,
    cache: Arc<RateCache>,
    source: Arc<dyn FiatRateSource>,
    clock: Arc<dyn Clock>,
}

impl RateSynchronizer {
    pub fn new(
        registry: Arc<TokenRegistry>,
        cache: Arc<RateCache>,
        source: Arc<dyn FiatRateSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            cache,
            source,
            clock,
        }
    }

    /// Fetch and commit rates for all registered rate symbols.
    ///
    /// Symbols the source omits keep their previous value and are reported
    /// through [`RefreshError::Partial`]; symbols it returned are committed
    /// either way.
    pub async fn refresh(&self) -> Result<RefreshReport, RefreshError> {
        let symbols = self.registry.rate_symbols();
        let fetched = match self.source.fetch(&symbols).await {
            Ok(fetched) => fetched,
            Err(e) => {
                tracing::warn!(error = %e, "Cannot fetch fiat rates");
                return Err(e.into());
            }
        };

        let fetched_at = self.clock.now();
        let mut updated = Vec::with_capacity(fetched.len());
        for (symbol, value) in fetched.into_iter().collect::<BTreeMap<_, _>>() {
            match ExchangeRate::new(symbol.clone(), value, fetched_at) {
                Some(rate) => {
                    tracing::debug!(symbol = %symbol, value, "New rate");
                    self.cache.put(rate);
                    updated.push(symbol);
                }
                None => tracing::warn!(symbol = %symbol, "Ignoring unusable rate"),
            }
        }

        let missing: Vec<String> = symbols
            .into_iter()
            .filter(|symbol| updated.binary_search(symbol).is_err())
            .collect();

        if !missing.is_empty() {
            tracing::warn!(?missing, ?updated, "Quote service omitted rates");
            return Err(RefreshError::Partial { missing, updated });
        }

        tracing::info!(?updated, "Updated fiat rates");
        Ok(RefreshReport {
            updated,
            fetched_at,
        })
    }
}

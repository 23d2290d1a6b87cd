//! Latest known fiat exchange rates.

use dashmap::DashMap;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::InvalidRate;
use crate::pricing::decimal_parts;

/// The current rate for one lookup symbol.
///
/// Only positive, finite values can be represented.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeRate {
    symbol: String,
    value: f64,
    fetched_at: OffsetDateTime,
    digits: BigUint,
    scale: u32,
}

impl ExchangeRate {
    /// Returns `None` unless `value` is positive and finite.
    pub fn new(symbol: impl Into<String>, value: f64, fetched_at: OffsetDateTime) -> Option<Self> {
        let (digits, scale) = decimal_parts(value)?;
        Some(Self {
            symbol: symbol.into(),
            value,
            fetched_at,
            digits,
            scale,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn fetched_at(&self) -> OffsetDateTime {
        self.fetched_at
    }

    /// The value as `digits / 10^scale`.
    pub(crate) fn decimal_parts(&self) -> (&BigUint, u32) {
        (&self.digits, self.scale)
    }

    pub fn to_record(&self) -> RateRecord {
        RateRecord {
            symbol: self.symbol.clone(),
            value: self.value,
            last_update_at: self.fetched_at,
        }
    }
}

/// Persisted shape of an exchange rate: one row per symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateRecord {
    pub symbol: String,
    pub value: f64,
    #[serde(with = "time::serde::timestamp")]
    pub last_update_at: OffsetDateTime,
}

impl TryFrom<RateRecord> for ExchangeRate {
    type Error = InvalidRate;

    fn try_from(record: RateRecord) -> Result<Self, Self::Error> {
        let RateRecord {
            symbol,
            value,
            last_update_at,
        } = record;
        match ExchangeRate::new(symbol.clone(), value, last_update_at) {
            Some(rate) => Ok(rate),
            None => Err(InvalidRate(symbol)),
        }
    }
}

/// Concurrent map of symbol → latest rate.
///
/// Each entry is replaced as a whole, so readers see either the previous
/// record or the new one. Entries are never removed.
#[derive(Debug, Default)]
pub struct RateCache {
    entries: DashMap<String, ExchangeRate>,
}

impl RateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the current rate for `symbol`.
    pub fn get(&self, symbol: &str) -> Option<ExchangeRate> {
        self.entries.get(symbol).map(|entry| entry.value().clone())
    }

    /// Replace the rate for the record's symbol.
    pub fn put(&self, rate: ExchangeRate) {
        self.entries.insert(rate.symbol.clone(), rate);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All current records, sorted by symbol.
    pub fn snapshot(&self) -> Vec<RateRecord> {
        let mut records: Vec<RateRecord> = self
            .entries
            .iter()
            .map(|entry| entry.value().to_record())
            .collect();
        records.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        records
    }

    /// Seed the cache from persisted rows, skipping invalid ones.
    ///
    /// Returns the number of rows restored.
    pub fn restore(&self, rows: impl IntoIterator<Item = RateRecord>) -> usize {
        let mut restored = 0;
        for row in rows {
            match ExchangeRate::try_from(row) {
                Ok(rate) => {
                    self.put(rate);
                    restored += 1;
                }
                Err(e) => tracing::warn!(error = %e, "Skipping persisted rate"),
            }
        }
        restored
    }
}

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::error::{AuthorizeError, ConfigError};

/// A payment token accepted by the sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub address: Address,
    /// Ticker shown to buyers.
    pub symbol: String,
    /// Symbol used when querying the fiat quote service.
    #[serde(alias = "cryptocompare_symbol")]
    pub rate_symbol: String,
    pub decimals: u8,
}

/// Immutable table of accepted tokens keyed by address.
#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
    tokens: Vec<Token>,
    by_address: HashMap<Address, usize>,
}

impl TokenRegistry {
    /// Build the registry, rejecting duplicate addresses.
    pub fn new(tokens: Vec<Token>) -> Result<Self, ConfigError> {
        let mut by_address = HashMap::with_capacity(tokens.len());
        for (index, token) in tokens.iter().enumerate() {
            if by_address.insert(token.address, index).is_some() {
                return Err(ConfigError::DuplicateToken(token.address.to_checksum()));
            }
        }

        tracing::info!(tokens = tokens.len(), "Initialized token registry");

        Ok(Self { tokens, by_address })
    }

    pub fn by_address(&self, address: &Address) -> Option<&Token> {
        self.by_address.get(address).map(|&index| &self.tokens[index])
    }

    /// Parse, normalize and look up a caller-supplied address.
    pub fn lookup(&self, address: &str) -> Result<&Token, AuthorizeError> {
        let parsed = Address::parse(address)
            .map_err(|e| AuthorizeError::UnknownToken(format!("{address}: {e}")))?;
        self.by_address(&parsed)
            .ok_or_else(|| AuthorizeError::UnknownToken(parsed.to_checksum()))
    }

    /// Tokens in configuration order.
    pub fn iter(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter()
    }

    /// Distinct quote-service symbols needed by the registered tokens.
    pub fn rate_symbols(&self) -> BTreeSet<String> {
        self.tokens.iter().map(|t| t.rate_symbol.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

//! The crowdsale facade handed to the API layer.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::authorizer::{Authorization, PurchaseAuthorizer};
use crate::chain::ChainPriceReader;
use crate::clock::Clock;
use crate::config::CrowdsaleConfig;
use crate::error::{AuthorizeError, ChainError, ConfigError, RefreshError};
use crate::rates::{RateCache, RateRecord};
use crate::signer::DigestSigner;
use crate::source::FiatRateSource;
use crate::sync::{RateSynchronizer, RefreshReport};
use crate::token::TokenRegistry;

/// An accepted token with its current unit price in fiat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenQuote {
    pub symbol: String,
    pub address: Address,
    pub decimals: u8,
    /// Fiat value of one whole token, two decimals. `None` until rates load.
    pub price: Option<String>,
}

/// Addresses of the sale contract and the token it sells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleInfo {
    pub contract_address: Address,
    pub token_address: Address,
}

/// Everything the service needs, wired together once at startup.
pub struct Crowdsale {
    registry: Arc<TokenRegistry>,
    rates: Arc<RateCache>,
    price_reader: Arc<dyn ChainPriceReader>,
    authorizer: PurchaseAuthorizer,
    synchronizer: RateSynchronizer,
    sale: SaleInfo,
}

impl Crowdsale {
    /// Assemble the service from configuration and prebuilt collaborators.
    pub fn new(
        config: &CrowdsaleConfig,
        price_reader: Arc<dyn ChainPriceReader>,
        source: Arc<dyn FiatRateSource>,
        signer: Arc<dyn DigestSigner>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        let sale = SaleInfo {
            contract_address: config.contract_address()?,
            token_address: config.sale_token_address()?,
        };
        let registry = Arc::new(TokenRegistry::new(config.tokens.clone())?);
        let rates = Arc::new(RateCache::new());

        let authorizer = PurchaseAuthorizer::new(
            registry.clone(),
            rates.clone(),
            price_reader.clone(),
            signer,
            clock.clone(),
            config.pricing_rules(),
            config.signature_ttl(),
        );
        let synchronizer = RateSynchronizer::new(registry.clone(), rates.clone(), source, clock);

        tracing::info!(
            contract = %sale.contract_address,
            signer = %authorizer.signer_address(),
            tokens = registry.len(),
            "Crowdsale service ready"
        );

        Ok(Self {
            registry,
            rates,
            price_reader,
            authorizer,
            synchronizer,
            sale,
        })
    }

    /// Build the production service: JSON-RPC price reader, CryptoCompare
    /// rates and the signing key from the environment.
    #[cfg(feature = "cryptocompare")]
    pub fn connect(config: &CrowdsaleConfig) -> Result<Self, ConfigError> {
        use crate::chain::RpcPriceReader;
        use crate::clock::SystemClock;
        use crate::cryptocompare::CryptoCompareSource;
        use crate::signer::LocalSigner;

        let price_reader = RpcPriceReader::connect(&config.node_url, config.contract_address()?)?;
        let source = CryptoCompareSource::new(&config.rates.api_url, config.request_timeout())
            .map_err(|e| ConfigError::Provider(e.to_string()))?
            .with_fiat_symbol(&config.rates.fiat_symbol);
        let signer = LocalSigner::from_env()?;

        Self::new(
            config,
            Arc::new(price_reader),
            Arc::new(source),
            Arc::new(signer),
            Arc::new(SystemClock),
        )
    }

    pub async fn authorize(
        &self,
        token_address: &str,
        amount_to_pay: &str,
    ) -> Result<Authorization, AuthorizeError> {
        self.authorizer.authorize(token_address, amount_to_pay).await
    }

    pub async fn refresh_rates(&self) -> Result<RefreshReport, RefreshError> {
        self.synchronizer.refresh().await
    }

    /// Registered tokens in configuration order.
    pub fn token_quotes(&self) -> Vec<TokenQuote> {
        self.registry
            .iter()
            .map(|token| TokenQuote {
                symbol: token.symbol.clone(),
                address: token.address,
                decimals: token.decimals,
                price: self
                    .rates
                    .get(&token.rate_symbol)
                    .map(|rate| format!("{:.2}", 1.0 / rate.value())),
            })
            .collect()
    }

    /// The sale contract's raw `price()`, before rescaling.
    pub async fn current_price(&self) -> Result<String, ChainError> {
        Ok(self.price_reader.current_price().await?.to_string())
    }

    pub fn sale_info(&self) -> SaleInfo {
        self.sale
    }

    pub fn signer_address(&self) -> Address {
        self.authorizer.signer_address()
    }

    /// Cached rates for persistence across restarts.
    pub fn rates_snapshot(&self) -> Vec<RateRecord> {
        self.rates.snapshot()
    }

    /// Seed the cache from persisted rows; returns how many were loaded.
    pub fn restore_rates(&self, rows: impl IntoIterator<Item = RateRecord>) -> usize {
        self.rates.restore(rows)
    }
}

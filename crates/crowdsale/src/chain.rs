//! Reading the sale contract's unit price.

use async_trait::async_trait;
use num_bigint::BigUint;

use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::sol;
use alloy::transports::http::reqwest::Url;

use crate::address::Address;
use crate::error::{ChainError, ConfigError};

sol! {
    #[sol(rpc)]
    interface ICrowdsale {
        function price() external view returns (uint256);
    }
}

/// Source of the sale contract's current unit price, in the contract's own
/// fixed-point scale.
///
/// Implementations own their timeouts; callers do not retry.
#[async_trait]
pub trait ChainPriceReader: Send + Sync {
    async fn current_price(&self) -> Result<BigUint, ChainError>;
}

/// Calls `price()` on the sale contract over JSON-RPC.
#[derive(Debug, Clone)]
pub struct RpcPriceReader {
    contract: Address,
    provider: DynProvider,
}

impl RpcPriceReader {
    pub fn new(contract: Address, provider: DynProvider) -> Self {
        Self { contract, provider }
    }

    /// Connect an HTTP provider to `node_url`.
    pub fn connect(node_url: &str, contract: Address) -> Result<Self, ConfigError> {
        let url: Url = node_url
            .parse()
            .map_err(|e| ConfigError::Provider(format!("invalid node url {node_url}: {e}")))?;
        let provider = ProviderBuilder::new().connect_http(url).erased();

        tracing::info!(contract = %contract, "Connected sale contract price reader");

        Ok(Self::new(contract, provider))
    }

    pub fn contract(&self) -> Address {
        self.contract
    }
}

#[async_trait]
impl ChainPriceReader for RpcPriceReader {
    async fn current_price(&self) -> Result<BigUint, ChainError> {
        let sale = ICrowdsale::new(
            alloy::primitives::Address::from(*self.contract.as_bytes()),
            self.provider.clone(),
        );
        let price = sale
            .price()
            .call()
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;
        Ok(BigUint::from_bytes_be(&price.to_be_bytes::<32>()))
    }
}

/// Always reports the same price.
#[derive(Debug, Clone)]
pub struct FixedPriceReader {
    price: BigUint,
}

impl FixedPriceReader {
    pub fn new(price: impl Into<BigUint>) -> Self {
        Self {
            price: price.into(),
        }
    }
}

#[async_trait]
impl ChainPriceReader for FixedPriceReader {
    async fn current_price(&self) -> Result<BigUint, ChainError> {
        Ok(self.price.clone())
    }
}

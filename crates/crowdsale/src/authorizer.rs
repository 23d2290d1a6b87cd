//! Signed purchase authorizations.
//!
//! An authorization lets a buyer call the sale contract with a fixed pair
//! of amounts until it expires. The contract recomputes the packed message
//! digest, recovers the signer and compares it with the service address; it
//! is also responsible for rejecting reuse, since the message carries no nonce.

use std::sync::Arc;

use num_bigint::BigUint;
use serde::{Serialize, Serializer};
use time::Duration;

use crate::address::Address;
use crate::chain::ChainPriceReader;
use crate::clock::Clock;
use crate::digest::PurchaseMessage;
use crate::error::{AuthorizeError, ChainError, SignError};
use crate::pricing::PricingRules;
use crate::rates::RateCache;
use crate::signer::{recover_signer, DigestSigner};
use crate::token::TokenRegistry;

/// A signed, time-bounded permission for one purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Authorization {
    token_address: Address,
    #[serde(serialize_with = "as_decimal_string")]
    amount_to_pay: BigUint,
    #[serde(serialize_with = "as_decimal_string")]
    amount_to_receive: BigUint,
    expires_at: u64,
    #[serde(serialize_with = "as_hex_signature")]
    signature: [u8; 65],
}

fn as_decimal_string<S: Serializer>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

fn as_hex_signature<S: Serializer>(value: &[u8; 65], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("0x{}", hex::encode(value)))
}

impl Authorization {
    pub fn token_address(&self) -> Address {
        self.token_address
    }

    pub fn amount_to_pay(&self) -> &BigUint {
        &self.amount_to_pay
    }

    pub fn amount_to_receive(&self) -> &BigUint {
        &self.amount_to_receive
    }

    /// Unix seconds after which the contract refuses the authorization.
    pub fn expires_at(&self) -> u64 {
        self.expires_at
    }

    pub fn signature(&self) -> &[u8; 65] {
        &self.signature
    }

    /// `0x`-prefixed hex rendering of the signature.
    pub fn signature_hex(&self) -> String {
        format!("0x{}", hex::encode(self.signature))
    }

    fn message(&self) -> PurchaseMessage<'_> {
        PurchaseMessage {
            token: &self.token_address,
            amount_to_pay: &self.amount_to_pay,
            amount_to_receive: &self.amount_to_receive,
            expires_at: self.expires_at,
        }
    }

    /// Recover the signing address the way the sale contract does.
    pub fn recover_signer(&self) -> Result<Address, SignError> {
        let digest = self
            .message()
            .signing_hash()
            .map_err(|e| SignError::InvalidSignature(e.to_string()))?;
        recover_signer(&digest, &self.signature)
    }
}

/// Turns a payment offer into a signed [`Authorization`].
///
/// Holds no mutable state of its own; concurrent calls are independent.
pub struct PurchaseAuthorizer {
    registry: Arc<TokenRegistry>,
    rates: Arc<RateCache>,
    price_reader: Arc<dyn ChainPriceReader>,
    signer: Arc<dyn DigestSigner>,
    clock: Arc<dyn Clock>,
    rules: PricingRules,
    signature_ttl: Duration,
}

impl PurchaseAuthorizer {
    pub fn new(
        registry: Arc<TokenRegistry>,
        rates: Arc<RateCache>,
        price_reader: Arc<dyn ChainPriceReader>,
        signer: Arc<dyn DigestSigner>,
        clock: Arc<dyn Clock>,
        rules: PricingRules,
        signature_ttl: Duration,
    ) -> Self {
        Self {
            registry,
            rates,
            price_reader,
            signer,
            clock,
            rules,
            signature_ttl,
        }
    }

    /// Address every authorization is signed by.
    pub fn signer_address(&self) -> Address {
        self.signer.address()
    }

    /// Price `amount_to_pay` (a decimal integer in the token's smallest
    /// unit) and sign the resulting purchase.
    #[tracing::instrument(skip(self))]
    pub async fn authorize(
        &self,
        token_address: &str,
        amount_to_pay: &str,
    ) -> Result<Authorization, AuthorizeError> {
        let result = self.build(token_address, amount_to_pay).await;
        match &result {
            Ok(authorization) => tracing::info!(
                token = %authorization.token_address,
                amount_to_receive = %authorization.amount_to_receive,
                expires_at = authorization.expires_at,
                "Issued purchase authorization"
            ),
            Err(AuthorizeError::Signing(e)) => {
                tracing::error!(error = %e, "Failed to sign purchase authorization")
            }
            Err(e) => tracing::debug!(error = %e, "Purchase authorization refused"),
        }
        result
    }

    async fn build(
        &self,
        token_address: &str,
        amount_to_pay: &str,
    ) -> Result<Authorization, AuthorizeError> {
        let token = self.registry.lookup(token_address)?;
        let amount_to_pay = parse_amount(amount_to_pay)?;

        let rate = self
            .rates
            .get(&token.rate_symbol)
            .ok_or_else(|| AuthorizeError::RateUnavailable {
                symbol: token.rate_symbol.clone(),
            })?;

        let chain_price = self.price_reader.current_price().await?;
        if chain_price == BigUint::ZERO {
            return Err(ChainError::ZeroPrice.into());
        }

        let conversion = self
            .rules
            .convert(&amount_to_pay, &rate, token.decimals, &chain_price);
        tracing::debug!(
            token = %token.symbol,
            base_amount = %conversion.base_amount,
            bonus = conversion.bonus_applied,
            "Converted payment"
        );

        let expires_at = (self.clock.now() + self.signature_ttl).unix_timestamp();
        let expires_at = u64::try_from(expires_at)
            .map_err(|_| SignError::Backend("expiry before unix epoch".to_string()))?;

        let message = PurchaseMessage {
            token: &token.address,
            amount_to_pay: &amount_to_pay,
            amount_to_receive: &conversion.amount_to_receive,
            expires_at,
        };
        let signature = self.signer.sign(&message.signing_hash()?)?;

        Ok(Authorization {
            token_address: token.address,
            amount_to_pay,
            amount_to_receive: conversion.amount_to_receive,
            expires_at,
            signature,
        })
    }
}

/// Parse a non-negative decimal integer that fits in a uint256.
fn parse_amount(amount: &str) -> Result<BigUint, AuthorizeError> {
    let amount = amount.trim();
    if amount.is_empty() || !amount.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AuthorizeError::InvalidAmount(format!(
            "expected a non-negative integer, got {amount:?}"
        )));
    }
    let value = BigUint::parse_bytes(amount.as_bytes(), 10)
        .ok_or_else(|| AuthorizeError::InvalidAmount(amount.to_string()))?;
    if value.bits() > 256 {
        return Err(AuthorizeError::InvalidAmount(
            "amount to pay exceeds uint256".to_string(),
        ));
    }
    Ok(value)
}

use thiserror::Error;

/// Errors produced while authorizing a purchase.
#[derive(Debug, Error)]
pub enum AuthorizeError {
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("unknown token: {0}")]
    UnknownToken(String),

    #[error("no exchange rate available for {symbol}")]
    RateUnavailable { symbol: String },

    #[error("chain price unavailable: {0}")]
    ChainPriceUnavailable(#[from] ChainError),

    #[error("signing error: {0}")]
    Signing(#[from] SignError),
}

impl AuthorizeError {
    /// Whether the failure was caused by the request itself rather than
    /// by service state or an upstream dependency.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AuthorizeError::InvalidAmount(_) | AuthorizeError::UnknownToken(_)
        )
    }
}

/// Errors from parsing a hex account address.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("expected 40 hex digits, got {0}")]
    InvalidLength(usize),

    #[error("invalid hex in address: {0}")]
    InvalidHex(String),
}

/// Errors from reading the sale contract price.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("rpc error: {0}")]
    Rpc(String),

    #[error("sale contract reported a zero price")]
    ZeroPrice,
}

/// Errors from the signing backend.
#[derive(Debug, Error)]
pub enum SignError {
    #[error("signing key unavailable")]
    KeyUnavailable,

    #[error("signer backend: {0}")]
    Backend(String),

    #[error("malformed signature: {0}")]
    InvalidSignature(String),
}

/// Errors from the fiat quote service.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("quote service returned HTTP {0}")]
    Status(u16),

    #[error("quote service error: {0}")]
    Service(String),

    #[error("malformed quote response: {0}")]
    Decode(String),
}

/// Errors from a rate refresh.
#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("rate fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("quote service omitted {missing:?}")]
    Partial {
        missing: Vec<String>,
        updated: Vec<String>,
    },
}

/// Startup-time configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config load error: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("missing configuration value: {0}")]
    MissingField(&'static str),

    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        field: &'static str,
        reason: String,
    },

    #[error("token address {0} is configured more than once")]
    DuplicateToken(String),

    #[error("SIGNER_PRIVATE_KEY is not set")]
    MissingPrivateKey,

    #[error("SIGNER_PRIVATE_KEY is not a valid secp256k1 private key")]
    InvalidPrivateKey,

    #[error("provider error: {0}")]
    Provider(String),
}

/// A rate record that violates the positive, finite value invariant.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid exchange rate for {0}")]
pub struct InvalidRate(pub String);

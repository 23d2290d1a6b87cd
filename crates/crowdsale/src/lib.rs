pub mod address;
pub mod authorizer;
pub mod chain;
pub mod clock;
pub mod config;
#[cfg(feature = "cryptocompare")]
pub mod cryptocompare;
pub mod digest;
pub mod error;
pub mod pricing;
pub mod rates;
pub mod service;
pub mod signer;
pub mod source;
pub mod sync;
pub mod token;

// Re-exports for convenience
pub use address::Address;
pub use authorizer::{Authorization, PurchaseAuthorizer};
pub use chain::{ChainPriceReader, FixedPriceReader, RpcPriceReader};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::CrowdsaleConfig;
#[cfg(feature = "cryptocompare")]
pub use cryptocompare::CryptoCompareSource;
pub use error::{AuthorizeError, ChainError, ConfigError, FetchError, RefreshError, SignError};
pub use pricing::PricingRules;
pub use rates::{ExchangeRate, RateCache, RateRecord};
pub use service::{Crowdsale, SaleInfo, TokenQuote};
pub use signer::{DigestSigner, LocalSigner};
pub use source::{FiatRateSource, StaticRateSource};
pub use sync::{RateSynchronizer, RefreshReport};
pub use token::{Token, TokenRegistry};

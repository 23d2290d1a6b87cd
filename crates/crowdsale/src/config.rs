//! Service configuration.
//!
//! Loaded once at startup from a TOML file with `CROWDSALE__*` environment
//! overrides (`CROWDSALE__SALE__CONTRACT_ADDRESS`, ...). The signing key is
//! read separately, from [`crate::signer::PRIVATE_KEY_ENV`].

use std::path::Path;

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::error::ConfigError;
use crate::pricing::PricingRules;
use crate::token::Token;

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "CROWDSALE_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "crowdsale.toml";

/// Complete service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CrowdsaleConfig {
    /// JSON-RPC endpoint of the chain hosting the sale contract.
    pub node_url: String,
    pub sale: SaleConfig,
    pub signature: SignatureConfig,
    pub bonus: BonusConfig,
    pub rates: RatesConfig,
    pub tokens: Vec<Token>,
}

impl Default for CrowdsaleConfig {
    fn default() -> Self {
        Self {
            node_url: "http://127.0.0.1:8545".to_string(),
            sale: SaleConfig::default(),
            signature: SignatureConfig::default(),
            bonus: BonusConfig::default(),
            rates: RatesConfig::default(),
            tokens: Vec::new(),
        }
    }
}

/// Sale contract settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SaleConfig {
    pub contract_address: Option<Address>,
    /// The token being sold.
    pub token_address: Option<Address>,
    /// Reference precision shared by all payment tokens.
    pub token_decimals: u8,
    /// Power of ten applied to the contract's `price()`.
    pub price_rescale_exponent: u32,
}

impl Default for SaleConfig {
    fn default() -> Self {
        Self {
            contract_address: None,
            token_address: None,
            token_decimals: 18,
            price_rescale_exponent: 9,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SignatureConfig {
    pub expiration_minutes: u32,
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self {
            expiration_minutes: 30,
        }
    }
}

/// Large-purchase bonus.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BonusConfig {
    /// Fiat-equivalent amount a purchase must strictly exceed.
    pub threshold: u64,
    pub percent: u32,
}

impl Default for BonusConfig {
    fn default() -> Self {
        Self {
            threshold: 10_000_000,
            percent: 4,
        }
    }
}

/// Fiat quote service settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RatesConfig {
    pub api_url: String,
    pub fiat_symbol: String,
    pub request_timeout_seconds: u64,
    /// How often the host should call `refresh_rates`.
    pub update_interval_minutes: u64,
}

impl Default for RatesConfig {
    fn default() -> Self {
        Self {
            api_url: "https://min-api.cryptocompare.com".to_string(),
            fiat_symbol: "USD".to_string(),
            request_timeout_seconds: 10,
            update_interval_minutes: 1,
        }
    }
}

impl CrowdsaleConfig {
    /// Load configuration from a TOML file plus environment overrides.
    ///
    /// A missing file is not an error; defaults and environment values apply.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::info!("Config file not found at {:?}, using defaults", path);
        }

        let config: Self = ::config::Config::builder()
            .add_source(::config::File::from(path).required(false))
            .add_source(::config::Environment::with_prefix("CROWDSALE").separator("__"))
            .build()?
            .try_deserialize()?;
        config.validate()?;

        tracing::info!(
            path = %path.display(),
            tokens = config.tokens.len(),
            "Loaded crowdsale configuration"
        );

        Ok(config)
    }

    /// Load from the file named by [`CONFIG_PATH_ENV`], or `crowdsale.toml`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::from_file(path)
    }

    /// Parse configuration from TOML text, without environment overrides.
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let config: Self = ::config::Config::builder()
            .add_source(::config::File::from_str(toml, ::config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the derived settings cannot represent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.rates.update_interval_minutes.checked_mul(60) {
            Some(0) => Err(ConfigError::InvalidValue {
                field: "rates.update_interval_minutes",
                reason: "must be at least one minute".to_string(),
            }),
            Some(_) => Ok(()),
            None => Err(ConfigError::InvalidValue {
                field: "rates.update_interval_minutes",
                reason: "too large".to_string(),
            }),
        }
    }

    pub fn pricing_rules(&self) -> PricingRules {
        PricingRules {
            global_decimals: self.sale.token_decimals,
            price_rescale_exponent: self.sale.price_rescale_exponent,
            bonus_threshold: BigUint::from(self.bonus.threshold),
            bonus_percent: self.bonus.percent,
        }
    }

    pub fn signature_ttl(&self) -> time::Duration {
        time::Duration::minutes(i64::from(self.signature.expiration_minutes))
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.rates.request_timeout_seconds)
    }

    /// Interval at which the host scheduler should refresh rates.
    pub fn refresh_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.rates.update_interval_minutes.saturating_mul(60))
    }

    pub fn contract_address(&self) -> Result<Address, ConfigError> {
        self.sale
            .contract_address
            .ok_or(ConfigError::MissingField("sale.contract_address"))
    }

    pub fn sale_token_address(&self) -> Result<Address, ConfigError> {
        self.sale
            .token_address
            .ok_or(ConfigError::MissingField("sale.token_address"))
    }
}

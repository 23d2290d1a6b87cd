//! Payment-to-token conversion.
//!
//! All arithmetic is done on exact big integers. Exchange rates arrive as
//! binary64 values; they are read back through their shortest decimal
//! rendering (the form the quote service sent), so `amount / rate` is an exact
//! fraction and truncation only happens where the conversion says so.

use num_bigint::BigUint;

use crate::rates::ExchangeRate;

/// Split a positive finite float into `digits / 10^scale` using its
/// shortest round-trip decimal rendering.
pub(crate) fn decimal_parts(value: f64) -> Option<(BigUint, u32)> {
    if !value.is_finite() || value <= 0.0 {
        return None;
    }

    // `Display` for floats never uses exponent notation.
    let rendered = value.to_string();
    let (int_part, frac_part) = rendered.split_once('.').unwrap_or((rendered.as_str(), ""));
    let digits = format!("{int_part}{frac_part}");
    let numerator = BigUint::parse_bytes(digits.as_bytes(), 10)?;
    if numerator == BigUint::ZERO {
        return None;
    }
    Some((numerator, u32::try_from(frac_part.len()).ok()?))
}

fn pow10(exp: u32) -> BigUint {
    BigUint::from(10u8).pow(exp)
}

/// A payment converted into fiat-equivalent units, held as an exact fraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiatAmount {
    numer: BigUint,
    denom: BigUint,
}

impl FiatAmount {
    /// `amount / rate`.
    pub fn new(amount: &BigUint, rate: &ExchangeRate) -> Self {
        let (digits, scale) = rate.decimal_parts();
        Self {
            numer: amount * pow10(scale),
            denom: digits.clone(),
        }
    }

    /// Strictly greater than `threshold`.
    pub fn exceeds(&self, threshold: &BigUint) -> bool {
        self.numer > threshold * &self.denom
    }

    /// Integer part, truncated toward zero.
    pub fn trunc(&self) -> BigUint {
        &self.numer / &self.denom
    }
}

/// Contract-level constants that shape the conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricingRules {
    /// Reference precision shared by all sale tokens.
    pub global_decimals: u8,
    /// Power of ten applied to the raw on-chain price.
    pub price_rescale_exponent: u32,
    /// Fiat-equivalent amount a purchase must strictly exceed for the bonus.
    pub bonus_threshold: BigUint,
    /// Bonus uplift in percent.
    pub bonus_percent: u32,
}

impl Default for PricingRules {
    fn default() -> Self {
        Self {
            global_decimals: 18,
            price_rescale_exponent: 9,
            bonus_threshold: BigUint::from(10_000_000u64),
            bonus_percent: 4,
        }
    }
}

/// Result of converting a payment into a token amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversion {
    pub fiat_amount: FiatAmount,
    /// Receivable amount before any bonus.
    pub base_amount: BigUint,
    pub bonus_applied: bool,
    pub amount_to_receive: BigUint,
}

impl PricingRules {
    /// On-chain price aligned to the fiat arithmetic.
    pub fn rescale_price(&self, chain_price: &BigUint) -> BigUint {
        chain_price * pow10(self.price_rescale_exponent)
    }

    /// Convert a payment into the amount of sale tokens it buys.
    ///
    /// `receive = trunc(fiat / (price × 10^(global_decimals − token_decimals)))`,
    /// with a negative exponent moved into the numerator. The bonus is
    /// decided on the fiat amount before the decimals adjustment and applied
    /// to the truncated amount, truncating again.
    ///
    /// `chain_price` must be non-zero.
    pub fn convert(
        &self,
        amount_to_pay: &BigUint,
        rate: &ExchangeRate,
        token_decimals: u8,
        chain_price: &BigUint,
    ) -> Conversion {
        let fiat_amount = FiatAmount::new(amount_to_pay, rate);

        let mut numer = fiat_amount.numer.clone();
        let mut denom = &fiat_amount.denom * self.rescale_price(chain_price);
        if self.global_decimals >= token_decimals {
            denom *= pow10(u32::from(self.global_decimals - token_decimals));
        } else {
            numer *= pow10(u32::from(token_decimals - self.global_decimals));
        }
        let base_amount = numer / denom;

        let bonus_applied = fiat_amount.exceeds(&self.bonus_threshold);
        let amount_to_receive = if bonus_applied {
            &base_amount * (BigUint::from(100u32) + self.bonus_percent) / 100u32
        } else {
            base_amount.clone()
        };

        Conversion {
            fiat_amount,
            base_amount,
            bonus_applied,
            amount_to_receive,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn rate(value: f64) -> ExchangeRate {
        ExchangeRate::new("ETH", value, datetime!(2024-01-01 0:00 UTC)).unwrap()
    }

    fn big(s: &str) -> BigUint {
        BigUint::parse_bytes(s.as_bytes(), 10).unwrap()
    }

    #[test]
    fn test_decimal_parts() {
        assert_eq!(decimal_parts(2000.0), Some((BigUint::from(2000u32), 0)));
        assert_eq!(decimal_parts(0.0005), Some((BigUint::from(5u32), 4)));
        assert_eq!(decimal_parts(1e-7), Some((BigUint::from(1u32), 7)));
        assert_eq!(decimal_parts(12.25), Some((BigUint::from(1225u32), 2)));
        assert_eq!(decimal_parts(0.0), None);
        assert_eq!(decimal_parts(-1.0), None);
        assert_eq!(decimal_parts(f64::NAN), None);
        assert_eq!(decimal_parts(f64::INFINITY), None);
    }

    #[test]
    fn test_fiat_amount_is_exact() {
        // 10 / 0.1 must be exactly 100, not 99.999...
        let fiat = FiatAmount::new(&BigUint::from(10u8), &rate(0.1));
        assert_eq!(fiat.trunc(), BigUint::from(100u8));
        assert!(!fiat.exceeds(&BigUint::from(100u8)));
        assert!(fiat.exceeds(&BigUint::from(99u8)));
    }

    #[test]
    fn test_reference_scenario() {
        let rules = PricingRules::default();
        let conversion = rules.convert(
            &big("5000000000000000000"),
            &rate(2000.0),
            18,
            &BigUint::from(1u8),
        );
        assert_eq!(conversion.fiat_amount.trunc(), big("2500000000000000"));
        assert_eq!(conversion.base_amount, BigUint::from(2_500_000u32));
        assert!(conversion.bonus_applied);
        assert_eq!(conversion.amount_to_receive, BigUint::from(2_600_000u32));
    }

    #[test]
    fn test_reference_scenario_below_threshold() {
        let rules = PricingRules {
            bonus_threshold: big("2500000000000000"),
            ..PricingRules::default()
        };
        let conversion = rules.convert(
            &big("5000000000000000000"),
            &rate(2000.0),
            18,
            &BigUint::from(1u8),
        );
        assert!(!conversion.bonus_applied);
        assert_eq!(conversion.amount_to_receive, BigUint::from(2_500_000u32));
    }

    #[test]
    fn test_bonus_boundary() {
        let rules = PricingRules {
            price_rescale_exponent: 0,
            ..PricingRules::default()
        };
        let one = BigUint::from(1u8);

        let at = rules.convert(&BigUint::from(10_000_000u64), &rate(1.0), 18, &one);
        assert!(!at.bonus_applied);
        assert_eq!(at.amount_to_receive, BigUint::from(10_000_000u64));

        let above = rules.convert(&BigUint::from(10_000_001u64), &rate(1.0), 18, &one);
        assert!(above.bonus_applied);
        assert_eq!(above.base_amount, BigUint::from(10_000_001u64));
        assert_eq!(above.amount_to_receive, BigUint::from(10_400_001u64));
    }

    #[test]
    fn test_large_bonus_percent() {
        let rules = PricingRules {
            price_rescale_exponent: 0,
            bonus_threshold: BigUint::ZERO,
            bonus_percent: u32::MAX,
            ..PricingRules::default()
        };
        let conversion = rules.convert(&BigUint::from(100u8), &rate(1.0), 18, &BigUint::from(1u8));
        assert_eq!(
            conversion.amount_to_receive,
            BigUint::from(100u64 + u64::from(u32::MAX))
        );
    }

    #[test]
    fn test_bonus_threshold_uses_fiat_units() {
        let rules = PricingRules {
            price_rescale_exponent: 0,
            ..PricingRules::default()
        };
        // Raw payment is above the threshold but its fiat value is not.
        let conversion = rules.convert(
            &BigUint::from(20_000_000u64),
            &rate(2.0),
            18,
            &BigUint::from(1u8),
        );
        assert!(!conversion.bonus_applied);
        assert_eq!(conversion.amount_to_receive, BigUint::from(10_000_000u64));
    }

    #[test]
    fn test_decimals_adjustment_in_denominator() {
        let rules = PricingRules {
            price_rescale_exponent: 0,
            bonus_threshold: big("1000000000000000000000000"),
            ..PricingRules::default()
        };
        // 6-decimal token against an 18-decimal reference: 10^12 in the denominator.
        let conversion = rules.convert(
            &big("5000000000000000"),
            &rate(1.0),
            6,
            &BigUint::from(5u8),
        );
        assert_eq!(conversion.amount_to_receive, BigUint::from(1000u32));
    }

    #[test]
    fn test_decimals_adjustment_above_reference() {
        let rules = PricingRules {
            global_decimals: 6,
            price_rescale_exponent: 0,
            bonus_threshold: big("1000000000000000000000000"),
            bonus_percent: 4,
        };
        // 18-decimal token against a 6-decimal reference moves 10^12 to the numerator.
        let conversion = rules.convert(&BigUint::from(3u8), &rate(1.0), 18, &BigUint::from(2u8));
        assert_eq!(conversion.amount_to_receive, big("1500000000000"));
    }

    #[test]
    fn test_truncates_toward_zero() {
        let rules = PricingRules {
            price_rescale_exponent: 0,
            ..PricingRules::default()
        };
        let conversion = rules.convert(&BigUint::from(7u8), &rate(1.0), 18, &BigUint::from(2u8));
        assert_eq!(conversion.amount_to_receive, BigUint::from(3u8));

        let zero = rules.convert(&BigUint::ZERO, &rate(1.0), 18, &BigUint::from(2u8));
        assert_eq!(zero.amount_to_receive, BigUint::ZERO);
    }
}

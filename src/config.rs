use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::errors::{Result, SimulatorError};
use crate::types::{AmortizationSystem, ProductRates};

/// currency symbol of the ShiftBox product
pub const DEFAULT_CURRENCY_SYMBOL: &str = "R$";

/// installment counts offered by the request form
pub const SUGGESTED_INSTALLMENT_OPTIONS: [u32; 6] = [6, 12, 24, 36, 48, 60];

/// loan product configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductConfig {
    pub currency_symbol: String,
    pub rates: ProductRates,
    pub limits: LoanLimits,
    pub amortization_system: AmortizationSystem,
    /// share of the pool that may be lent out before new loans are queued
    pub pool_approval_threshold: Rate,
}

/// product limits enforced before a request leaves the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanLimits {
    pub min_loan: Money,
    pub max_loan: Money,
    pub min_installments: u32,
    pub max_installments: u32,
}

impl Default for LoanLimits {
    fn default() -> Self {
        Self {
            min_loan: Money::from_major(500),
            max_loan: Money::from_major(50_000),
            min_installments: 6,
            max_installments: 60,
        }
    }
}

impl Default for ProductRates {
    fn default() -> Self {
        Self {
            annual_interest_rate: Rate::from_decimal(dec!(0.15)),
            platform_fee_rate: Rate::from_decimal(dec!(0.02)),
            reserve_fee_rate: Rate::from_decimal(dec!(0.01)),
        }
    }
}

impl Default for ProductConfig {
    fn default() -> Self {
        Self::shiftbox()
    }
}

impl ProductConfig {
    /// the pool loan product as offered by ShiftBox
    pub fn shiftbox() -> Self {
        Self {
            currency_symbol: DEFAULT_CURRENCY_SYMBOL.to_string(),
            rates: ProductRates::default(),
            limits: LoanLimits::default(),
            amortization_system: AmortizationSystem::Price,
            pool_approval_threshold: Rate::from_percentage(80),
        }
    }

    /// load and validate a configuration from json
    pub fn from_json(json: &str) -> Result<Self> {
        let config: ProductConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// installment counts offered by the request form
    pub fn installment_options(&self) -> &'static [u32] {
        &SUGGESTED_INSTALLMENT_OPTIONS
    }

    /// check internal consistency of the configuration
    pub fn validate(&self) -> Result<()> {
        let rates = &self.rates;
        for (name, rate) in [
            ("annual_interest_rate", rates.annual_interest_rate),
            ("platform_fee_rate", rates.platform_fee_rate),
            ("reserve_fee_rate", rates.reserve_fee_rate),
        ] {
            if rate.is_negative() {
                return Err(SimulatorError::InvalidConfiguration {
                    message: format!("{} must not be negative, got {}", name, rate),
                });
            }
        }

        let limits = &self.limits;
        if !limits.min_loan.is_positive() {
            return Err(SimulatorError::InvalidConfiguration {
                message: format!("min_loan must be positive, got {}", limits.min_loan),
            });
        }
        if limits.min_loan > limits.max_loan {
            return Err(SimulatorError::InvalidConfiguration {
                message: format!(
                    "min_loan {} exceeds max_loan {}",
                    limits.min_loan, limits.max_loan
                ),
            });
        }
        if limits.min_installments == 0 || limits.min_installments > limits.max_installments {
            return Err(SimulatorError::InvalidConfiguration {
                message: format!(
                    "installment range {}..={} is empty",
                    limits.min_installments, limits.max_installments
                ),
            });
        }

        let threshold = self.pool_approval_threshold;
        if !threshold.as_decimal().is_sign_positive()
            || threshold.is_zero()
            || threshold > Rate::ONE
        {
            return Err(SimulatorError::InvalidConfiguration {
                message: format!("pool_approval_threshold must be in (0, 1], got {}", threshold),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_shiftbox_preset() {
        let config = ProductConfig::shiftbox();
        assert_eq!(config.limits.min_loan, Money::from_major(500));
        assert_eq!(config.limits.max_loan, Money::from_major(50_000));
        assert_eq!(config.rates.annual_interest_rate, Rate::from_percentage(15));
        assert_eq!(config.installment_options(), &[6, 12, 24, 36, 48, 60]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_json_roundtrip_keeps_config() {
        let config = ProductConfig::shiftbox();
        let json = config.to_json_pretty().unwrap();
        let parsed = ProductConfig::from_json(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_rejects_inverted_limits() {
        let mut config = ProductConfig::shiftbox();
        config.limits.min_loan = Money::from_major(60_000);
        assert!(matches!(
            config.validate(),
            Err(SimulatorError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_rejects_negative_rate() {
        let mut config = ProductConfig::shiftbox();
        config.rates.platform_fee_rate = Rate::from_decimal(dec!(-0.01));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_threshold_above_one() {
        let mut config = ProductConfig::shiftbox();
        config.pool_approval_threshold = Rate::from_percentage(120);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            ProductConfig::from_json("{ not json"),
            Err(SimulatorError::Config(_))
        ));
    }
}

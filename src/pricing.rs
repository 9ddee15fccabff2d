use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::quote::{compute_quote, LoanQuote};
use crate::types::ProductRates;

/// approval odds shown to members without a credit score
pub const UNSCORED_APPROVAL_PROBABILITY: u8 = 75;

/// purpose declared on a loan request; sets the base monthly rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LoanPurpose {
    #[default]
    WorkingCapital,
    Expansion,
    Equipment,
    Marketing,
    Renovation,
    Other,
}

impl LoanPurpose {
    pub const ALL: [LoanPurpose; 6] = [
        LoanPurpose::WorkingCapital,
        LoanPurpose::Expansion,
        LoanPurpose::Equipment,
        LoanPurpose::Marketing,
        LoanPurpose::Renovation,
        LoanPurpose::Other,
    ];

    /// monthly rate before the risk adjustment
    pub fn base_monthly_rate(&self) -> Rate {
        let bps = match self {
            LoanPurpose::WorkingCapital => 250,
            LoanPurpose::Expansion => 280,
            LoanPurpose::Equipment => 230,
            LoanPurpose::Marketing => 320,
            LoanPurpose::Renovation => 270,
            LoanPurpose::Other => 350,
        };
        Rate::from_bps(bps)
    }
}

/// credit-score band of the requester
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Excellent,
    Good,
    Fair,
    Poor,
    VeryPoor,
}

impl RiskLevel {
    /// factor applied to the purpose's base rate
    pub fn rate_multiplier(&self) -> Decimal {
        match self {
            RiskLevel::Excellent => dec!(0.8),
            RiskLevel::Good => dec!(0.9),
            RiskLevel::Fair => Decimal::ONE,
            RiskLevel::Poor => dec!(1.2),
            RiskLevel::VeryPoor => dec!(1.5),
        }
    }

    /// approval odds in percent
    pub fn approval_probability(&self) -> u8 {
        match self {
            RiskLevel::Excellent => 95,
            RiskLevel::Good => 85,
            RiskLevel::Fair => 70,
            RiskLevel::Poor => 45,
            RiskLevel::VeryPoor => 20,
        }
    }
}

/// purpose and (optional) risk band used to price a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CreditProfile {
    pub purpose: LoanPurpose,
    /// `None` for members without a credit score
    pub risk_level: Option<RiskLevel>,
}

impl CreditProfile {
    pub fn new(purpose: LoanPurpose, risk_level: Option<RiskLevel>) -> Self {
        Self {
            purpose,
            risk_level,
        }
    }

    /// base rate for the purpose, scaled by the risk band when there is one
    pub fn monthly_rate(&self) -> Rate {
        let base = self.purpose.base_monthly_rate().as_decimal();
        let multiplier = self
            .risk_level
            .map(|risk| risk.rate_multiplier())
            .unwrap_or(Decimal::ONE);
        Rate::from_decimal(base * multiplier)
    }

    /// `base` with the interest rate replaced by this profile's rate.
    /// Fee rates are kept.
    pub fn rates(&self, base: &ProductRates) -> ProductRates {
        ProductRates {
            annual_interest_rate: Rate::from_decimal(self.monthly_rate().as_decimal() * dec!(12)),
            ..*base
        }
    }

    pub fn approval_probability(&self) -> u8 {
        self.risk_level
            .map(|risk| risk.approval_probability())
            .unwrap_or(UNSCORED_APPROVAL_PROBABILITY)
    }
}

/// quote priced for a credit profile instead of the flat product rate
pub fn quote_for_profile(
    principal: Money,
    installment_count: u32,
    base: &ProductRates,
    profile: &CreditProfile,
) -> LoanQuote {
    compute_quote(principal, installment_count, &profile.rates(base))
}

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::decimal::{Money, Rate};
use crate::payments::calculate_installment;
use crate::types::{LoanQuoteInput, ProductRates};

/// quote summary for a loan request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LoanQuote {
    /// inputs were well formed and every figure could be computed
    pub valid: bool,
    pub principal: Money,
    pub installment_count: u32,
    pub monthly_rate: Rate,
    pub monthly_payment: Money,
    pub total_interest: Money,
    pub platform_fee: Money,
    pub reserve_contribution: Money,
    pub total_repayment: Money,
}

impl LoanQuote {
    /// null quote, every figure zero
    pub fn invalid() -> Self {
        Self::default()
    }

    /// one-time charges added on top of the installments
    pub fn one_time_charges(&self) -> Money {
        self.platform_fee + self.reserve_contribution
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// pretty json, or an empty object if serialization fails
    pub fn json(&self) -> String {
        self.to_json_pretty().unwrap_or_else(|_| "{}".to_string())
    }
}

impl From<LoanQuoteInput> for LoanQuote {
    fn from(input: LoanQuoteInput) -> Self {
        compute_quote(input.principal, input.installment_count, &input.rates)
    }
}

/// compute the quote for `principal` repaid over `installment_count` months.
///
/// Never fails: malformed or out-of-range input gives [`LoanQuote::invalid`],
/// which the form renders as placeholders.
pub fn compute_quote(principal: Money, installment_count: u32, rates: &ProductRates) -> LoanQuote {
    match try_compute(principal, installment_count, rates) {
        Some(quote) => quote,
        None => {
            debug!(%principal, installment_count, "quote inputs rejected");
            LoanQuote::invalid()
        }
    }
}

/// quote straight from form text, e.g. `quote_from_form("10000", "12", ..)`
pub fn quote_from_form(amount: &str, installments: &str, rates: &ProductRates) -> LoanQuote {
    let principal = Money::parse_form(amount);
    let count = installments.trim().parse::<u32>().ok();

    match (principal, count) {
        (Some(principal), Some(count)) => compute_quote(principal, count, rates),
        _ => LoanQuote::invalid(),
    }
}

fn try_compute(principal: Money, installment_count: u32, rates: &ProductRates) -> Option<LoanQuote> {
    let monthly_payment =
        calculate_installment(principal, rates.annual_interest_rate, installment_count)?;

    let total_interest = monthly_payment
        .checked_mul(Decimal::from(installment_count))?
        .checked_sub(principal)?;
    let platform_fee = principal.checked_mul(rates.platform_fee_rate.as_decimal())?;
    let reserve_contribution = principal.checked_mul(rates.reserve_fee_rate.as_decimal())?;
    let total_repayment = principal
        .checked_add(total_interest)?
        .checked_add(platform_fee)?
        .checked_add(reserve_contribution)?;

    Some(LoanQuote {
        valid: true,
        principal,
        installment_count,
        monthly_rate: rates.annual_interest_rate.monthly_rate(),
        monthly_payment,
        total_interest,
        platform_fee,
        reserve_contribution,
        total_repayment,
    })
}

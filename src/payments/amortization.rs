use chrono::{Datelike, Months, NaiveDate};
use hourglass_rs::SafeTimeProvider;
use rust_decimal::{Decimal, MathematicalOps, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate, MONEY_DP};
use crate::errors::{Result, SimulatorError};
use crate::types::{AmortizationSystem, ProductRates};

/// last day of month any due date may fall on
const MAX_DUE_DAY: u32 = 28;

/// one installment of an amortization schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledInstallment {
    pub number: u32,
    pub due_date: NaiveDate,
    pub beginning_balance: Money,
    pub payment: Money,
    pub interest: Money,
    pub principal: Money,
    pub ending_balance: Money,
}

/// amortization schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmortizationSchedule {
    pub principal: Money,
    pub annual_rate: Rate,
    pub installment_count: u32,
    pub system: AmortizationSystem,
    pub installments: Vec<ScheduledInstallment>,
    pub total_interest: Money,
    pub total_paid: Money,
}

impl AmortizationSchedule {
    /// generate the installment table with the first installment due on `first_due_date`
    pub fn generate(
        principal: Money,
        rates: &ProductRates,
        installment_count: u32,
        system: AmortizationSystem,
        first_due_date: NaiveDate,
    ) -> Result<Self> {
        if !principal.is_positive() {
            return Err(SimulatorError::CalculationError {
                message: format!("principal must be positive, got {}", principal),
            });
        }
        if installment_count == 0 {
            return Err(SimulatorError::CalculationError {
                message: "installment count must be positive".to_string(),
            });
        }

        let annual_rate = rates.annual_interest_rate;
        let installments = match system {
            AmortizationSystem::Price => {
                price_schedule(principal, annual_rate, installment_count, first_due_date)?
            }
            AmortizationSystem::Sac => {
                sac_schedule(principal, annual_rate, installment_count, first_due_date)?
            }
        };

        let total_interest = checked_total(installments.iter().map(|i| i.interest))
            .ok_or_else(|| overflow("total interest", principal, installment_count))?;
        let total_paid = checked_total(installments.iter().map(|i| i.payment))
            .ok_or_else(|| overflow("total paid", principal, installment_count))?;

        Ok(Self {
            principal,
            annual_rate,
            installment_count,
            system,
            installments,
            total_interest,
            total_paid,
        })
    }

    /// generate with the first installment due one month after the provider's current date
    pub fn generate_from(
        principal: Money,
        rates: &ProductRates,
        installment_count: u32,
        system: AmortizationSystem,
        time_provider: &SafeTimeProvider,
    ) -> Result<Self> {
        let today = time_provider.now().date_naive();
        let first_due = add_months(today, 1)?;
        Self::generate(principal, rates, installment_count, system, first_due)
    }

    /// get installment by its 1-based number
    pub fn get(&self, number: u32) -> Option<&ScheduledInstallment> {
        number
            .checked_sub(1)
            .and_then(|index| self.installments.get(index as usize))
    }

    /// balance left after the given installment has been paid
    pub fn balance_after(&self, number: u32) -> Money {
        if number == 0 {
            return self.principal;
        }
        self.get(number)
            .or_else(|| self.installments.last())
            .map(|i| i.ending_balance)
            .unwrap_or(self.principal)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// fixed periodic installment of an amortized loan.
///
/// `P * r(1+r)^n / ((1+r)^n - 1)` with `r` the nominal monthly rate, or
/// `P / n` when the rate is zero. Rounded up to the money precision so that
/// `n` installments always cover the principal. `None` when the inputs are
/// out of range or the arithmetic overflows.
pub fn calculate_installment(principal: Money, annual_rate: Rate, installments: u32) -> Option<Money> {
    if installments == 0 || !principal.is_positive() || annual_rate.is_negative() {
        return None;
    }

    let p = principal.as_decimal();
    let n = Decimal::from(installments);
    let r = annual_rate.monthly_rate().as_decimal();

    let exact = if r.is_zero() {
        p.checked_div(n)?
    } else {
        let compound = (Decimal::ONE + r).checked_powu(u64::from(installments))?;
        let denominator = compound.checked_sub(Decimal::ONE)?;
        if denominator.is_zero() {
            // rate below decimal precision over this term
            p.checked_div(n)?
        } else {
            p.checked_mul(r)?.checked_mul(compound)?.checked_div(denominator)?
        }
    };

    Some(Money::from_decimal(
        exact.round_dp_with_strategy(MONEY_DP, RoundingStrategy::ToPositiveInfinity),
    ))
}

/// equal installments, the last one closing the residual balance
fn price_schedule(
    principal: Money,
    annual_rate: Rate,
    installment_count: u32,
    first_due_date: NaiveDate,
) -> Result<Vec<ScheduledInstallment>> {
    let monthly_rate = annual_rate.monthly_rate().as_decimal();
    let payment = calculate_installment(principal, annual_rate, installment_count)
        .ok_or_else(|| overflow("installment", principal, installment_count))?;

    let mut installments = Vec::with_capacity(installment_count as usize);
    let mut balance = principal;

    for number in 1..=installment_count {
        let row = price_row(balance, payment, monthly_rate, number == installment_count)
            .ok_or_else(|| overflow("installment", principal, installment_count))?;
        let (payment_amount, interest, principal_portion, ending_balance) = row;

        installments.push(ScheduledInstallment {
            number,
            due_date: add_months(first_due_date, number - 1)?,
            beginning_balance: balance,
            payment: payment_amount,
            interest,
            principal: principal_portion,
            ending_balance,
        });

        balance = ending_balance;
    }

    Ok(installments)
}

/// (payment, interest, principal, ending balance) of one price installment
fn price_row(
    balance: Money,
    payment: Money,
    monthly_rate: Decimal,
    is_last: bool,
) -> Option<(Money, Money, Money, Money)> {
    let interest = balance.checked_mul(monthly_rate)?;
    let (payment_amount, principal_portion) = if is_last {
        (balance.checked_add(interest)?, balance)
    } else {
        (payment, payment.checked_sub(interest)?.min(balance))
    };
    let ending_balance = balance.checked_sub(principal_portion)?.max(Money::ZERO);
    Some((payment_amount, interest, principal_portion, ending_balance))
}

/// constant principal portion, interest on the declining balance
fn sac_schedule(
    principal: Money,
    annual_rate: Rate,
    installment_count: u32,
    first_due_date: NaiveDate,
) -> Result<Vec<ScheduledInstallment>> {
    let monthly_rate = annual_rate.monthly_rate().as_decimal();
    let amortization = principal / Decimal::from(installment_count);

    let mut installments = Vec::with_capacity(installment_count as usize);
    let mut balance = principal;

    for number in 1..=installment_count {
        let principal_portion = if number == installment_count {
            balance
        } else {
            amortization.min(balance)
        };
        let row = balance.checked_mul(monthly_rate).and_then(|interest| {
            let payment = principal_portion.checked_add(interest)?;
            let ending_balance = balance.checked_sub(principal_portion)?.max(Money::ZERO);
            Some((payment, interest, ending_balance))
        });
        let (payment, interest, ending_balance) =
            row.ok_or_else(|| overflow("installment", principal, installment_count))?;

        installments.push(ScheduledInstallment {
            number,
            due_date: add_months(first_due_date, number - 1)?,
            beginning_balance: balance,
            payment,
            interest,
            principal: principal_portion,
            ending_balance,
        });

        balance = ending_balance;
    }

    Ok(installments)
}

fn checked_total(amounts: impl Iterator<Item = Money>) -> Option<Money> {
    amounts.fold(Some(Money::ZERO), |acc, amount| acc?.checked_add(amount))
}

fn overflow(what: &str, principal: Money, installment_count: u32) -> SimulatorError {
    SimulatorError::CalculationError {
        message: format!(
            "{} overflow for principal {} over {} months",
            what, principal, installment_count
        ),
    }
}

/// step whole months from `date`, pinning the day to at most the 28th
fn add_months(date: NaiveDate, months: u32) -> Result<NaiveDate> {
    date.with_day(date.day().min(MAX_DUE_DAY))
        .and_then(|anchor| anchor.checked_add_months(Months::new(months)))
        .ok_or_else(|| SimulatorError::CalculationError {
            message: format!("due date out of range: {} + {} months", date, months),
        })
}

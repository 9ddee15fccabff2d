use rust_decimal::{Decimal, MathematicalOps};
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::payments::calculate_installment;
use crate::types::LoanStatus;

/// an issued loan as seen by the withdrawal warning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutstandingLoan {
    pub principal: Money,
    pub annual_rate: Rate,
    pub installment_count: u32,
    pub installments_paid: u32,
    pub status: LoanStatus,
}

impl OutstandingLoan {
    pub fn remaining_balance(&self) -> Money {
        remaining_balance(
            self.principal,
            self.annual_rate,
            self.installment_count,
            self.installments_paid,
        )
    }
}

/// amortized balance still owed after `installments_paid` equal installments.
///
/// `B = P(1+r)^k - A((1+r)^k - 1)/r`, or `P - A*k` at a zero rate, floored at
/// zero. Returns the principal when no installment can be computed.
pub fn remaining_balance(
    principal: Money,
    annual_rate: Rate,
    installment_count: u32,
    installments_paid: u32,
) -> Money {
    if installments_paid == 0 {
        return principal;
    }
    if installments_paid >= installment_count {
        return Money::ZERO;
    }

    let payment = match calculate_installment(principal, annual_rate, installment_count) {
        Some(payment) => payment,
        None => return principal,
    };

    let p = principal.as_decimal();
    let a = payment.as_decimal();
    let k = u64::from(installments_paid);
    let r = annual_rate.monthly_rate().as_decimal();

    let balance = if r.is_zero() {
        a.checked_mul(Decimal::from(k))
            .and_then(|paid| p.checked_sub(paid))
    } else {
        (Decimal::ONE + r).checked_powu(k).and_then(|growth| {
            let grown = p.checked_mul(growth)?;
            let paid = a.checked_mul(growth - Decimal::ONE)?.checked_div(r)?;
            grown.checked_sub(paid)
        })
    };

    balance
        .map(|b| Money::from_decimal(b).max(Money::ZERO))
        .unwrap_or(principal)
}

/// total still owed across open loans
pub fn outstanding_total(loans: &[OutstandingLoan]) -> Money {
    loans
        .iter()
        .filter(|loan| loan.status.is_open())
        .map(OutstandingLoan::remaining_balance)
        .sum()
}

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{LoanLimits, DEFAULT_CURRENCY_SYMBOL, SUGGESTED_INSTALLMENT_OPTIONS};
use crate::decimal::Money;
use crate::messages;
use crate::types::CurrentUser;

/// reason a loan request was stopped before reaching the issuance service.
///
/// Displays as the user message, in the default currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rejection {
    InvalidAmount,
    BelowMinimum {
        minimum: Money,
    },
    AboveMaximum {
        maximum: Money,
    },
    InvalidInstallments {
        min: u32,
        max: u32,
    },
    InsufficientPoolLiquidity {
        requested: Money,
        /// `None` when the pool status could not be loaded
        available: Option<Money>,
    },
    UnresolvedUser,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&messages::rejection_message(self, DEFAULT_CURRENCY_SYMBOL))
    }
}

impl std::error::Error for Rejection {}

/// result of checking a loan request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationOutcome {
    Ok,
    Rejected(Rejection),
}

impl ValidationOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, ValidationOutcome::Ok)
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            ValidationOutcome::Ok => None,
            ValidationOutcome::Rejected(rejection) => Some(rejection),
        }
    }

    pub fn into_result(self) -> std::result::Result<(), Rejection> {
        match self {
            ValidationOutcome::Ok => Ok(()),
            ValidationOutcome::Rejected(rejection) => Err(rejection),
        }
    }
}

impl From<std::result::Result<(), Rejection>> for ValidationOutcome {
    fn from(result: std::result::Result<(), Rejection>) -> Self {
        match result {
            Ok(()) => ValidationOutcome::Ok,
            Err(rejection) => ValidationOutcome::Rejected(rejection),
        }
    }
}

/// installment counts offered by the request form
pub fn suggested_installment_options() -> &'static [u32] {
    &SUGGESTED_INSTALLMENT_OPTIONS
}

/// check a request as typed into the form.
///
/// Stops at the first failing rule, in this order: amount parses, minimum,
/// maximum, installment range, pool liquidity, requester identity.
pub fn validate_loan_request(
    amount: &str,
    installments: &str,
    pool_available: Option<Money>,
    requester: Option<&CurrentUser>,
    limits: &LoanLimits,
) -> ValidationOutcome {
    let principal = Money::parse_form(amount);
    let count = installments.trim().parse::<i64>().ok();
    check(principal, count, pool_available, requester, limits).into()
}

/// check a request whose values are already decoded
pub fn validate_quote_input(
    principal: Money,
    installment_count: u32,
    pool_available: Option<Money>,
    requester: Option<&CurrentUser>,
    limits: &LoanLimits,
) -> ValidationOutcome {
    check(
        Some(principal),
        Some(i64::from(installment_count)),
        pool_available,
        requester,
        limits,
    )
    .into()
}

fn check(
    principal: Option<Money>,
    installment_count: Option<i64>,
    pool_available: Option<Money>,
    requester: Option<&CurrentUser>,
    limits: &LoanLimits,
) -> std::result::Result<(), Rejection> {
    let principal = principal
        .filter(|p| p.is_positive())
        .ok_or(Rejection::InvalidAmount)?;

    if principal < limits.min_loan {
        return Err(Rejection::BelowMinimum {
            minimum: limits.min_loan,
        });
    }

    if principal > limits.max_loan {
        return Err(Rejection::AboveMaximum {
            maximum: limits.max_loan,
        });
    }

    let range = i64::from(limits.min_installments)..=i64::from(limits.max_installments);
    if !installment_count.is_some_and(|n| range.contains(&n)) {
        return Err(Rejection::InvalidInstallments {
            min: limits.min_installments,
            max: limits.max_installments,
        });
    }

    match pool_available {
        Some(available) if principal <= available => {}
        available => {
            debug!(%principal, ?available, "request exceeds pool liquidity");
            return Err(Rejection::InsufficientPoolLiquidity {
                requested: principal,
                available,
            });
        }
    }

    if requester.is_none() {
        return Err(Rejection::UnresolvedUser);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn user() -> CurrentUser {
        CurrentUser {
            id: 7,
            name: Some("Ana".to_string()),
        }
    }

    fn rich_pool() -> Option<Money> {
        Some(Money::from_major(1_000_000))
    }

    fn validate(amount: &str, installments: &str) -> ValidationOutcome {
        validate_loan_request(amount, installments, rich_pool(), Some(&user()), &LoanLimits::default())
    }

    fn rejected(outcome: ValidationOutcome) -> Rejection {
        outcome.rejection().cloned().expect("expected a rejection")
    }

    #[test]
    fn test_valid_request() {
        assert_eq!(validate("10000", "12"), ValidationOutcome::Ok);
    }

    #[test]
    fn test_invalid_amount() {
        for amount in ["", "abc", "0", "-100", "  "] {
            assert_eq!(rejected(validate(amount, "12")), Rejection::InvalidAmount, "{:?}", amount);
        }
    }

    #[test]
    fn test_amount_bounds() {
        assert!(validate("500", "12").is_ok());
        assert!(validate("50000", "12").is_ok());

        assert_eq!(
            rejected(validate("499", "12")),
            Rejection::BelowMinimum {
                minimum: Money::from_major(500)
            }
        );
        assert_eq!(
            rejected(validate("499.99", "12")),
            Rejection::BelowMinimum {
                minimum: Money::from_major(500)
            }
        );
        assert_eq!(
            rejected(validate("50001", "12")),
            Rejection::AboveMaximum {
                maximum: Money::from_major(50_000)
            }
        );
    }

    #[test]
    fn test_above_maximum_wins_over_bad_installments() {
        assert_eq!(
            rejected(validate("60000", "999")),
            Rejection::AboveMaximum {
                maximum: Money::from_major(50_000)
            }
        );
    }

    #[test]
    fn test_installment_bounds() {
        assert!(validate("1000", "6").is_ok());
        assert!(validate("1000", "60").is_ok());

        let expected = Rejection::InvalidInstallments { min: 6, max: 60 };
        for installments in ["5", "61", "0", "-6", "12.5", "twelve", ""] {
            assert_eq!(rejected(validate("1000", installments)), expected, "{:?}", installments);
        }
    }

    #[test]
    fn test_insufficient_pool_liquidity() {
        let outcome = validate_loan_request(
            "6000",
            "12",
            Some(Money::from_major(5_000)),
            Some(&user()),
            &LoanLimits::default(),
        );
        assert_eq!(
            rejected(outcome),
            Rejection::InsufficientPoolLiquidity {
                requested: Money::from_major(6_000),
                available: Some(Money::from_major(5_000)),
            }
        );

        // exactly the available balance is fine
        let outcome = validate_loan_request(
            "5000",
            "12",
            Some(Money::from_major(5_000)),
            Some(&user()),
            &LoanLimits::default(),
        );
        assert!(outcome.is_ok());
    }

    #[test]
    fn test_unknown_pool_is_rejected() {
        let outcome =
            validate_loan_request("1000", "12", None, Some(&user()), &LoanLimits::default());
        assert_eq!(
            rejected(outcome),
            Rejection::InsufficientPoolLiquidity {
                requested: Money::from_major(1_000),
                available: None,
            }
        );
    }

    #[test]
    fn test_unresolved_user_checked_last() {
        let outcome = validate_loan_request("1000", "12", rich_pool(), None, &LoanLimits::default());
        assert_eq!(rejected(outcome), Rejection::UnresolvedUser);

        // earlier rules win
        let outcome = validate_loan_request("100", "12", rich_pool(), None, &LoanLimits::default());
        assert!(matches!(rejected(outcome), Rejection::BelowMinimum { .. }));
    }

    #[test]
    fn test_typed_validation() {
        let limits = LoanLimits::default();
        let outcome = validate_quote_input(
            Money::from_decimal(dec!(750.25)),
            24,
            rich_pool(),
            Some(&user()),
            &limits,
        );
        assert!(outcome.is_ok());
        assert!(outcome.into_result().is_ok());

        let outcome = validate_quote_input(Money::from_major(750), 3, rich_pool(), Some(&user()), &limits);
        assert_eq!(
            outcome.into_result(),
            Err(Rejection::InvalidInstallments { min: 6, max: 60 })
        );
    }

    #[test]
    fn test_suggested_options() {
        assert_eq!(suggested_installment_options(), &[6, 12, 24, 36, 48, 60]);
        let limits = LoanLimits::default();
        for option in suggested_installment_options() {
            assert!(validate_quote_input(Money::from_major(1_000), *option, rich_pool(), Some(&user()), &limits).is_ok());
        }
    }
}

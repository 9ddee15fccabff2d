use chrono::{DateTime, Duration, Utc};
use hourglass_rs::SafeTimeProvider;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::decimal::{Money, Rate};

/// days in the accrual year (actual/365)
const YEAR_BASIS: u32 = 365;

/// interest accrued over a whole number of days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterestAccrual {
    pub days: u32,
    pub balance: Money,
    pub interest: Money,
    /// accrual cursor after this accrual; whole days only
    pub accrued_through: DateTime<Utc>,
}

/// simple interest on `balance` for `days` days, rounded to cents half-even.
/// `None` on overflow.
pub fn accrue_daily(balance: Money, annual_rate: Rate, days: u32) -> Option<Money> {
    if days == 0 || !balance.is_positive() {
        return Some(Money::ZERO);
    }
    let interest = balance
        .as_decimal()
        .checked_mul(annual_rate.as_decimal())?
        .checked_mul(Decimal::from(days))?
        .checked_div(Decimal::from(YEAR_BASIS))?;
    Some(Money::from_decimal(
        interest.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven),
    ))
}

/// accrues interest on outstanding balances between job runs
pub struct AccrualEngine {
    pub annual_rate: Rate,
}

impl AccrualEngine {
    pub fn new(annual_rate: Rate) -> Self {
        Self { annual_rate }
    }

    /// whole days elapsed since `last_accrual`, never negative
    pub fn elapsed_days(&self, last_accrual: DateTime<Utc>, now: DateTime<Utc>) -> u32 {
        u32::try_from((now - last_accrual).num_days().max(0)).unwrap_or(u32::MAX)
    }

    /// accrue from `last_accrual` up to the provider's current time.
    ///
    /// Partial days are left for the next run; the returned cursor advances
    /// by whole days only.
    pub fn accrue(
        &self,
        balance: Money,
        last_accrual: DateTime<Utc>,
        time_provider: &SafeTimeProvider,
    ) -> Option<InterestAccrual> {
        let days = self.elapsed_days(last_accrual, time_provider.now());
        if days == 0 {
            return None;
        }

        let interest = match accrue_daily(balance, self.annual_rate, days) {
            Some(interest) => interest,
            None => {
                warn!(%balance, days, "interest accrual overflowed");
                return None;
            }
        };
        if interest.is_zero() {
            return None;
        }

        debug!(%balance, days, %interest, "interest accrued");

        Some(InterestAccrual {
            days,
            balance,
            interest,
            accrued_through: last_accrual + Duration::days(i64::from(days)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use hourglass_rs::TimeSource;
    use rust_decimal_macros::dec;

    #[test]
    fn test_simple_daily_interest() {
        let rate = Rate::from_percentage(15);
        assert_eq!(
            accrue_daily(Money::from_major(10_000), rate, 30),
            Some(Money::from_decimal(dec!(123.29)))
        );
        assert_eq!(
            accrue_daily(Money::from_major(10_000), rate, 365),
            Some(Money::from_major(1_500))
        );
        assert_eq!(accrue_daily(Money::from_major(10_000), rate, 0), Some(Money::ZERO));
        assert_eq!(accrue_daily(Money::ZERO, rate, 30), Some(Money::ZERO));
    }

    #[test]
    fn test_accrual_overflow() {
        let huge = Money::from_decimal(Decimal::MAX);
        assert_eq!(accrue_daily(huge, Rate::from_percentage(15), 365), None);

        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let time = SafeTimeProvider::new(TimeSource::Test(start + Duration::days(365)));
        let engine = AccrualEngine::new(Rate::from_percentage(15));
        assert!(engine.accrue(huge, start, &time).is_none());
    }

    #[test]
    fn test_accrual_with_time_manipulation() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 6, 0, 0).unwrap();
        let time = SafeTimeProvider::new(TimeSource::Test(start));
        let controller = time.test_control().unwrap();
        let engine = AccrualEngine::new(Rate::from_percentage(15));
        let balance = Money::from_major(10_000);

        // same day, nothing to accrue
        assert!(engine.accrue(balance, start, &time).is_none());

        controller.advance(Duration::hours(36));
        let accrual = engine.accrue(balance, start, &time).unwrap();
        assert_eq!(accrual.days, 1);
        assert_eq!(accrual.interest, Money::from_decimal(dec!(4.11)));
        assert_eq!(accrual.accrued_through, start + Duration::days(1));
    }

    #[test]
    fn test_clock_behind_cursor() {
        let engine = AccrualEngine::new(Rate::from_percentage(15));
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(engine.elapsed_days(now + Duration::days(3), now), 0);
    }
}

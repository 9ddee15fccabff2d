use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use tracing::debug;

use crate::decimal::{Money, Rate};
use crate::types::{PoolCapacitySnapshot, QueuePromotion, QueuedLoan};

impl PoolCapacitySnapshot {
    /// derive a snapshot from pool totals
    pub fn from_balances(total_balance: Money, lent_balance: Money, total_investors: u32) -> Self {
        let mut snapshot = Self {
            total_balance,
            available_balance: (total_balance - lent_balance).max(Money::ZERO),
            lent_balance,
            utilization_percentage: Decimal::ZERO,
            total_investors,
        };
        snapshot.utilization_percentage = (snapshot.utilization().as_percentage()).round_dp(2);
        snapshot
    }

    /// whether the pool can lend `amount` right now
    pub fn can_fund(&self, amount: Money) -> bool {
        amount <= self.available_balance
    }

    /// share of the pool currently lent out, zero for an empty pool
    pub fn utilization(&self) -> Rate {
        if !self.total_balance.is_positive() {
            return Rate::ZERO;
        }
        Rate::from_decimal(self.lent_balance.as_decimal() / self.total_balance.as_decimal())
    }

    /// most that can still be committed before `threshold` of the pool is lent out
    pub fn headroom(&self, threshold: Rate) -> Money {
        let cap = self.total_balance.apply_rate(threshold);
        (cap - self.lent_balance).max(Money::ZERO)
    }

    /// whether lending `amount` keeps total commitments within `threshold`
    /// of the pool; requests above it wait in the backend queue
    pub fn within_approval_threshold(&self, amount: Money, threshold: Rate) -> bool {
        if !self.total_balance.is_positive() {
            return false;
        }
        self.lent_balance + amount <= self.total_balance.apply_rate(threshold)
    }

    /// whether the backend would queue a loan of `amount` rather than approve it
    pub fn should_enqueue(&self, amount: Money, threshold: Rate) -> bool {
        !self.within_approval_threshold(amount, threshold)
    }

    /// promote queued loans in queue order while commitments stay within
    /// `threshold` of the pool. Stops at the first loan that does not fit so
    /// later, smaller loans never jump the queue.
    pub fn promote_queued(&self, queue: &[QueuedLoan], threshold: Rate) -> QueuePromotion {
        let mut promotion = QueuePromotion {
            promoted: Vec::new(),
            committed: self.lent_balance,
        };
        if !self.total_balance.is_positive() {
            return promotion;
        }

        let cap = self.total_balance.apply_rate(threshold);
        let mut ordered = queue.to_vec();
        ordered.sort_by_key(|loan| (loan.queue_position, loan.queued_at));

        for loan in ordered {
            match promotion.committed.checked_add(loan.principal) {
                Some(committed) if committed <= cap => {
                    promotion.committed = committed;
                    promotion.promoted.push(loan.loan_id);
                }
                _ => break,
            }
        }

        debug!(
            promoted = promotion.promoted.len(),
            committed = %promotion.committed,
            "loan queue processed"
        );
        promotion
    }

    /// utilization as shown on the dashboard, 0-100
    pub fn utilization_display(&self) -> Decimal {
        self.utilization_percentage.clamp(Decimal::ZERO, dec!(100))
    }
}

/// position handed to the next loan entering the queue
pub fn next_queue_position(queue: &[QueuedLoan]) -> u32 {
    queue
        .iter()
        .map(|loan| loan.queue_position)
        .max()
        .unwrap_or(0)
        .saturating_add(1)
}

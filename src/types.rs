use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::{Money, Rate};

/// identifier of a pool member as known to the backend
pub type UserId = u64;

/// identifier of a loan request submission
pub type RequestId = Uuid;

/// fixed product rates applied to every quote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRates {
    /// nominal annual rate, converted to monthly by dividing by 12
    pub annual_interest_rate: Rate,
    /// one-time fee on principal kept by the platform
    pub platform_fee_rate: Rate,
    /// one-time contribution on principal to the pool reserve
    pub reserve_fee_rate: Rate,
}

/// raw inputs of a quote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanQuoteInput {
    pub principal: Money,
    pub installment_count: u32,
    pub rates: ProductRates,
}

/// amortization system used to break a loan into installments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AmortizationSystem {
    /// equal installments (french / price table)
    #[default]
    Price,
    /// constant principal portion, declining installments
    Sac,
}

/// read-only snapshot of pool liquidity from the pool status provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PoolCapacitySnapshot {
    pub total_balance: Money,
    pub available_balance: Money,
    pub lent_balance: Money,
    /// 0-100, informational only
    pub utilization_percentage: rust_decimal::Decimal,
    pub total_investors: u32,
}

/// the signed-in pool member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub name: Option<String>,
}

/// loan request forwarded to the issuance service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanRequest {
    pub request_id: RequestId,
    pub principal: Money,
    pub installment_count: u32,
    pub requester_id: UserId,
}

/// backend loan status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanStatus {
    /// waiting for the pool to free capacity
    Queued,
    /// waiting for approval
    Pending,
    /// approved and disbursed
    Active,
    Rejected,
    Paid,
}

impl LoanStatus {
    /// loans that still owe installments
    pub fn is_open(&self) -> bool {
        matches!(self, LoanStatus::Pending | LoanStatus::Active)
    }
}

/// authoritative loan record returned by the issuance service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanRecord {
    pub loan_id: u64,
    pub principal: Money,
    pub installment_count: u32,
    pub status: LoanStatus,
    /// requester wallet balance after disbursement, when the backend reports it
    pub wallet_balance: Option<Money>,
}

/// loan waiting in the pool queue for capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedLoan {
    pub loan_id: u64,
    pub principal: Money,
    /// 1-based, lower is served first
    pub queue_position: u32,
    /// tie-breaker between equal positions
    pub queued_at: DateTime<Utc>,
}

/// result of a queue pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuePromotion {
    /// loans moved to pending, in service order
    pub promoted: Vec<u64>,
    /// commitments after the promoted loans
    pub committed: Money,
}

impl QueuePromotion {
    pub fn is_empty(&self) -> bool {
        self.promoted.is_empty()
    }
}

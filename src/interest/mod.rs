pub mod accrual;
pub mod outstanding;

pub use accrual::{accrue_daily, AccrualEngine, InterestAccrual};
pub use outstanding::{outstanding_total, remaining_balance, OutstandingLoan};

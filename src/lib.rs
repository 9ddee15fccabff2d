pub mod config;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod interest;
pub mod messages;
pub mod payments;
pub mod pool;
pub mod pricing;
pub mod quote;
pub mod request;
pub mod types;
pub mod validation;

// re-export key types
pub use config::{
    LoanLimits, ProductConfig, DEFAULT_CURRENCY_SYMBOL, SUGGESTED_INSTALLMENT_OPTIONS,
};
pub use decimal::{Money, Rate};
pub use errors::{Result, SimulatorError};
pub use events::{Event, EventStore};
pub use interest::{
    accrue_daily, outstanding_total, remaining_balance, AccrualEngine, InterestAccrual,
    OutstandingLoan,
};
pub use messages::{Feedback, Tone};
pub use payments::{calculate_installment, AmortizationSchedule, ScheduledInstallment};
pub use pool::next_queue_position;
pub use pricing::{quote_for_profile, CreditProfile, LoanPurpose, RiskLevel};
pub use quote::{compute_quote, quote_from_form, LoanQuote};
pub use request::{
    CurrentUserResolver, IssuanceFailure, LoanIssuer, LoanRequestFlow, PoolStatusProvider,
    RemoteFailureKind, RequestState,
};
pub use types::{
    AmortizationSystem, CurrentUser, LoanQuoteInput, LoanRecord, LoanRequest, LoanStatus,
    PoolCapacitySnapshot, ProductRates, QueuePromotion, QueuedLoan, RequestId, UserId,
};
pub use validation::{
    suggested_installment_options, validate_loan_request, validate_quote_input, Rejection,
    ValidationOutcome,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;

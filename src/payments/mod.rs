pub mod amortization;

pub use amortization::{calculate_installment, AmortizationSchedule, ScheduledInstallment};

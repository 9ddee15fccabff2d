/// request flow - validate against the pool and submit through a stub issuer
use chrono::{TimeZone, Utc};
use shiftbox_loan_sim::{
    CurrentUser, CurrentUserResolver, IssuanceFailure, LoanIssuer, LoanRecord, LoanRequest,
    LoanRequestFlow, LoanStatus, Money, PoolCapacitySnapshot, PoolStatusProvider, ProductConfig,
    RemoteFailureKind, Result, SafeTimeProvider, TimeSource,
};
use tracing_subscriber::EnvFilter;

struct DemoPool;

impl PoolStatusProvider for DemoPool {
    fn pool_status(&self) -> Result<PoolCapacitySnapshot> {
        Ok(PoolCapacitySnapshot::from_balances(
            Money::from_major(40_000),
            Money::from_major(25_000),
            12,
        ))
    }
}

struct DemoUser;

impl CurrentUserResolver for DemoUser {
    fn current_user(&self) -> Option<CurrentUser> {
        Some(CurrentUser {
            id: 1,
            name: Some("demo".to_string()),
        })
    }
}

/// approves up to R$ 10,000 and answers 409 above that
struct DemoIssuer;

impl LoanIssuer for DemoIssuer {
    fn submit_loan_request(
        &self,
        request: &LoanRequest,
    ) -> std::result::Result<LoanRecord, IssuanceFailure> {
        if request.principal > Money::from_major(10_000) {
            return Err(IssuanceFailure::new(RemoteFailureKind::from_status(409), None));
        }
        Ok(LoanRecord {
            loan_id: 101,
            principal: request.principal,
            installment_count: request.installment_count,
            status: LoanStatus::Active,
            wallet_balance: Some(request.principal),
        })
    }
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== request flow example ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 5, 2, 9, 0, 0).unwrap(),
    ));
    let mut flow = LoanRequestFlow::new(ProductConfig::shiftbox(), DemoPool, DemoUser, time);

    let pool = flow.load()?;
    println!("pool available: {}", pool.available_balance);

    for (amount, installments) in [("300", "12"), ("20000", "12"), ("12000", "24"), ("8000", "12")] {
        let quote = flow.quote(amount, installments);
        if flow.would_queue(amount) == Some(true) {
            println!("{} would be queued: pool past its approval threshold", amount);
        }
        let result = flow.submit_with(&DemoIssuer, amount, installments);
        let feedback = flow.feedback().map(|f| f.text.clone()).unwrap_or_default();
        println!(
            "{} x {}: quote valid={} -> {} ({})",
            amount,
            installments,
            quote.valid,
            if result.is_ok() { "approved" } else { "not approved" },
            feedback
        );
        if result.is_ok() {
            break;
        }
    }

    println!("\nevents:");
    for event in flow.take_events() {
        println!("{}", serde_json::to_string(&event)?);
    }

    Ok(())
}

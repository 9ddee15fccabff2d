use std::fmt;

use hourglass_rs::{SafeTimeProvider, TimeSource};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ProductConfig;
use crate::errors::{Result, SimulatorError};
use crate::events::{Event, EventStore};
use crate::messages::{self, Feedback};
use crate::quote::{compute_quote, quote_from_form, LoanQuote};
use crate::decimal::Money;
use crate::payments::AmortizationSchedule;
use crate::types::{
    CurrentUser, LoanRecord, LoanRequest, LoanStatus, PoolCapacitySnapshot, RequestId,
};
use crate::validation::{validate_loan_request, Rejection, ValidationOutcome};

/// source of pool liquidity snapshots
pub trait PoolStatusProvider {
    fn pool_status(&self) -> Result<PoolCapacitySnapshot>;
}

/// remote service that issues loans
pub trait LoanIssuer {
    fn submit_loan_request(
        &self,
        request: &LoanRequest,
    ) -> std::result::Result<LoanRecord, IssuanceFailure>;
}

/// resolves the signed-in user, if any
pub trait CurrentUserResolver {
    fn current_user(&self) -> Option<CurrentUser>;
}

/// transport-level category of a failed issuance call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteFailureKind {
    Network,
    Timeout,
    /// 4xx, usually with a business reason
    Rejected { status: u16 },
    /// 5xx
    Server { status: u16 },
}

impl RemoteFailureKind {
    /// classify an http status code
    pub fn from_status(status: u16) -> Self {
        if status >= 500 {
            RemoteFailureKind::Server { status }
        } else {
            RemoteFailureKind::Rejected { status }
        }
    }
}

impl fmt::Display for RemoteFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteFailureKind::Network => write!(f, "network error"),
            RemoteFailureKind::Timeout => write!(f, "timeout"),
            RemoteFailureKind::Rejected { status } => write!(f, "rejected ({})", status),
            RemoteFailureKind::Server { status } => write!(f, "server error ({})", status),
        }
    }
}

/// failed issuance as reported by the transport layer
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{kind}: {}", .message.as_deref().unwrap_or("no details"))]
pub struct IssuanceFailure {
    pub kind: RemoteFailureKind,
    /// backend-provided message, shown verbatim
    pub message: Option<String>,
}

impl IssuanceFailure {
    pub fn new(kind: RemoteFailureKind, message: Option<String>) -> Self {
        Self { kind, message }
    }
}

/// state of the request form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestState {
    Idle,
    Validating,
    Rejected(Rejection),
    Submitting(LoanRequest),
    Approved(LoanRecord),
    Failed(IssuanceFailure),
}

impl RequestState {
    /// whether the form accepts edits and a new submission
    pub fn is_editable(&self) -> bool {
        matches!(
            self,
            RequestState::Idle | RequestState::Rejected(_) | RequestState::Failed(_)
        )
    }

    pub fn in_flight(&self) -> Option<&LoanRequest> {
        match self {
            RequestState::Submitting(request) => Some(request),
            _ => None,
        }
    }
}

/// caller-side controller for a single loan request form
///
/// ```text
/// Idle -> Validating -> Rejected (editable)
///                    -> Submitting -> Approved
///                                  -> Failed (editable)
/// ```
///
/// Only one submission may be outstanding and a failed issuance is never
/// retried here; the user resubmits.
pub struct LoanRequestFlow<P, U> {
    config: ProductConfig,
    pool: P,
    users: U,
    time: SafeTimeProvider,
    pool_status: Option<PoolCapacitySnapshot>,
    state: RequestState,
    feedback: Option<Feedback>,
    events: EventStore,
}

impl<P, U> LoanRequestFlow<P, U>
where
    P: PoolStatusProvider,
    U: CurrentUserResolver,
{
    pub fn new(config: ProductConfig, pool: P, users: U, time: SafeTimeProvider) -> Self {
        Self {
            config,
            pool,
            users,
            time,
            pool_status: None,
            state: RequestState::Idle,
            feedback: None,
            events: EventStore::new(),
        }
    }

    /// flow stamped with the system clock
    pub fn with_system_time(config: ProductConfig, pool: P, users: U) -> Self {
        Self::new(config, pool, users, SafeTimeProvider::new(TimeSource::System))
    }

    /// query the pool before the form is shown
    pub fn load(&mut self) -> Result<PoolCapacitySnapshot> {
        match self.refresh_pool() {
            Ok(snapshot) => Ok(snapshot),
            Err(err) => {
                self.feedback = Some(Feedback::error(
                    "Could not load the pool status. Try again later.",
                ));
                Err(err)
            }
        }
    }

    /// live quote for the current form values; no state change
    pub fn quote(&self, amount: &str, installments: &str) -> LoanQuote {
        quote_from_form(amount, installments, &self.config.rates)
    }

    /// run the local checks without submitting
    pub fn validate(&self, amount: &str, installments: &str) -> ValidationOutcome {
        let requester = self.users.current_user();
        validate_loan_request(
            amount,
            installments,
            self.pool_status.map(|p| p.available_balance),
            requester.as_ref(),
            &self.config.limits,
        )
    }

    /// validate the form and, if it passes, move to `Submitting` and return
    /// the request to hand to the issuance service
    pub fn begin_submission(&mut self, amount: &str, installments: &str) -> Result<LoanRequest> {
        if let Some(request) = self.state.in_flight() {
            debug!(request_id = %request.request_id, "submission already in flight");
            return Err(SimulatorError::SubmissionInFlight);
        }

        self.state = RequestState::Validating;
        let requester = self.users.current_user();
        let outcome = validate_loan_request(
            amount,
            installments,
            self.pool_status.map(|p| p.available_balance),
            requester.as_ref(),
            &self.config.limits,
        );

        let rejection = match (outcome, requester) {
            (ValidationOutcome::Ok, Some(user)) => match parse_form(amount, installments) {
                Some((principal, installment_count)) => {
                    return Ok(self.start_submission(principal, installment_count, user));
                }
                None => Rejection::InvalidAmount,
            },
            (ValidationOutcome::Ok, None) => Rejection::UnresolvedUser,
            (ValidationOutcome::Rejected(rejection), _) => rejection,
        };

        info!(%rejection, "loan request rejected");
        self.feedback = Some(Feedback::error(messages::rejection_message(
            &rejection,
            &self.config.currency_symbol,
        )));
        self.events.emit(Event::RequestRejected {
            rejection: rejection.clone(),
            timestamp: self.time.now(),
        });
        self.state = RequestState::Rejected(rejection.clone());
        Err(SimulatorError::Rejected(rejection))
    }

    /// record the issuance result for the in-flight request
    pub fn complete_submission(
        &mut self,
        request_id: RequestId,
        result: std::result::Result<LoanRecord, IssuanceFailure>,
    ) -> Result<&RequestState> {
        let request = match &self.state {
            RequestState::Submitting(request) => request.clone(),
            _ => return Err(SimulatorError::NoSubmissionInFlight),
        };
        if request.request_id != request_id {
            return Err(SimulatorError::RequestMismatch {
                expected: request.request_id,
                received: request_id,
            });
        }

        match result {
            Ok(record) => {
                info!(
                    request_id = %request_id,
                    loan_id = record.loan_id,
                    principal = %record.principal,
                    "loan issued"
                );
                self.events.emit(Event::LoanIssued {
                    request_id,
                    loan_id: record.loan_id,
                    principal: record.principal,
                    timestamp: self.time.now(),
                });

                let quote = compute_quote(request.principal, request.installment_count, &self.config.rates);
                let text = messages::approval_message(&record, &quote, &self.config.currency_symbol);
                self.feedback = Some(if record.status == LoanStatus::Queued {
                    Feedback::warning(text)
                } else {
                    Feedback::success(text)
                });

                if let Err(err) = self.refresh_pool() {
                    warn!(error = %err, "pool refresh after issuance failed");
                }
                self.state = RequestState::Approved(record);
            }
            Err(failure) => {
                warn!(request_id = %request_id, %failure, "loan issuance failed");
                self.feedback = Some(Feedback::error(messages::issuance_failure_message(&failure)));
                self.events.emit(Event::SubmissionFailed {
                    request_id,
                    failure: failure.clone(),
                    timestamp: self.time.now(),
                });
                self.state = RequestState::Failed(failure);
            }
        }

        Ok(&self.state)
    }

    /// validate, issue and record in one call. The issuer is called at most once.
    pub fn submit_with<I: LoanIssuer>(
        &mut self,
        issuer: &I,
        amount: &str,
        installments: &str,
    ) -> Result<LoanRecord> {
        let request = self.begin_submission(amount, installments)?;
        let result = issuer.submit_loan_request(&request);

        self.complete_submission(request.request_id, result.clone())?;
        result.map_err(SimulatorError::Issuance)
    }

    /// whether `amount` would push pool commitments past the approval
    /// threshold, so the backend queues it instead of approving it.
    /// `None` until the pool status is known or while the amount is unparsable.
    pub fn would_queue(&self, amount: &str) -> Option<bool> {
        let snapshot = self.pool_status?;
        let principal = Money::parse_form(amount)?;
        Some(snapshot.should_enqueue(principal, self.config.pool_approval_threshold))
    }

    /// installment table for the form values, using the configured
    /// amortization system and a first due date one month from now
    pub fn schedule(&self, amount: &str, installments: &str) -> Result<AmortizationSchedule> {
        let (principal, installment_count) = parse_form(amount, installments)
            .ok_or(SimulatorError::Rejected(Rejection::InvalidAmount))?;
        AmortizationSchedule::generate_from(
            principal,
            &self.config.rates,
            installment_count,
            self.config.amortization_system,
            &self.time,
        )
    }

    /// clear the form back to `Idle`; refused while a submission is in flight
    pub fn reset(&mut self) -> Result<()> {
        if self.state.in_flight().is_some() {
            return Err(SimulatorError::SubmissionInFlight);
        }
        self.state = RequestState::Idle;
        self.feedback = None;
        Ok(())
    }

    pub fn state(&self) -> &RequestState {
        &self.state
    }

    pub fn feedback(&self) -> Option<&Feedback> {
        self.feedback.as_ref()
    }

    pub fn pool_status(&self) -> Option<&PoolCapacitySnapshot> {
        self.pool_status.as_ref()
    }

    pub fn config(&self) -> &ProductConfig {
        &self.config
    }

    pub fn events(&self) -> &[Event] {
        self.events.events()
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        self.events.take_events()
    }

    fn start_submission(
        &mut self,
        principal: Money,
        installment_count: u32,
        user: CurrentUser,
    ) -> LoanRequest {
        let request = LoanRequest {
            request_id: Uuid::new_v4(),
            principal,
            installment_count,
            requester_id: user.id,
        };

        info!(
            request_id = %request.request_id,
            principal = %request.principal,
            installment_count,
            requester_id = user.id,
            "submitting loan request"
        );
        self.events.emit(Event::SubmissionStarted {
            request_id: request.request_id,
            principal,
            installment_count,
            requester_id: user.id,
            timestamp: self.time.now(),
        });
        self.feedback = self
            .would_queue_principal(principal)
            .then(|| Feedback::warning(messages::queue_warning(self.config.pool_approval_threshold)));
        self.state = RequestState::Submitting(request.clone());
        request
    }

    fn would_queue_principal(&self, principal: Money) -> bool {
        self.pool_status
            .map(|p| p.should_enqueue(principal, self.config.pool_approval_threshold))
            .unwrap_or(false)
    }

    fn refresh_pool(&mut self) -> Result<PoolCapacitySnapshot> {
        match self.pool.pool_status() {
            Ok(snapshot) => {
                debug!(available = %snapshot.available_balance, "pool status loaded");
                self.events.emit(Event::PoolStatusLoaded {
                    available_balance: snapshot.available_balance,
                    total_balance: snapshot.total_balance,
                    timestamp: self.time.now(),
                });
                self.pool_status = Some(snapshot);
                Ok(snapshot)
            }
            Err(err) => {
                warn!(error = %err, "pool status unavailable");
                self.events.emit(Event::PoolStatusUnavailable {
                    reason: err.to_string(),
                    timestamp: self.time.now(),
                });
                Err(err)
            }
        }
    }
}

/// amount and installment count as typed into the form
fn parse_form(amount: &str, installments: &str) -> Option<(Money, u32)> {
    let principal = Money::parse_form(amount)?;
    let installment_count = installments.trim().parse::<u32>().ok()?;
    Some((principal, installment_count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::Tone;
    use crate::types::AmortizationSystem;
    use chrono::{NaiveDate, TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use std::cell::{Cell, RefCell};

    struct FixedPool {
        available: RefCell<Option<Money>>,
    }

    impl FixedPool {
        fn with(available: i64) -> Self {
            Self {
                available: RefCell::new(Some(Money::from_major(available))),
            }
        }

        fn offline() -> Self {
            Self {
                available: RefCell::new(None),
            }
        }
    }

    impl PoolStatusProvider for FixedPool {
        fn pool_status(&self) -> Result<PoolCapacitySnapshot> {
            match *self.available.borrow() {
                Some(available) => {
                    let total = Money::from_major(100_000);
                    Ok(PoolCapacitySnapshot::from_balances(total, total - available, 4))
                }
                None => Err(SimulatorError::PoolUnavailable {
                    message: "connection refused".to_string(),
                }),
            }
        }
    }

    struct SignedIn(Option<CurrentUser>);

    impl CurrentUserResolver for SignedIn {
        fn current_user(&self) -> Option<CurrentUser> {
            self.0.clone()
        }
    }

    struct StubIssuer {
        result: std::result::Result<LoanRecord, IssuanceFailure>,
        calls: Cell<u32>,
    }

    impl StubIssuer {
        fn approving() -> Self {
            Self {
                result: Ok(LoanRecord {
                    loan_id: 7,
                    principal: Money::from_major(10_000),
                    installment_count: 12,
                    status: LoanStatus::Active,
                    wallet_balance: Some(Money::from_major(10_000)),
                }),
                calls: Cell::new(0),
            }
        }

        fn failing(failure: IssuanceFailure) -> Self {
            Self {
                result: Err(failure),
                calls: Cell::new(0),
            }
        }
    }

    impl LoanIssuer for StubIssuer {
        fn submit_loan_request(
            &self,
            _request: &LoanRequest,
        ) -> std::result::Result<LoanRecord, IssuanceFailure> {
            self.calls.set(self.calls.get() + 1);
            self.result.clone()
        }
    }

    fn member() -> SignedIn {
        SignedIn(Some(CurrentUser {
            id: 3,
            name: Some("Ana".to_string()),
        }))
    }

    fn flow(pool: FixedPool, users: SignedIn) -> LoanRequestFlow<FixedPool, SignedIn> {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        LoanRequestFlow::new(
            ProductConfig::shiftbox(),
            pool,
            users,
            SafeTimeProvider::new(TimeSource::Test(start)),
        )
    }

    #[test]
    fn test_happy_path() {
        let mut flow = flow(FixedPool::with(20_000), member());
        flow.load().unwrap();
        assert_eq!(
            flow.pool_status().unwrap().available_balance,
            Money::from_major(20_000)
        );

        let quote = flow.quote("10000", "12");
        assert!(quote.valid);

        let issuer = StubIssuer::approving();
        let record = flow.submit_with(&issuer, "10000", "12").unwrap();

        assert_eq!(record.loan_id, 7);
        assert_eq!(issuer.calls.get(), 1);
        assert!(matches!(flow.state(), RequestState::Approved(_)));

        let feedback = flow.feedback().unwrap();
        assert!(!feedback.is_error());
        assert_eq!(
            feedback.text,
            "Loan of R$ 10000.00 approved: 12 installments of R$ 902.58. Your new balance is R$ 10000.00."
        );

        let events = flow.take_events();
        assert!(matches!(events[0], Event::PoolStatusLoaded { .. }));
        assert!(matches!(events[1], Event::SubmissionStarted { installment_count: 12, requester_id: 3, .. }));
        assert!(matches!(events[2], Event::LoanIssued { loan_id: 7, .. }));
        // pool re-queried after issuance
        assert!(matches!(events[3], Event::PoolStatusLoaded { .. }));
        assert!(flow.events().is_empty());
    }

    #[test]
    fn test_rejected_request_never_reaches_issuer() {
        let mut flow = flow(FixedPool::with(5_000), member());
        flow.load().unwrap();
        let issuer = StubIssuer::approving();

        let err = flow.submit_with(&issuer, "6000", "12").unwrap_err();
        assert!(matches!(
            err,
            SimulatorError::Rejected(Rejection::InsufficientPoolLiquidity { .. })
        ));
        assert_eq!(issuer.calls.get(), 0);
        assert!(flow.state().is_editable());
        assert_eq!(
            flow.feedback().unwrap().text,
            "Amount above the pool's available balance (R$ 5000.00)."
        );

        let err = flow.submit_with(&issuer, "100", "12").unwrap_err();
        assert!(matches!(
            err,
            SimulatorError::Rejected(Rejection::BelowMinimum { .. })
        ));
        assert_eq!(issuer.calls.get(), 0);
    }

    #[test]
    fn test_unknown_pool_rejects() {
        let mut flow = flow(FixedPool::offline(), member());
        assert!(matches!(
            flow.load(),
            Err(SimulatorError::PoolUnavailable { .. })
        ));
        assert!(flow.feedback().unwrap().is_error());

        let err = flow.begin_submission("1000", "12").unwrap_err();
        assert!(matches!(
            err,
            SimulatorError::Rejected(Rejection::InsufficientPoolLiquidity {
                available: None,
                ..
            })
        ));
    }

    #[test]
    fn test_missing_user_rejects() {
        let mut flow = flow(FixedPool::with(20_000), SignedIn(None));
        flow.load().unwrap();

        let err = flow.begin_submission("1000", "12").unwrap_err();
        assert!(matches!(
            err,
            SimulatorError::Rejected(Rejection::UnresolvedUser)
        ));
        assert_eq!(
            flow.state(),
            &RequestState::Rejected(Rejection::UnresolvedUser)
        );
    }

    #[test]
    fn test_single_submission_in_flight() {
        let mut flow = flow(FixedPool::with(20_000), member());
        flow.load().unwrap();

        let request = flow.begin_submission("1000", "6").unwrap();
        assert!(!flow.state().is_editable());
        assert!(matches!(
            flow.begin_submission("1000", "6"),
            Err(SimulatorError::SubmissionInFlight)
        ));
        assert!(matches!(flow.reset(), Err(SimulatorError::SubmissionInFlight)));

        let other = Uuid::new_v4();
        assert!(matches!(
            flow.complete_submission(other, Err(IssuanceFailure::new(RemoteFailureKind::Timeout, None))),
            Err(SimulatorError::RequestMismatch { .. })
        ));

        let failure = IssuanceFailure::new(RemoteFailureKind::Timeout, None);
        let state = flow
            .complete_submission(request.request_id, Err(failure.clone()))
            .unwrap();
        assert_eq!(state, &RequestState::Failed(failure));
        assert!(flow.state().is_editable());

        assert!(matches!(
            flow.complete_submission(request.request_id, Err(IssuanceFailure::new(RemoteFailureKind::Timeout, None))),
            Err(SimulatorError::NoSubmissionInFlight)
        ));
    }

    #[test]
    fn test_issuance_failure_shows_backend_message() {
        let mut flow = flow(FixedPool::with(20_000), member());
        flow.load().unwrap();
        let issuer = StubIssuer::failing(IssuanceFailure::new(
            RemoteFailureKind::from_status(409),
            Some("Pool sem saldo suficiente".to_string()),
        ));

        let err = flow.submit_with(&issuer, "1000", "12").unwrap_err();
        assert!(matches!(err, SimulatorError::Issuance(_)));
        assert_eq!(issuer.calls.get(), 1);
        assert_eq!(flow.feedback().unwrap().text, "Pool sem saldo suficiente");
        assert!(flow
            .events()
            .iter()
            .any(|e| matches!(e, Event::SubmissionFailed { .. })));

        // resubmission is a fresh request
        flow.reset().unwrap();
        assert_eq!(flow.state(), &RequestState::Idle);
        assert!(flow.feedback().is_none());
    }

    #[test]
    fn test_failure_kind_from_status() {
        assert_eq!(
            RemoteFailureKind::from_status(400),
            RemoteFailureKind::Rejected { status: 400 }
        );
        assert_eq!(
            RemoteFailureKind::from_status(502),
            RemoteFailureKind::Server { status: 502 }
        );
        let failure = IssuanceFailure::new(RemoteFailureKind::Network, None);
        assert_eq!(failure.to_string(), "network error: no details");
    }

    #[test]
    fn test_malformed_form_leaves_form_editable() {
        let mut flow = flow(FixedPool::with(20_000), member());
        flow.load().unwrap();

        let err = flow.begin_submission("abc", "12").unwrap_err();
        assert!(matches!(err, SimulatorError::Rejected(Rejection::InvalidAmount)));
        assert_eq!(flow.state(), &RequestState::Rejected(Rejection::InvalidAmount));
        assert!(flow.state().is_editable());
    }

    #[test]
    fn test_queue_warning_past_threshold() {
        // 100k pool with 80k lent: anything more waits in the queue
        let mut flow = flow(FixedPool::with(20_000), member());
        assert_eq!(flow.would_queue("1000"), None);
        flow.load().unwrap();

        assert_eq!(flow.would_queue("1000"), Some(true));
        assert_eq!(flow.would_queue("abc"), None);

        flow.begin_submission("1000", "12").unwrap();
        let feedback = flow.feedback().unwrap();
        assert_eq!(feedback.tone, Tone::Warning);
        assert!(feedback.text.contains("queued"));

        let mut flow = self::flow(FixedPool::with(40_000), member());
        flow.load().unwrap();
        assert_eq!(flow.would_queue("20000"), Some(false));
        flow.begin_submission("20000", "12").unwrap();
        assert!(flow.feedback().is_none());
    }

    #[test]
    fn test_queued_issuance_is_a_warning() {
        let mut flow = flow(FixedPool::with(20_000), member());
        flow.load().unwrap();
        let request = flow.begin_submission("1000", "12").unwrap();

        let record = LoanRecord {
            loan_id: 9,
            principal: Money::from_major(1_000),
            installment_count: 12,
            status: LoanStatus::Queued,
            wallet_balance: None,
        };
        flow.complete_submission(request.request_id, Ok(record)).unwrap();

        let feedback = flow.feedback().unwrap();
        assert_eq!(feedback.tone, Tone::Warning);
        assert!(matches!(flow.state(), RequestState::Approved(_)));
    }

    #[test]
    fn test_schedule_uses_configured_system() {
        let mut flow = flow(FixedPool::with(20_000), member());
        let schedule = flow.schedule("6000", "6").unwrap();
        assert_eq!(schedule.system, AmortizationSystem::Price);
        assert_eq!(
            schedule.get(1).unwrap().due_date,
            NaiveDate::from_ymd_opt(2024, 7, 1).unwrap()
        );

        flow.config.amortization_system = AmortizationSystem::Sac;
        let schedule = flow.schedule("6000", "6").unwrap();
        assert_eq!(schedule.system, AmortizationSystem::Sac);
        assert_eq!(schedule.get(1).unwrap().principal, Money::from_major(1_000));

        assert!(matches!(
            flow.schedule("", "6"),
            Err(SimulatorError::Rejected(Rejection::InvalidAmount))
        ));
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::request::IssuanceFailure;
use crate::types::{RequestId, UserId};
use crate::validation::Rejection;

/// events emitted by the loan request flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // pool events
    PoolStatusLoaded {
        available_balance: Money,
        total_balance: Money,
        timestamp: DateTime<Utc>,
    },
    PoolStatusUnavailable {
        reason: String,
        timestamp: DateTime<Utc>,
    },

    // request events
    RequestRejected {
        rejection: Rejection,
        timestamp: DateTime<Utc>,
    },
    SubmissionStarted {
        request_id: RequestId,
        principal: Money,
        installment_count: u32,
        requester_id: UserId,
        timestamp: DateTime<Utc>,
    },
    LoanIssued {
        request_id: RequestId,
        loan_id: u64,
        principal: Money,
        timestamp: DateTime<Utc>,
    },
    SubmissionFailed {
        request_id: RequestId,
        failure: IssuanceFailure,
        timestamp: DateTime<Utc>,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }
}

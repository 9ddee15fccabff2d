use thiserror::Error;
use uuid::Uuid;

use crate::request::IssuanceFailure;
use crate::validation::Rejection;

#[derive(Error, Debug)]
pub enum SimulatorError {
    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },

    #[error("could not read product configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("calculation error: {message}")]
    CalculationError {
        message: String,
    },

    #[error("loan request rejected: {0}")]
    Rejected(Rejection),

    #[error("a loan request is already being submitted")]
    SubmissionInFlight,

    #[error("no loan request is being submitted")]
    NoSubmissionInFlight,

    #[error("result for request {received} does not match in-flight request {expected}")]
    RequestMismatch {
        expected: Uuid,
        received: Uuid,
    },

    #[error("pool status unavailable: {message}")]
    PoolUnavailable {
        message: String,
    },

    #[error("loan issuance failed: {0}")]
    Issuance(IssuanceFailure),
}

pub type Result<T> = std::result::Result<T, SimulatorError>;

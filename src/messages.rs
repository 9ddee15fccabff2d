use serde::{Deserialize, Serialize};

use crate::decimal::Rate;
use crate::quote::LoanQuote;
use crate::request::{IssuanceFailure, RemoteFailureKind};
use crate::types::{LoanRecord, LoanStatus};
use crate::validation::Rejection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tone {
    Success,
    /// accepted, but the user should know something, e.g. the loan is queued
    Warning,
    Error,
}

/// the single message currently shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub tone: Tone,
    pub text: String,
}

impl Feedback {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            tone: Tone::Success,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            tone: Tone::Warning,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            tone: Tone::Error,
            text: text.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.tone == Tone::Error
    }
}

/// message for a locally detected rejection, with its bound when it has one
pub fn rejection_message(rejection: &Rejection, currency: &str) -> String {
    match rejection {
        Rejection::InvalidAmount => "Enter a valid amount.".to_string(),
        Rejection::BelowMinimum { minimum } => {
            format!("Minimum loan amount: {}.", minimum.format_currency(currency))
        }
        Rejection::AboveMaximum { maximum } => {
            format!("Maximum loan amount: {}.", maximum.format_currency(currency))
        }
        Rejection::InvalidInstallments { min, max } => {
            format!("Choose between {} and {} installments.", min, max)
        }
        Rejection::InsufficientPoolLiquidity {
            available: Some(available),
            ..
        } => format!(
            "Amount above the pool's available balance ({}).",
            available.format_currency(currency)
        ),
        Rejection::InsufficientPoolLiquidity { available: None, .. } => {
            "Pool balance is not available yet. Try again once it loads.".to_string()
        }
        Rejection::UnresolvedUser => "Could not identify the user.".to_string(),
    }
}

/// backend message verbatim when present, otherwise a fallback for the failure kind
pub fn issuance_failure_message(failure: &IssuanceFailure) -> String {
    if let Some(message) = failure.message.as_deref() {
        if !message.trim().is_empty() {
            return message.to_string();
        }
    }

    let fallback = match failure.kind {
        RemoteFailureKind::Network => "Could not reach the server. Check your connection and try again.",
        RemoteFailureKind::Timeout => "The server took too long to respond. Try again.",
        RemoteFailureKind::Rejected { status: 400 } => "Invalid data. Check the values and try again.",
        RemoteFailureKind::Rejected { status: 401 } => "You need to be signed in to request loans.",
        RemoteFailureKind::Rejected { status: 403 } => "Operation not allowed.",
        RemoteFailureKind::Rejected { status: 409 } => {
            "The pool does not have enough balance for this loan."
        }
        RemoteFailureKind::Rejected { .. } => "Could not register the request.",
        RemoteFailureKind::Server { .. } => "Internal server error. Try again later.",
    };
    fallback.to_string()
}

/// shown when a request will wait in the pool queue
pub fn queue_warning(threshold: Rate) -> String {
    format!(
        "This loan would take the pool past {} committed. It will be queued until capacity frees up.",
        threshold
    )
}

/// message after the issuance service accepted the loan
pub fn approval_message(record: &LoanRecord, quote: &LoanQuote, currency: &str) -> String {
    if record.status == LoanStatus::Queued {
        return format!(
            "Loan request of {} queued: it will be approved once the pool has capacity.",
            record.principal.format_currency(currency)
        );
    }

    let mut text = format!(
        "Loan of {} approved: {} installments of {}.",
        record.principal.format_currency(currency),
        record.installment_count,
        quote.monthly_payment.format_currency(currency)
    );
    if let Some(balance) = record.wallet_balance {
        text.push_str(&format!(" Your new balance is {}.", balance.format_currency(currency)));
    }
    text
}

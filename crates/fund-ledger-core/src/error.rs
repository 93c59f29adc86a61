use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::commitments::CommitmentState;
use crate::types::AccountId;

/// Reason class of a rejected operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Precondition on the arguments failed (size, rounding, overflow)
    Validation,
    /// Target is not in the precursor state the transition requires
    State,
    /// Not enough uncalled commitments to satisfy the request
    Resource,
    /// Caller lacks the capability, or the account is not eligible
    Authorization,
    /// A collaborator (unit ledger) refused the batch
    External,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FundLedgerError {
    #[error("Invalid input: {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Commitment of {amount} is not a multiple of the block size {block_size}")]
    InvalidSize { amount: Decimal, block_size: Decimal },

    #[error("Scaled share of a {amount} call against {total_committed} committed rounds to zero")]
    ScaleUnderflow {
        amount: Decimal,
        total_committed: Decimal,
    },

    #[error("Fixed-point overflow in {context}")]
    ScaleOverflow { context: String },

    #[error("Share for {account} rounds to zero")]
    InvalidShare { account: AccountId },

    #[error("Commitment for {account} is {state:?} and cannot be cancelled")]
    NotCancellable {
        account: AccountId,
        state: CommitmentState,
    },

    #[error("Commitment for {account} is {state:?}, expected Pending")]
    NotPending {
        account: AccountId,
        state: CommitmentState,
    },

    #[error("Commitment for {account} is {state:?}, expected {expected:?}")]
    InvalidTransition {
        account: AccountId,
        state: CommitmentState,
        expected: CommitmentState,
    },

    #[error("Commitment for {0} is blocked")]
    CommitmentBlocked(AccountId),

    #[error("Capital call {call_id} has no allocation for {account}")]
    UnknownCapitalCall { call_id: u64, account: AccountId },

    #[error("Capital call {call_id} for {account} is already settled")]
    CapitalCallSettled { call_id: u64, account: AccountId },

    #[error("Ledger is at {last}, cannot record an event at {requested}")]
    NonMonotonicTimestamp {
        last: NaiveDate,
        requested: NaiveDate,
    },

    #[error("Capital call of {requested} exceeds uncalled commitments of {available}")]
    InsufficientCommitments {
        requested: Decimal,
        available: Decimal,
    },

    #[error("Operation {operation} requires {required}")]
    Unauthorized { operation: String, required: String },

    #[error("Account {0} is not eligible")]
    Ineligible(AccountId),

    #[error("Date error: {0}")]
    DateError(String),

    #[error("Unit ledger rejected the batch: {0}")]
    UnitLedger(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl FundLedgerError {
    /// Reason class used by callers to decide remediation.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput { .. }
            | Self::InvalidSize { .. }
            | Self::ScaleUnderflow { .. }
            | Self::ScaleOverflow { .. }
            | Self::InvalidShare { .. }
            | Self::DateError(_)
            | Self::SerializationError(_) => ErrorKind::Validation,
            Self::NotCancellable { .. }
            | Self::NotPending { .. }
            | Self::InvalidTransition { .. }
            | Self::CommitmentBlocked(_)
            | Self::UnknownCapitalCall { .. }
            | Self::CapitalCallSettled { .. }
            | Self::NonMonotonicTimestamp { .. } => ErrorKind::State,
            Self::InsufficientCommitments { .. } => ErrorKind::Resource,
            Self::Unauthorized { .. } | Self::Ineligible(_) => ErrorKind::Authorization,
            Self::UnitLedger(_) => ErrorKind::External,
        }
    }

    /// Stable reason code carried by a rejected operation.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "INVALID_INPUT",
            Self::InvalidSize { .. } => "INVALID_SIZE",
            Self::ScaleUnderflow { .. } => "SCALE_UNDERFLOW",
            Self::ScaleOverflow { .. } => "SCALE_OVERFLOW",
            Self::InvalidShare { .. } => "INVALID_SHARE",
            Self::NotCancellable { .. } => "NOT_CANCELLABLE",
            Self::NotPending { .. } => "NOT_PENDING",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::CommitmentBlocked(_) => "COMMITMENT_BLOCKED",
            Self::UnknownCapitalCall { .. } => "UNKNOWN_CAPITAL_CALL",
            Self::CapitalCallSettled { .. } => "CAPITAL_CALL_SETTLED",
            Self::NonMonotonicTimestamp { .. } => "NON_MONOTONIC_TIMESTAMP",
            Self::InsufficientCommitments { .. } => "INSUFFICIENT_COMMITMENTS",
            Self::Unauthorized { .. } => "UNAUTHORIZED",
            Self::Ineligible(_) => "INELIGIBLE",
            Self::DateError(_) => "DATE_ERROR",
            Self::UnitLedger(_) => "UNIT_LEDGER",
            Self::SerializationError(_) => "SERIALIZATION",
        }
    }
}

impl From<serde_json::Error> for FundLedgerError {
    fn from(e: serde_json::Error) -> Self {
        FundLedgerError::SerializationError(e.to_string())
    }
}

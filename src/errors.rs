use thiserror::Error;
use uuid::Uuid;

use crate::decimal::Money;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("validation failed: {message}")]
    Validation {
        message: String,
    },

    #[error("sequence conflict: period {requested} is no longer current, live sequence is {live_sequence}")]
    SequenceConflict {
        requested: u32,
        live_sequence: u32,
    },

    #[error("period {period_sequence} is already closed")]
    TransactionClosed {
        period_sequence: u32,
    },

    #[error("inconsistent carry-forward for member {member_id}: {amount}")]
    InconsistentCarryForward {
        member_id: Uuid,
        amount: Money,
    },

    #[error("period not found: {id}")]
    PeriodNotFound {
        id: Uuid,
    },

    #[error("contribution not found: {id}")]
    ContributionNotFound {
        id: Uuid,
    },

    #[error("membership not found for member {member_id}")]
    MembershipNotFound {
        member_id: Uuid,
    },

    #[error("no open period for group {group_id}")]
    NoOpenPeriod {
        group_id: Uuid,
    },
}

impl LedgerError {
    pub fn validation(message: impl Into<String>) -> Self {
        LedgerError::Validation {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;

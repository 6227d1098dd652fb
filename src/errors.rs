use thiserror::Error;

use crate::types::{CycleId, LoanId, LoanStatus};

#[derive(Error, Debug)]
pub enum LoanError {
    #[error("invalid payment: {reason}")]
    InvalidPayment {
        reason: String,
    },

    #[error("loan not found: {id}")]
    LoanNotFound {
        id: LoanId,
    },

    #[error("cycle not found: {id}")]
    CycleNotFound {
        id: CycleId,
    },

    #[error("loan not active: current status is {status:?}")]
    LoanNotActive {
        status: LoanStatus,
    },

    #[error("no active cycle for loan {loan_id}")]
    NoActiveCycle {
        loan_id: LoanId,
    },

    #[error("invalid input: {message}")]
    InvalidInput {
        message: String,
    },

    #[error("invariant violation: {message}")]
    InvariantViolation {
        message: String,
    },

    #[error("storage error: {message}")]
    Storage {
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, LoanError>;

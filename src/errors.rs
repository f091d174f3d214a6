use thiserror::Error;
use uuid::Uuid;

use crate::decimal::Money;
use crate::types::FeeType;

#[derive(Error, Debug)]
pub enum FeeError {
    #[error("invalid payment amount: {amount}")]
    InvalidPaymentAmount {
        amount: Money,
    },

    #[error("no outstanding balance for student {student_id} and fee type {fee_type}")]
    NoOutstandingBalance {
        student_id: Uuid,
        fee_type: FeeType,
    },

    #[error("no students selected for bulk collection")]
    NoStudentsSelected,

    #[error("receipt sequence conflict after {attempts} attempts")]
    SequenceConflict {
        attempts: u32,
    },

    #[error("transaction aborted: {reason}")]
    TransactionAborted {
        reason: String,
    },

    #[error("no fee configuration found for fee type {fee_type}")]
    ConfigurationNotFound {
        fee_type: FeeType,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },

    #[error("unknown tenant: {tenant_id}")]
    UnknownTenant {
        tenant_id: Uuid,
    },

    #[error("unknown student: {student_id}")]
    UnknownStudent {
        student_id: Uuid,
    },

    #[error("state serialization failed: {message}")]
    StateSerialization {
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, FeeError>;

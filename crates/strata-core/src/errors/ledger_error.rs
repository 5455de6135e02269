//! Ledger errors: claim outcomes and backend failures.
//!
//! A claim either returns a lease or reports exactly why it cannot. The
//! runner decides which outcomes are recoverable (`AlreadyApplied` is a
//! skip) and which end the run.

use super::error_code::{self, StrataErrorCode};
use crate::models::{Direction, MigrationStatus};

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Completed under the same checksum. Recoverable: runs skip it.
    #[error("migration {identifier} is already applied")]
    AlreadyApplied { identifier: String },

    /// Another process holds a live lease on this migration.
    #[error("migration {identifier} is already running in another process")]
    AlreadyRunning { identifier: String },

    /// A lease older than the staleness window. Reported, never
    /// auto-reclaimed; the owning process may only be slow.
    #[error("migration {identifier} holds a stale lease ({age_secs}s old); reclaim it to retry")]
    StaleLease { identifier: String, age_secs: i64 },

    /// The definition content no longer matches what was applied.
    #[error("checksum mismatch for {identifier}: ledger has {stored}, definition hashes to {actual}")]
    ChecksumMismatch {
        identifier: String,
        stored: String,
        actual: String,
    },

    /// A revert failed here earlier. The schema is in an intermediate
    /// state only an operator can judge.
    #[error("migration {identifier} has a failed revert; reclaim it after repairing the schema")]
    RevertFailedResidue { identifier: String },

    #[error("cannot claim {identifier} for {direction}: status is {status}")]
    InvalidTransition {
        identifier: String,
        status: MigrationStatus,
        direction: Direction,
    },

    /// The lease token no longer matches the row, meaning the record was
    /// reclaimed while this process was executing.
    #[error("lease for {identifier} is no longer valid")]
    LeaseInvalid { identifier: String },

    #[error("migration {identifier} is not reclaimable: status is {status}")]
    NotReclaimable {
        identifier: String,
        status: MigrationStatus,
    },

    #[error("record for {identifier} not found")]
    RecordNotFound { identifier: String },

    #[error("ledger backend error: {message}")]
    Backend { message: String },
}

impl LedgerError {
    /// Map a storage failure into a ledger error.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

impl StrataErrorCode for LedgerError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::AlreadyApplied { .. } => error_code::ALREADY_APPLIED,
            Self::AlreadyRunning { .. } => error_code::CONCURRENT_RUN,
            Self::StaleLease { .. } => error_code::STALE_LEASE,
            Self::ChecksumMismatch { .. } => error_code::CHECKSUM_MISMATCH,
            Self::RevertFailedResidue { .. } => error_code::REVERT_FAILED,
            Self::InvalidTransition { .. }
            | Self::LeaseInvalid { .. }
            | Self::NotReclaimable { .. }
            | Self::RecordNotFound { .. } => error_code::LEDGER_ERROR,
            Self::Backend { .. } => error_code::STORAGE_ERROR,
        }
    }

    fn exit_code(&self) -> i32 {
        match self {
            Self::AlreadyRunning { .. } => error_code::exit::CONCURRENT,
            Self::StaleLease { .. } | Self::RevertFailedResidue { .. } => {
                error_code::exit::OPERATOR_REQUIRED
            }
            Self::ChecksumMismatch { .. } => error_code::exit::CHECKSUM,
            Self::Backend { .. } => error_code::exit::STORAGE,
            _ => error_code::exit::OPERATION_FAILED,
        }
    }
}

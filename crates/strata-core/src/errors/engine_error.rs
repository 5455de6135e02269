//! Run-level errors raised by the migration engine.
//! Aggregates subsystem errors via `From` conversions.

use super::error_code::{self, StrataErrorCode};
use super::{ConfigError, LedgerError, RegistryError};

/// Convenience alias for engine-level results.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that end a migration run.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// An operation failed mid-migration. The ledger already records the
    /// migration as failed; a later run retries it from its first
    /// operation.
    #[error("migration {identifier} failed during {operation}: {reason}")]
    OperationFailed {
        identifier: String,
        operation: String,
        reason: String,
    },

    /// Another process claimed a migration this run needed. Skipping past
    /// it would apply later migrations out of order, so the run ends.
    #[error("concurrent run detected: {identifier} is claimed by another process")]
    ConcurrentRunDetected { identifier: String },

    #[error("stale lease on {identifier} ({age_secs}s old); reclaim it to proceed")]
    StaleLeaseDetected { identifier: String, age_secs: i64 },

    #[error("migration {identifier} is irreversible: it has no revert operations")]
    IrreversibleMigration { identifier: String },

    #[error("target {target:?} is not in the registry")]
    UnknownTarget { target: String },

    /// The ledger has a completed record whose definition is gone from
    /// the registry. Rollback refuses to guess what reverting it means.
    #[error("ledger records completed migration {identifier} but the registry has no definition for it")]
    DefinitionMissing { identifier: String },
}

impl StrataErrorCode for EngineError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Registry(e) => e.error_code(),
            Self::Ledger(e) => e.error_code(),
            Self::Config(e) => e.error_code(),
            Self::OperationFailed { .. } => error_code::OPERATION_FAILED,
            Self::ConcurrentRunDetected { .. } => error_code::CONCURRENT_RUN,
            Self::StaleLeaseDetected { .. } => error_code::STALE_LEASE,
            Self::IrreversibleMigration { .. } => error_code::IRREVERSIBLE_MIGRATION,
            Self::UnknownTarget { .. } => error_code::UNKNOWN_TARGET,
            Self::DefinitionMissing { .. } => error_code::REGISTRY_ERROR,
        }
    }

    fn exit_code(&self) -> i32 {
        match self {
            Self::Registry(e) => e.exit_code(),
            Self::Ledger(e) => e.exit_code(),
            Self::Config(e) => e.exit_code(),
            Self::OperationFailed { .. } => error_code::exit::OPERATION_FAILED,
            Self::ConcurrentRunDetected { .. } => error_code::exit::CONCURRENT,
            Self::StaleLeaseDetected { .. } => error_code::exit::OPERATOR_REQUIRED,
            Self::IrreversibleMigration { .. } => error_code::exit::IRREVERSIBLE,
            Self::UnknownTarget { .. } | Self::DefinitionMissing { .. } => {
                error_code::exit::REGISTRY
            }
        }
    }
}

//! Stable error codes and process exit codes.
//!
//! Every error maps to a machine-readable string code (for logs and tooling)
//! and a specific nonzero exit code (for the CLI), so callers can branch on
//! *why* a run failed without parsing messages.

/// Stable code plus exit code for an error.
pub trait StrataErrorCode {
    fn error_code(&self) -> &'static str;
    fn exit_code(&self) -> i32;
}

pub const OPERATION_FAILED: &str = "OPERATION_FAILED";
pub const DUPLICATE_IDENTIFIER: &str = "DUPLICATE_IDENTIFIER";
pub const INVALID_IDENTIFIER: &str = "INVALID_IDENTIFIER";
pub const REGISTRY_ERROR: &str = "REGISTRY_ERROR";
pub const UNKNOWN_TARGET: &str = "UNKNOWN_TARGET";
pub const ALREADY_APPLIED: &str = "ALREADY_APPLIED";
pub const CONCURRENT_RUN: &str = "CONCURRENT_RUN";
pub const CHECKSUM_MISMATCH: &str = "CHECKSUM_MISMATCH";
pub const IRREVERSIBLE_MIGRATION: &str = "IRREVERSIBLE_MIGRATION";
pub const STALE_LEASE: &str = "STALE_LEASE";
pub const REVERT_FAILED: &str = "REVERT_FAILED";
pub const LEDGER_ERROR: &str = "LEDGER_ERROR";
pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
pub const ADAPTER_ERROR: &str = "ADAPTER_ERROR";
pub const CONFIG_ERROR: &str = "CONFIG_ERROR";

/// CLI exit codes, one per failure class.
pub mod exit {
    pub const SUCCESS: i32 = 0;
    /// A migration failed mid-run; the ledger marks it `failed`.
    pub const OPERATION_FAILED: i32 = 1;
    /// Registry refused to load: duplicates, bad identifiers, parse errors.
    pub const REGISTRY: i32 = 2;
    /// Another run holds the claim.
    pub const CONCURRENT: i32 = 3;
    /// A definition changed after it was applied.
    pub const CHECKSUM: i32 = 4;
    /// Rollback hit a migration with no revert operations.
    pub const IRREVERSIBLE: i32 = 5;
    /// Operator action required: stale lease or failed revert residue.
    pub const OPERATOR_REQUIRED: i32 = 6;
    /// Storage backend failure.
    pub const STORAGE: i32 = 7;
    /// Configuration could not be loaded or validated.
    pub const CONFIG: i32 = 8;
}

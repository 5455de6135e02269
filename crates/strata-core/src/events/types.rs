//! Event payload types for the migration run lifecycle.

use crate::models::Direction;

/// Payload for `on_run_started`.
#[derive(Debug, Clone)]
pub struct RunStartedEvent {
    pub direction: Direction,
    /// Migrations this run will attempt.
    pub pending: usize,
    /// Migrations known to the registry.
    pub total: usize,
}

/// Payload for `on_migration_started`.
#[derive(Debug, Clone)]
pub struct MigrationStartedEvent {
    pub identifier: String,
    pub direction: Direction,
    pub operations: usize,
}

/// Payload for `on_migration_applied`.
#[derive(Debug, Clone)]
pub struct MigrationAppliedEvent {
    pub identifier: String,
    pub duration_ms: u64,
}

/// Payload for `on_migration_skipped`.
#[derive(Debug, Clone)]
pub struct MigrationSkippedEvent {
    pub identifier: String,
    pub reason: String,
}

/// Payload for `on_migration_failed`.
#[derive(Debug, Clone)]
pub struct MigrationFailedEvent {
    pub identifier: String,
    pub direction: Direction,
    /// Wire name of the operation that failed.
    pub operation: String,
    pub error: String,
}

/// Payload for `on_migration_rolled_back`.
#[derive(Debug, Clone)]
pub struct MigrationRolledBackEvent {
    pub identifier: String,
    pub duration_ms: u64,
}

/// Payload for `on_stale_lease`.
#[derive(Debug, Clone)]
pub struct StaleLeaseEvent {
    pub identifier: String,
    pub age_secs: i64,
}

/// Payload for `on_run_completed`.
#[derive(Debug, Clone)]
pub struct RunCompletedEvent {
    pub direction: Direction,
    pub applied: usize,
    pub skipped: usize,
    pub failed: usize,
    pub duration_ms: u64,
    /// True when the run stopped at a cancellation checkpoint.
    pub interrupted: bool,
}

//! Event handler trait and the shipped tracing-backed handler.

use tracing::{error, info, warn};

use super::types::*;

/// Observer for migration run lifecycle events.
///
/// All methods default to no-ops so handlers implement only what they
/// need. The engine itself stays log-format-agnostic; handlers decide how
/// events reach the outside world.
pub trait MigrationEventHandler: Send + Sync {
    fn on_run_started(&self, _event: &RunStartedEvent) {}
    fn on_migration_started(&self, _event: &MigrationStartedEvent) {}
    fn on_migration_applied(&self, _event: &MigrationAppliedEvent) {}
    fn on_migration_skipped(&self, _event: &MigrationSkippedEvent) {}
    fn on_migration_failed(&self, _event: &MigrationFailedEvent) {}
    fn on_migration_rolled_back(&self, _event: &MigrationRolledBackEvent) {}
    fn on_stale_lease(&self, _event: &StaleLeaseEvent) {}
    fn on_run_completed(&self, _event: &RunCompletedEvent) {}
}

/// Forwards events to `tracing` with structured, leveled fields.
#[derive(Debug, Default)]
pub struct TracingHandler;

impl MigrationEventHandler for TracingHandler {
    fn on_run_started(&self, event: &RunStartedEvent) {
        info!(
            direction = %event.direction,
            pending = event.pending,
            total = event.total,
            "migration run started"
        );
    }

    fn on_migration_started(&self, event: &MigrationStartedEvent) {
        info!(
            identifier = %event.identifier,
            direction = %event.direction,
            operations = event.operations,
            "migration started"
        );
    }

    fn on_migration_applied(&self, event: &MigrationAppliedEvent) {
        info!(
            identifier = %event.identifier,
            duration_ms = event.duration_ms,
            "migration applied"
        );
    }

    fn on_migration_skipped(&self, event: &MigrationSkippedEvent) {
        info!(
            identifier = %event.identifier,
            reason = %event.reason,
            "migration skipped"
        );
    }

    fn on_migration_failed(&self, event: &MigrationFailedEvent) {
        error!(
            identifier = %event.identifier,
            direction = %event.direction,
            operation = %event.operation,
            error = %event.error,
            "migration failed"
        );
    }

    fn on_migration_rolled_back(&self, event: &MigrationRolledBackEvent) {
        info!(
            identifier = %event.identifier,
            duration_ms = event.duration_ms,
            "migration rolled back"
        );
    }

    fn on_stale_lease(&self, event: &StaleLeaseEvent) {
        warn!(
            identifier = %event.identifier,
            age_secs = event.age_secs,
            "stale migration lease detected"
        );
    }

    fn on_run_completed(&self, event: &RunCompletedEvent) {
        info!(
            direction = %event.direction,
            applied = event.applied,
            skipped = event.skipped,
            failed = event.failed,
            duration_ms = event.duration_ms,
            interrupted = event.interrupted,
            "migration run complete"
        );
    }
}

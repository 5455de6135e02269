//! The migration run state machine.
//!
//! A forward run computes the pending set (registry order minus completed
//! records), then walks it strictly in order: claim, execute forward
//! operations, commit or fail. A rollback run walks the completed suffix at
//! or after a target in strict reverse order using each definition's
//! reverse operations. Every migration is its own failure boundary: the
//! first failure is recorded in the ledger and ends the run, and nothing
//! after it is attempted.

use std::time::Instant;

use strata_core::errors::{EngineError, EngineResult, LedgerError};
use strata_core::events::{
    EventDispatcher, MigrationAppliedEvent, MigrationFailedEvent, MigrationRolledBackEvent,
    MigrationSkippedEvent, MigrationStartedEvent, RunCompletedEvent, RunStartedEvent,
    StaleLeaseEvent,
};
use strata_core::models::{
    Direction, Lease, MigrationId, MigrationRecord, MigrationStatus, SchemaOperation,
};
use strata_core::traits::{Cancellable, CancellationToken, Ledger, SchemaAdapter};

use crate::registry::{RegisteredMigration, Registry};
use crate::report::{MigrationOutcome, RunReport, StatusEntry};

/// Executes migration runs against one ledger and one schema adapter.
///
/// Within a run everything is strictly sequential. Concurrency exists only
/// across independent runner processes and is resolved entirely by
/// `Ledger::claim`; the runner itself holds no locks.
pub struct Runner<'a> {
    registry: &'a Registry,
    ledger: &'a dyn Ledger,
    adapter: &'a dyn SchemaAdapter,
    events: EventDispatcher,
    cancel: CancellationToken,
}

impl<'a> Runner<'a> {
    pub fn new(
        registry: &'a Registry,
        ledger: &'a dyn Ledger,
        adapter: &'a dyn SchemaAdapter,
    ) -> Self {
        Self {
            registry,
            ledger,
            adapter,
            events: EventDispatcher::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Replace the event dispatcher.
    pub fn with_events(mut self, events: EventDispatcher) -> Self {
        self.events = events;
        self
    }

    /// Share a cancellation token. The runner checks it between
    /// migrations, never mid-migration.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Apply all pending migrations in registry order, up to and including
    /// `target` when given.
    ///
    /// Completed migrations are skipped as no-ops. The first failure marks
    /// that migration `Failed`, halts the run, and leaves everything after
    /// it untouched; a later run retries the failed migration from its
    /// first operation.
    pub fn run_up(&self, target: Option<&MigrationId>) -> EngineResult<RunReport> {
        self.ledger.ensure_ready()?;
        let run_started = Instant::now();

        let cutoff = match target {
            Some(id) => Some(self.position_of(id)?),
            None => None,
        };
        let completed = self.ledger.list_completed()?;
        let pending: Vec<&RegisteredMigration> = self
            .registry
            .iter()
            .take(cutoff.map_or(usize::MAX, |i| i + 1))
            .filter(|m| !completed.contains(m.identifier()))
            .collect();

        self.events.emit_run_started(&RunStartedEvent {
            direction: Direction::Up,
            pending: pending.len(),
            total: self.registry.len(),
        });

        let mut report = RunReport::new(Direction::Up);
        let mut failure = None;
        for migration in pending {
            if self.cancel.is_cancelled() {
                report.interrupted = true;
                break;
            }
            if let Err(e) = self.apply_one(migration, &mut report) {
                failure = Some(e);
                break;
            }
        }

        report.duration_ms = elapsed_ms(run_started);
        self.finish(&report, failure.is_some());
        match failure {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }

    /// Revert completed migrations in strict reverse registry order.
    ///
    /// With a target: every completed migration at or after the target.
    /// Without: one step, the most recently completed migration. A
    /// migration without reverse operations halts the rollback before its
    /// ledger record is touched.
    pub fn run_down(&self, target: Option<&MigrationId>) -> EngineResult<RunReport> {
        self.ledger.ensure_ready()?;
        let run_started = Instant::now();

        let completed = self.ledger.list_completed()?;
        // Rollback needs the definition of everything it may touch.
        for identifier in &completed {
            if !self.registry.contains(identifier) {
                return Err(EngineError::DefinitionMissing {
                    identifier: identifier.to_string(),
                });
            }
        }

        let mut selected: Vec<&RegisteredMigration> = match target {
            Some(id) => {
                let position = self.position_of(id)?;
                self.registry.migrations()[position..]
                    .iter()
                    .filter(|m| completed.contains(m.identifier()))
                    .collect()
            }
            None => self
                .registry
                .iter()
                .filter(|m| completed.contains(m.identifier()))
                .last()
                .into_iter()
                .collect(),
        };
        selected.reverse();

        self.events.emit_run_started(&RunStartedEvent {
            direction: Direction::Down,
            pending: selected.len(),
            total: self.registry.len(),
        });

        let mut report = RunReport::new(Direction::Down);
        let mut failure = None;
        for migration in selected {
            if self.cancel.is_cancelled() {
                report.interrupted = true;
                break;
            }
            if let Err(e) = self.revert_one(migration, &mut report) {
                failure = Some(e);
                break;
            }
        }

        report.duration_ms = elapsed_ms(run_started);
        self.finish(&report, failure.is_some());
        match failure {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }

    /// The registry merged with the ledger, one entry per known migration.
    /// Ledger records whose definitions are gone come last, flagged.
    pub fn status(&self) -> EngineResult<Vec<StatusEntry>> {
        self.ledger.ensure_ready()?;
        let mut records: std::collections::BTreeMap<MigrationId, MigrationRecord> = self
            .ledger
            .records()?
            .into_iter()
            .map(|r| (r.identifier.clone(), r))
            .collect();

        let mut entries = Vec::with_capacity(self.registry.len() + records.len());
        for migration in self.registry.iter() {
            match records.remove(migration.identifier()) {
                Some(record) => entries.push(StatusEntry {
                    identifier: record.identifier,
                    status: record.status,
                    checksum_ok: Some(record.checksum == migration.checksum),
                    started_at: Some(record.started_at),
                    completed_at: record.completed_at,
                    version: record.version,
                    error: record.error,
                    in_registry: true,
                }),
                None => entries.push(StatusEntry {
                    identifier: migration.identifier().clone(),
                    status: MigrationStatus::Pending,
                    checksum_ok: None,
                    started_at: None,
                    completed_at: None,
                    version: migration.definition.version.clone(),
                    error: None,
                    in_registry: true,
                }),
            }
        }
        for (_, record) in records {
            entries.push(StatusEntry {
                identifier: record.identifier,
                status: record.status,
                checksum_ok: None,
                started_at: Some(record.started_at),
                completed_at: record.completed_at,
                version: record.version,
                error: record.error,
                in_registry: false,
            });
        }
        Ok(entries)
    }

    /// Operator-confirmed cleanup of a stale lease or failed-revert
    /// residue. Pass-through to the ledger; never part of a run.
    pub fn reclaim(&self, identifier: &MigrationId) -> EngineResult<MigrationRecord> {
        self.ledger.ensure_ready()?;
        Ok(self.ledger.reclaim(identifier)?)
    }

    fn apply_one(
        &self,
        migration: &RegisteredMigration,
        report: &mut RunReport,
    ) -> EngineResult<()> {
        let identifier = migration.identifier();
        let lease = match self.ledger.claim(
            identifier,
            &migration.checksum,
            migration.definition.version.as_deref(),
            Direction::Up,
        ) {
            Ok(lease) => lease,
            Err(e) => return self.claim_refused(identifier, e, report),
        };

        let started = Instant::now();
        self.events.emit_migration_started(&MigrationStartedEvent {
            identifier: identifier.to_string(),
            direction: Direction::Up,
            operations: migration.definition.up.len(),
        });

        if let Err((operation, reason)) = self.execute(&migration.definition.up) {
            return self.migration_failed(migration, lease, Direction::Up, operation, reason);
        }

        self.ledger.commit(lease)?;
        let duration_ms = elapsed_ms(started);
        self.events.emit_migration_applied(&MigrationAppliedEvent {
            identifier: identifier.to_string(),
            duration_ms,
        });
        report.push(identifier.clone(), MigrationOutcome::Applied, duration_ms);
        Ok(())
    }

    fn revert_one(
        &self,
        migration: &RegisteredMigration,
        report: &mut RunReport,
    ) -> EngineResult<()> {
        let identifier = migration.identifier();
        if !migration.definition.is_reversible() {
            // Refused before the claim: the record stays Completed.
            return Err(EngineError::IrreversibleMigration {
                identifier: identifier.to_string(),
            });
        }

        let lease = match self.ledger.claim(
            identifier,
            &migration.checksum,
            migration.definition.version.as_deref(),
            Direction::Down,
        ) {
            Ok(lease) => lease,
            Err(e) => return self.claim_refused(identifier, e, report),
        };

        let started = Instant::now();
        self.events.emit_migration_started(&MigrationStartedEvent {
            identifier: identifier.to_string(),
            direction: Direction::Down,
            operations: migration.definition.down.len(),
        });

        if let Err((operation, reason)) = self.execute(&migration.definition.down) {
            return self.migration_failed(migration, lease, Direction::Down, operation, reason);
        }

        self.ledger.commit(lease)?;
        let duration_ms = elapsed_ms(started);
        self.events
            .emit_migration_rolled_back(&MigrationRolledBackEvent {
                identifier: identifier.to_string(),
                duration_ms,
            });
        report.push(identifier.clone(), MigrationOutcome::RolledBack, duration_ms);
        Ok(())
    }

    /// Turn a refused claim into a skip or a run-ending error.
    fn claim_refused(
        &self,
        identifier: &MigrationId,
        error: LedgerError,
        report: &mut RunReport,
    ) -> EngineResult<()> {
        match error {
            LedgerError::AlreadyApplied { .. } => {
                self.events.emit_migration_skipped(&MigrationSkippedEvent {
                    identifier: identifier.to_string(),
                    reason: "already applied".into(),
                });
                report.push(identifier.clone(), MigrationOutcome::Skipped, 0);
                Ok(())
            }
            // Skipping past a contended migration would apply later ones
            // out of order, so the whole run ends here.
            LedgerError::AlreadyRunning { identifier } => {
                Err(EngineError::ConcurrentRunDetected { identifier })
            }
            LedgerError::StaleLease {
                identifier,
                age_secs,
            } => {
                self.events.emit_stale_lease(&StaleLeaseEvent {
                    identifier: identifier.clone(),
                    age_secs,
                });
                Err(EngineError::StaleLeaseDetected {
                    identifier,
                    age_secs,
                })
            }
            other => Err(other.into()),
        }
    }

    /// Record a failure in the ledger, then surface it. The ledger write
    /// happens first so the failure is durable even if the caller crashes
    /// on the way out.
    fn migration_failed(
        &self,
        migration: &RegisteredMigration,
        lease: Lease,
        direction: Direction,
        operation: String,
        reason: String,
    ) -> EngineResult<()> {
        let identifier = migration.identifier().to_string();
        self.ledger.fail(lease, &reason)?;
        self.events.emit_migration_failed(&MigrationFailedEvent {
            identifier: identifier.clone(),
            direction,
            operation: operation.clone(),
            error: reason.clone(),
        });
        Err(EngineError::OperationFailed {
            identifier,
            operation,
            reason,
        })
    }

    /// Run operations in order; the first failure names the operation.
    fn execute(&self, operations: &[SchemaOperation]) -> Result<(), (String, String)> {
        for operation in operations {
            if let Err(e) = self.adapter.apply(operation) {
                return Err((operation.kind().to_string(), e.to_string()));
            }
        }
        Ok(())
    }

    fn position_of(&self, identifier: &MigrationId) -> EngineResult<usize> {
        self.registry
            .position(identifier)
            .ok_or_else(|| EngineError::UnknownTarget {
                target: identifier.to_string(),
            })
    }

    fn finish(&self, report: &RunReport, failed: bool) {
        let applied = match report.direction {
            Direction::Up => report.applied(),
            Direction::Down => report.rolled_back(),
        };
        self.events.emit_run_completed(&RunCompletedEvent {
            direction: report.direction,
            applied,
            skipped: report.skipped(),
            failed: usize::from(failed),
            duration_ms: report.duration_ms,
            interrupted: report.interrupted,
        });
    }
}

fn elapsed_ms(since: Instant) -> u64 {
    since.elapsed().as_millis() as u64
}

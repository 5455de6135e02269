//! Run outcome reporting.

use chrono::{DateTime, Utc};
use serde::Serialize;

use strata_core::models::{Direction, MigrationId, MigrationStatus};

/// What happened to one migration during a run.
///
/// A failure has no outcome line: the run returns the error instead, and
/// the ledger record plus the failure event carry the detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationOutcome {
    Applied,
    Skipped,
    RolledBack,
}

impl MigrationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::Skipped => "skipped",
            Self::RolledBack => "rolled_back",
        }
    }
}

/// One migration's line in a run report.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    pub identifier: MigrationId,
    pub outcome: MigrationOutcome,
    pub duration_ms: u64,
}

/// Summary of a forward or rollback run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub direction: Direction,
    pub migrations: Vec<MigrationReport>,
    pub duration_ms: u64,
    /// True when the run stopped at a cancellation checkpoint.
    pub interrupted: bool,
}

impl RunReport {
    pub(crate) fn new(direction: Direction) -> Self {
        Self {
            direction,
            migrations: Vec::new(),
            duration_ms: 0,
            interrupted: false,
        }
    }

    pub(crate) fn push(
        &mut self,
        identifier: MigrationId,
        outcome: MigrationOutcome,
        duration_ms: u64,
    ) {
        self.migrations.push(MigrationReport {
            identifier,
            outcome,
            duration_ms,
        });
    }

    pub fn applied(&self) -> usize {
        self.count(MigrationOutcome::Applied)
    }

    pub fn skipped(&self) -> usize {
        self.count(MigrationOutcome::Skipped)
    }

    pub fn rolled_back(&self) -> usize {
        self.count(MigrationOutcome::RolledBack)
    }

    fn count(&self, outcome: MigrationOutcome) -> usize {
        self.migrations
            .iter()
            .filter(|m| m.outcome == outcome)
            .count()
    }
}

/// One migration's line in the status view: the registry merged with the
/// ledger.
#[derive(Debug, Clone, Serialize)]
pub struct StatusEntry {
    pub identifier: MigrationId,
    /// `Pending` when the ledger has no record.
    pub status: MigrationStatus,
    /// Whether the stored checksum still matches the definition.
    /// `None` when there is nothing to compare.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum_ok: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// False for ledger records whose definition has disappeared from the
    /// registry.
    pub in_registry: bool,
}

//! Ledger records, statuses, and claim leases.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::identifier::MigrationId;

/// Lifecycle status of a migration as tracked by the ledger.
///
/// `Pending` is derived (a registry entry with no ledger row) and never
/// persisted. The only backward transition is `Completed` to `RolledBack`,
/// reached through a down-direction running phase. `RevertFailed` is
/// terminal until an operator reclaims the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationStatus {
    Pending,
    Running,
    Completed,
    Failed,
    RolledBack,
    RevertFailed,
}

impl MigrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::RolledBack => "rolled_back",
            Self::RevertFailed => "revert_failed",
        }
    }

    /// Inverse of `as_str`, for rows read back from storage.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "rolled_back" => Some(Self::RolledBack),
            "revert_failed" => Some(Self::RevertFailed),
            _ => None,
        }
    }

    /// Statuses a forward run treats as still needing work.
    pub fn counts_as_pending(&self) -> bool {
        matches!(self, Self::Pending | Self::Failed | Self::RolledBack)
    }
}

impl fmt::Display for MigrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which operation list a claim executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the migration ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationRecord {
    pub identifier: MigrationId,
    pub checksum: String,
    pub status: MigrationStatus,
    /// Direction of the most recent claim.
    pub direction: Direction,
    /// Token of the active lease while `Running`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lease_token: Option<Uuid>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Failure detail recorded by `fail`, cleared on the next claim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MigrationRecord {
    /// Age of the current claim, for staleness checks.
    pub fn lease_age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.started_at
    }
}

/// Exclusive ownership of one in-flight migration.
///
/// Granted by `Ledger::claim`, consumed by `commit` or `fail`. The token
/// guards against a reclaimed lease finishing a record it no longer owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lease {
    pub identifier: MigrationId,
    pub token: Uuid,
    pub direction: Direction,
}

//! The durable migration record store.

use std::collections::BTreeSet;

use crate::errors::LedgerError;
use crate::models::{Direction, Lease, MigrationId, MigrationRecord};

/// Durable store of migration records.
///
/// `claim` is the sole source of mutual exclusion between concurrent runs.
/// Implementations must back it with a uniqueness constraint enforced by
/// the storage engine itself, not with in-process locking: two processes
/// racing on the same identifier must resolve to exactly one lease.
pub trait Ledger: Send + Sync {
    /// Create the ledger schema if it does not exist.
    fn ensure_ready(&self) -> Result<(), LedgerError>;

    /// Atomically claim `identifier` for execution in `direction`.
    ///
    /// A fresh identifier (up) inserts a `Running` record and returns a
    /// lease. `Failed` and `RolledBack` records are taken over with a new
    /// lease. `Completed` records yield `AlreadyApplied` for up claims
    /// (after checksum verification) and a down lease for down claims.
    /// Contended and unhealthy records surface as `AlreadyRunning`,
    /// `StaleLease`, `ChecksumMismatch`, `RevertFailedResidue`, or
    /// `InvalidTransition`.
    fn claim(
        &self,
        identifier: &MigrationId,
        checksum: &str,
        version: Option<&str>,
        direction: Direction,
    ) -> Result<Lease, LedgerError>;

    /// Mark a claimed migration finished: `Completed` for up leases,
    /// `RolledBack` for down leases.
    fn commit(&self, lease: Lease) -> Result<(), LedgerError>;

    /// Mark a claimed migration failed: `Failed` for up leases,
    /// `RevertFailed` for down leases. Records the error text.
    fn fail(&self, lease: Lease, error: &str) -> Result<(), LedgerError>;

    /// Identifiers of all completed migrations.
    fn list_completed(&self) -> Result<BTreeSet<MigrationId>, LedgerError>;

    /// All records, in identifier order.
    fn records(&self) -> Result<Vec<MigrationRecord>, LedgerError>;

    /// The record for one identifier, if any.
    fn find(&self, identifier: &MigrationId) -> Result<Option<MigrationRecord>, LedgerError>;

    /// Operator-confirmed cleanup. A stale `Running` lease or a
    /// `RevertFailed` residue becomes `Failed`, making the migration
    /// claimable again. Never called automatically; refuses healthy
    /// records with `NotReclaimable`.
    fn reclaim(&self, identifier: &MigrationId) -> Result<MigrationRecord, LedgerError>;
}

//! SqliteLedger tests: the claim decision table, token-guarded commit and
//! fail, staleness, reclaim, ordering, and restart survival.

use std::path::Path;

use chrono::Utc;

use strata_core::config::LedgerConfig;
use strata_core::errors::LedgerError;
use strata_core::models::{Direction, MigrationId, MigrationStatus};
use strata_core::traits::Ledger;
use strata_sqlite::SqliteLedger;

fn id(s: &str) -> MigrationId {
    MigrationId::parse(s).unwrap()
}

fn open_memory() -> SqliteLedger {
    let ledger = SqliteLedger::open_in_memory(&LedgerConfig::default()).unwrap();
    ledger.ensure_ready().unwrap();
    ledger
}

fn open_file(path: &Path) -> SqliteLedger {
    let ledger = SqliteLedger::open(path, &LedgerConfig::default()).unwrap();
    ledger.ensure_ready().unwrap();
    ledger
}

/// Rewrite a row's started_at so a lease looks `secs` seconds old.
fn backdate(path: &Path, identifier: &str, secs: i64) {
    let conn = rusqlite::Connection::open(path).unwrap();
    let past = (Utc::now() - chrono::Duration::seconds(secs)).to_rfc3339();
    conn.execute(
        "UPDATE migrations SET started_at = ?1 WHERE identifier = ?2",
        rusqlite::params![past, identifier],
    )
    .unwrap();
}

// ═══════════════════════════════════════════════════════════════════════════
// CLAIM: fresh rows and the happy path
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn fresh_claim_inserts_running_record() {
    let ledger = open_memory();
    let lease = ledger
        .claim(&id("001-init"), "abc", Some("1.0.0"), Direction::Up)
        .unwrap();
    assert_eq!(lease.identifier, id("001-init"));
    assert_eq!(lease.direction, Direction::Up);

    let record = ledger.find(&id("001-init")).unwrap().unwrap();
    assert_eq!(record.status, MigrationStatus::Running);
    assert_eq!(record.checksum, "abc");
    assert_eq!(record.version.as_deref(), Some("1.0.0"));
    assert_eq!(record.lease_token, Some(lease.token));
    assert!(record.completed_at.is_none());
    assert!(record.error.is_none());
}

#[test]
fn commit_marks_completed_and_clears_lease() {
    let ledger = open_memory();
    let lease = ledger
        .claim(&id("001-init"), "abc", None, Direction::Up)
        .unwrap();
    ledger.commit(lease).unwrap();

    let record = ledger.find(&id("001-init")).unwrap().unwrap();
    assert_eq!(record.status, MigrationStatus::Completed);
    assert!(record.lease_token.is_none());
    assert!(record.completed_at.is_some());

    let completed = ledger.list_completed().unwrap();
    assert!(completed.contains(&id("001-init")));
}

#[test]
fn ensure_ready_is_idempotent() {
    let ledger = open_memory();
    ledger.ensure_ready().unwrap();
    ledger.ensure_ready().unwrap();
}

#[test]
fn completed_up_claim_is_already_applied() {
    let ledger = open_memory();
    let lease = ledger
        .claim(&id("001-init"), "abc", None, Direction::Up)
        .unwrap();
    ledger.commit(lease).unwrap();

    let err = ledger
        .claim(&id("001-init"), "abc", None, Direction::Up)
        .unwrap_err();
    assert!(matches!(err, LedgerError::AlreadyApplied { .. }));
}

#[test]
fn completed_claim_with_edited_definition_is_checksum_mismatch() {
    let ledger = open_memory();
    let lease = ledger
        .claim(&id("001-init"), "abc", None, Direction::Up)
        .unwrap();
    ledger.commit(lease).unwrap();

    let err = ledger
        .claim(&id("001-init"), "DIFFERENT", None, Direction::Up)
        .unwrap_err();
    match err {
        LedgerError::ChecksumMismatch { stored, actual, .. } => {
            assert_eq!(stored, "abc");
            assert_eq!(actual, "DIFFERENT");
        }
        other => panic!("expected ChecksumMismatch, got {other}"),
    }

    // Same protection on the down path.
    let err = ledger
        .claim(&id("001-init"), "DIFFERENT", None, Direction::Down)
        .unwrap_err();
    assert!(matches!(err, LedgerError::ChecksumMismatch { .. }));
}

// ═══════════════════════════════════════════════════════════════════════════
// CLAIM: contention and staleness
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn running_record_refuses_second_claim() {
    let ledger = open_memory();
    let _lease = ledger
        .claim(&id("001-init"), "abc", None, Direction::Up)
        .unwrap();

    let err = ledger
        .claim(&id("001-init"), "abc", None, Direction::Up)
        .unwrap_err();
    assert!(matches!(err, LedgerError::AlreadyRunning { .. }));
}

#[test]
fn old_lease_surfaces_as_stale_not_already_running() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("ledger.db");
    let ledger = open_file(&db);
    let _lease = ledger
        .claim(&id("001-init"), "abc", None, Direction::Up)
        .unwrap();
    backdate(&db, "001-init", 3600);

    let err = ledger
        .claim(&id("001-init"), "abc", None, Direction::Up)
        .unwrap_err();
    match err {
        LedgerError::StaleLease { age_secs, .. } => {
            assert!(age_secs >= 3600, "age must reflect the backdated lease");
        }
        other => panic!("expected StaleLease, got {other}"),
    }
}

#[test]
fn racing_claims_on_same_file_yield_one_lease() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("ledger.db");
    open_file(&db);

    let a = open_file(&db);
    let b = open_file(&db);
    let (ra, rb) = std::thread::scope(|s| {
        let ta = s.spawn(|| a.claim(&id("001-init"), "abc", None, Direction::Up));
        let tb = s.spawn(|| b.claim(&id("001-init"), "abc", None, Direction::Up));
        (ta.join().unwrap(), tb.join().unwrap())
    });

    let wins = [&ra, &rb].iter().filter(|r| r.is_ok()).count();
    assert_eq!(wins, 1, "exactly one process must win the claim");
    let loser = if ra.is_err() { ra } else { rb };
    assert!(matches!(
        loser.unwrap_err(),
        LedgerError::AlreadyRunning { .. }
    ));
}

// ═══════════════════════════════════════════════════════════════════════════
// FAILURE AND RETRY
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn failed_migration_records_error_and_is_claimable_again() {
    let ledger = open_memory();
    let lease = ledger
        .claim(&id("002-add-index"), "abc", None, Direction::Up)
        .unwrap();
    ledger.fail(lease, "index creation exploded").unwrap();

    let record = ledger.find(&id("002-add-index")).unwrap().unwrap();
    assert_eq!(record.status, MigrationStatus::Failed);
    assert_eq!(record.error.as_deref(), Some("index creation exploded"));
    assert!(record.lease_token.is_none());
    assert!(!ledger.list_completed().unwrap().contains(&id("002-add-index")));

    // Retry after fixing the definition: new checksum is accepted and stored.
    let lease = ledger
        .claim(&id("002-add-index"), "fixed", None, Direction::Up)
        .unwrap();
    let record = ledger.find(&id("002-add-index")).unwrap().unwrap();
    assert_eq!(record.status, MigrationStatus::Running);
    assert_eq!(record.checksum, "fixed");
    assert!(record.error.is_none(), "claim must clear the old error");
    ledger.commit(lease).unwrap();
    assert!(ledger.list_completed().unwrap().contains(&id("002-add-index")));
}

#[test]
fn commit_with_superseded_lease_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("ledger.db");
    let ledger = open_file(&db);
    let old_lease = ledger
        .claim(&id("001-init"), "abc", None, Direction::Up)
        .unwrap();
    backdate(&db, "001-init", 3600);
    ledger.reclaim(&id("001-init")).unwrap();

    let err = ledger.commit(old_lease).unwrap_err();
    assert!(matches!(err, LedgerError::LeaseInvalid { .. }));
}

#[test]
fn fail_with_superseded_lease_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("ledger.db");
    let ledger = open_file(&db);
    let old_lease = ledger
        .claim(&id("001-init"), "abc", None, Direction::Up)
        .unwrap();
    backdate(&db, "001-init", 3600);
    ledger.reclaim(&id("001-init")).unwrap();

    let err = ledger.fail(old_lease, "too late").unwrap_err();
    assert!(matches!(err, LedgerError::LeaseInvalid { .. }));
}

// ═══════════════════════════════════════════════════════════════════════════
// ROLLBACK TRANSITIONS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn down_claim_reverts_completed_to_rolled_back() {
    let ledger = open_memory();
    let lease = ledger
        .claim(&id("001-init"), "abc", None, Direction::Up)
        .unwrap();
    ledger.commit(lease).unwrap();

    let lease = ledger
        .claim(&id("001-init"), "abc", None, Direction::Down)
        .unwrap();
    assert_eq!(lease.direction, Direction::Down);
    ledger.commit(lease).unwrap();

    let record = ledger.find(&id("001-init")).unwrap().unwrap();
    assert_eq!(record.status, MigrationStatus::RolledBack);
    assert!(!ledger.list_completed().unwrap().contains(&id("001-init")));

    // A rolled-back migration is pending again for forward runs.
    let lease = ledger
        .claim(&id("001-init"), "abc", None, Direction::Up)
        .unwrap();
    ledger.commit(lease).unwrap();
    assert!(ledger.list_completed().unwrap().contains(&id("001-init")));
}

#[test]
fn down_claim_needs_a_completed_record() {
    let ledger = open_memory();
    let err = ledger
        .claim(&id("001-init"), "abc", None, Direction::Down)
        .unwrap_err();
    assert!(matches!(err, LedgerError::RecordNotFound { .. }));

    let lease = ledger
        .claim(&id("001-init"), "abc", None, Direction::Up)
        .unwrap();
    ledger.fail(lease, "boom").unwrap();
    let err = ledger
        .claim(&id("001-init"), "abc", None, Direction::Down)
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidTransition { .. }));
}

#[test]
fn failed_revert_blocks_everything_until_reclaimed() {
    let ledger = open_memory();
    let lease = ledger
        .claim(&id("001-init"), "abc", None, Direction::Up)
        .unwrap();
    ledger.commit(lease).unwrap();
    let lease = ledger
        .claim(&id("001-init"), "abc", None, Direction::Down)
        .unwrap();
    ledger.fail(lease, "drop refused").unwrap();

    let record = ledger.find(&id("001-init")).unwrap().unwrap();
    assert_eq!(record.status, MigrationStatus::RevertFailed);

    for direction in [Direction::Up, Direction::Down] {
        let err = ledger
            .claim(&id("001-init"), "abc", None, direction)
            .unwrap_err();
        assert!(
            matches!(err, LedgerError::RevertFailedResidue { .. }),
            "revert residue must block {direction} claims"
        );
    }

    let reclaimed = ledger.reclaim(&id("001-init")).unwrap();
    assert_eq!(reclaimed.status, MigrationStatus::Failed);
    assert_eq!(
        reclaimed.error.as_deref(),
        Some("drop refused"),
        "reclaim must preserve the failure detail"
    );

    // Claimable again after the operator stepped in.
    ledger
        .claim(&id("001-init"), "abc", None, Direction::Up)
        .unwrap();
}

// ═══════════════════════════════════════════════════════════════════════════
// RECLAIM GUARDS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn reclaim_refuses_healthy_records() {
    let ledger = open_memory();
    let err = ledger.reclaim(&id("001-init")).unwrap_err();
    assert!(matches!(err, LedgerError::RecordNotFound { .. }));

    // Fresh running lease: the owner may just be slow.
    let lease = ledger
        .claim(&id("001-init"), "abc", None, Direction::Up)
        .unwrap();
    let err = ledger.reclaim(&id("001-init")).unwrap_err();
    assert!(matches!(err, LedgerError::NotReclaimable { .. }));

    ledger.commit(lease).unwrap();
    let err = ledger.reclaim(&id("001-init")).unwrap_err();
    assert!(matches!(err, LedgerError::NotReclaimable { .. }));
}

#[test]
fn reclaim_clears_stale_lease_to_failed() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("ledger.db");
    let ledger = open_file(&db);
    ledger
        .claim(&id("001-init"), "abc", None, Direction::Up)
        .unwrap();
    backdate(&db, "001-init", 3600);

    let reclaimed = ledger.reclaim(&id("001-init")).unwrap();
    assert_eq!(reclaimed.status, MigrationStatus::Failed);
    assert!(reclaimed.lease_token.is_none());

    // The migration is claimable by the next run.
    ledger
        .claim(&id("001-init"), "abc", None, Direction::Up)
        .unwrap();
}

// ═══════════════════════════════════════════════════════════════════════════
// ORDERING, CONFIGURATION, PERSISTENCE
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn records_come_back_in_sequence_order_not_text_order() {
    let ledger = open_memory();
    for name in ["10-ten", "2-two", "001-one"] {
        let lease = ledger.claim(&id(name), "abc", None, Direction::Up).unwrap();
        ledger.commit(lease).unwrap();
    }

    let records = ledger.records().unwrap();
    let names: Vec<String> = records.iter().map(|r| r.identifier.to_string()).collect();
    assert_eq!(names, ["001-one", "2-two", "10-ten"]);
}

#[test]
fn custom_table_name_is_honored() {
    let config = LedgerConfig {
        table: Some("schema_history".to_string()),
        ..Default::default()
    };
    let ledger = SqliteLedger::open_in_memory(&config).unwrap();
    ledger.ensure_ready().unwrap();
    let lease = ledger
        .claim(&id("001-init"), "abc", None, Direction::Up)
        .unwrap();
    ledger.commit(lease).unwrap();
    assert!(ledger.list_completed().unwrap().contains(&id("001-init")));
}

#[test]
fn hostile_table_name_is_rejected_at_open() {
    let config = LedgerConfig {
        table: Some("migrations; DROP TABLE x".to_string()),
        ..Default::default()
    };
    let err = SqliteLedger::open_in_memory(&config).unwrap_err();
    assert!(matches!(err, LedgerError::Backend { .. }));
}

#[test]
fn ledger_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("ledger.db");

    {
        let ledger = open_file(&db);
        let lease = ledger
            .claim(&id("001-init"), "abc", Some("1.0.0"), Direction::Up)
            .unwrap();
        ledger.commit(lease).unwrap();
        let lease = ledger
            .claim(&id("002-add-index"), "def", None, Direction::Up)
            .unwrap();
        ledger.fail(lease, "boom").unwrap();
    }

    {
        let ledger = open_file(&db);
        let completed = ledger.list_completed().unwrap();
        assert!(completed.contains(&id("001-init")));
        assert!(!completed.contains(&id("002-add-index")));

        let record = ledger.find(&id("002-add-index")).unwrap().unwrap();
        assert_eq!(record.status, MigrationStatus::Failed);
        assert_eq!(record.error.as_deref(), Some("boom"));

        let record = ledger.find(&id("001-init")).unwrap().unwrap();
        assert_eq!(record.version.as_deref(), Some("1.0.0"));
    }

    dir.close().unwrap();
}

use strata_core::errors::*;
use strata_core::models::{Direction, MigrationStatus};

#[test]
fn registry_duplicate_identifier_carries_name() {
    let err = RegistryError::DuplicateIdentifier {
        identifier: "001-initial-schema".into(),
    };
    assert!(err.to_string().contains("001-initial-schema"));
}

#[test]
fn registry_duplicate_sequence_names_both_files() {
    let err = RegistryError::DuplicateSequence {
        sequence: 1,
        first: "001-initial-schema".into(),
        second: "001-create-users".into(),
    };
    let msg = err.to_string();
    assert!(msg.contains("001-initial-schema"));
    assert!(msg.contains("001-create-users"));
}

#[test]
fn ledger_stale_lease_carries_age() {
    let err = LedgerError::StaleLease {
        identifier: "002-seed-users".into(),
        age_secs: 3600,
    };
    let msg = err.to_string();
    assert!(msg.contains("002-seed-users"));
    assert!(msg.contains("3600"));
}

#[test]
fn ledger_checksum_mismatch_carries_both_hashes() {
    let err = LedgerError::ChecksumMismatch {
        identifier: "001-initial-schema".into(),
        stored: "aaaa".into(),
        actual: "bbbb".into(),
    };
    let msg = err.to_string();
    assert!(msg.contains("aaaa"));
    assert!(msg.contains("bbbb"));
}

#[test]
fn ledger_invalid_transition_names_status_and_direction() {
    let err = LedgerError::InvalidTransition {
        identifier: "003-add-orders".into(),
        status: MigrationStatus::Failed,
        direction: Direction::Down,
    };
    let msg = err.to_string();
    assert!(msg.contains("failed"));
    assert!(msg.contains("down"));
}

// --- From impls ---

#[test]
fn ledger_error_converts_to_engine_error() {
    let ledger_err = LedgerError::AlreadyRunning {
        identifier: "001-initial-schema".into(),
    };
    let engine_err: EngineError = ledger_err.into();
    assert!(matches!(engine_err, EngineError::Ledger(_)));
}

#[test]
fn registry_error_converts_to_engine_error() {
    let registry_err = RegistryError::DuplicateIdentifier {
        identifier: "001-x1".into(),
    };
    let engine_err: EngineError = registry_err.into();
    assert!(matches!(engine_err, EngineError::Registry(_)));
}

#[test]
fn identifier_error_converts_to_registry_error() {
    let parse_err = strata_core::MigrationId::parse("banana").unwrap_err();
    let registry_err: RegistryError = parse_err.into();
    assert!(matches!(registry_err, RegistryError::InvalidIdentifier { .. }));
}

// --- Error codes and exit codes ---

#[test]
fn exit_codes_are_distinct_per_failure_class() {
    let cases: Vec<(EngineError, i32)> = vec![
        (
            EngineError::OperationFailed {
                identifier: "001-x1".into(),
                operation: "create_index".into(),
                reason: "boom".into(),
            },
            1,
        ),
        (
            EngineError::Registry(RegistryError::DuplicateIdentifier {
                identifier: "001-x1".into(),
            }),
            2,
        ),
        (
            EngineError::ConcurrentRunDetected {
                identifier: "001-x1".into(),
            },
            3,
        ),
        (
            EngineError::Ledger(LedgerError::ChecksumMismatch {
                identifier: "001-x1".into(),
                stored: "a".into(),
                actual: "b".into(),
            }),
            4,
        ),
        (
            EngineError::IrreversibleMigration {
                identifier: "001-x1".into(),
            },
            5,
        ),
        (
            EngineError::StaleLeaseDetected {
                identifier: "001-x1".into(),
                age_secs: 9000,
            },
            6,
        ),
        (
            EngineError::Ledger(LedgerError::backend("disk full")),
            7,
        ),
        (
            EngineError::Config(ConfigError::FileNotFound {
                path: "strata.toml".into(),
            }),
            8,
        ),
    ];
    for (err, expected) in cases {
        assert_eq!(err.exit_code(), expected, "wrong exit code for {err}");
    }
}

#[test]
fn error_codes_are_stable_strings() {
    let err = EngineError::ConcurrentRunDetected {
        identifier: "001-x1".into(),
    };
    assert_eq!(err.error_code(), "CONCURRENT_RUN");

    let err = EngineError::Ledger(LedgerError::RevertFailedResidue {
        identifier: "001-x1".into(),
    });
    assert_eq!(err.error_code(), "REVERT_FAILED");

    let err = EngineError::Registry(RegistryError::InvalidIdentifier {
        source: strata_core::MigrationId::parse("banana").unwrap_err(),
    });
    assert_eq!(err.error_code(), "INVALID_IDENTIFIER");
}

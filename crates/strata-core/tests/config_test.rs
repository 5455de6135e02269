use std::sync::Mutex;

use strata_core::config::*;
use strata_core::errors::ConfigError;

/// Serializes tests that touch STRATA_* environment variables.
static ENV_MUTEX: Mutex<()> = Mutex::new(());

fn clear_strata_env_vars() {
    for key in [
        "STRATA_DATABASE",
        "STRATA_MIGRATIONS_DIR",
        "STRATA_LEDGER_TABLE",
        "STRATA_STALE_AFTER_SECS",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn config_loads_from_empty_toml_with_all_defaults() {
    let config = StrataConfig::from_toml("").unwrap();
    assert!(config.database.path.is_none());
    assert_eq!(config.ledger.effective_table(), "migrations");
    assert_eq!(config.ledger.effective_stale_after_secs(), 1800);
    assert_eq!(config.definitions.effective_dir(), "migrations");
}

#[test]
fn config_loads_partial_toml_with_overrides() {
    let toml = r#"
[database]
path = "app.sqlite"

[ledger]
stale_after_secs = 600
"#;
    let config = StrataConfig::from_toml(toml).unwrap();
    assert_eq!(config.database.path.as_deref(), Some("app.sqlite"));
    assert_eq!(config.ledger.effective_stale_after_secs(), 600);
    // Non-overridden fields keep defaults
    assert_eq!(config.ledger.effective_table(), "migrations");
    assert_eq!(config.definitions.effective_dir(), "migrations");
}

#[test]
fn config_rejects_zero_staleness_window() {
    let result = StrataConfig::from_toml("[ledger]\nstale_after_secs = 0\n");
    assert!(matches!(
        result,
        Err(ConfigError::ValidationFailed { field, .. }) if field == "ledger.stale_after_secs"
    ));
}

#[test]
fn config_rejects_bad_table_name() {
    let result = StrataConfig::from_toml("[ledger]\ntable = \"Migrations; drop\"\n");
    assert!(matches!(
        result,
        Err(ConfigError::ValidationFailed { field, .. }) if field == "ledger.table"
    ));
}

#[test]
fn config_rejects_empty_definitions_dir() {
    let result = StrataConfig::from_toml("[definitions]\ndir = \"\"\n");
    assert!(matches!(
        result,
        Err(ConfigError::ValidationFailed { field, .. }) if field == "definitions.dir"
    ));
}

#[test]
fn config_rejects_unparseable_toml() {
    let result = StrataConfig::from_toml("[ledger\ntable = ");
    assert!(matches!(result, Err(ConfigError::ParseError { .. })));
}

#[test]
fn cli_overrides_take_precedence_over_file_values() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_strata_env_vars();

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("strata.toml"),
        "[database]\npath = \"from-file.sqlite\"\n[ledger]\ntable = \"file_table\"\n",
    )
    .unwrap();

    let cli = CliOverrides {
        database: Some("from-cli.sqlite".into()),
        ..CliOverrides::default()
    };
    let config = StrataConfig::load(dir.path(), Some(&cli)).unwrap();
    assert_eq!(config.database.path.as_deref(), Some("from-cli.sqlite"));
    // File value survives where the CLI says nothing.
    assert_eq!(config.ledger.effective_table(), "file_table");
}

#[test]
fn env_values_beat_file_values() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_strata_env_vars();

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("strata.toml"),
        "[ledger]\ntable = \"file_table\"\nstale_after_secs = 600\n",
    )
    .unwrap();
    std::env::set_var("STRATA_LEDGER_TABLE", "env_table");

    let config = StrataConfig::load(dir.path(), None).unwrap();
    assert_eq!(config.ledger.effective_table(), "env_table");
    // File value survives where the environment says nothing.
    assert_eq!(config.ledger.effective_stale_after_secs(), 600);

    clear_strata_env_vars();
}

#[test]
fn cli_flags_beat_env_and_file_values() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_strata_env_vars();

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("strata.toml"),
        "[database]\npath = \"from-file.sqlite\"\n",
    )
    .unwrap();
    std::env::set_var("STRATA_DATABASE", "from-env.sqlite");
    std::env::set_var("STRATA_STALE_AFTER_SECS", "900");

    let cli = CliOverrides {
        database: Some("from-cli.sqlite".into()),
        ..CliOverrides::default()
    };
    let config = StrataConfig::load(dir.path(), Some(&cli)).unwrap();
    assert_eq!(config.database.path.as_deref(), Some("from-cli.sqlite"));
    assert_eq!(config.ledger.effective_stale_after_secs(), 900);

    clear_strata_env_vars();
}

#[test]
fn load_without_project_file_uses_defaults() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_strata_env_vars();

    let dir = tempfile::tempdir().unwrap();
    let config = StrataConfig::load(dir.path(), None).unwrap();
    assert_eq!(config.ledger.effective_table(), "migrations");
}

#[test]
fn config_serde_roundtrip() {
    let config = StrataConfig::from_toml("[ledger]\ntable = \"schema_history\"\n").unwrap();
    let toml_str = toml::to_string(&config).unwrap();
    let roundtripped = StrataConfig::from_toml(&toml_str).unwrap();
    assert_eq!(roundtripped.ledger.effective_table(), "schema_history");
}

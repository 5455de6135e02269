//! Top-level strata configuration with layered resolution.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{DatabaseConfig, DefinitionsConfig, LedgerConfig};
use crate::errors::ConfigError;

/// Top-level configuration aggregating all sub-configs.
///
/// Resolution order (highest priority first):
/// 1. CLI flags (applied via `apply_cli_overrides`)
/// 2. Environment variables (`STRATA_*`)
/// 3. Project config (`strata.toml` in the project root)
/// 4. Compiled defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StrataConfig {
    pub database: DatabaseConfig,
    pub ledger: LedgerConfig,
    pub definitions: DefinitionsConfig,
}

/// CLI override arguments that can be applied to a config.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub database: Option<String>,
    pub definitions_dir: Option<String>,
    pub ledger_table: Option<String>,
    pub stale_after_secs: Option<u64>,
}

impl StrataConfig {
    /// Load configuration with layered resolution.
    ///
    /// Resolution order (highest priority first):
    /// 1. CLI flags
    /// 2. Environment variables (`STRATA_*`)
    /// 3. Project config (`strata.toml` in `root`)
    /// 4. Compiled defaults
    pub fn load(root: &Path, cli_overrides: Option<&CliOverrides>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let project_config_path = root.join("strata.toml");
        if project_config_path.exists() {
            Self::merge_toml_file(&mut config, &project_config_path)?;
        }

        Self::apply_env_overrides(&mut config);

        if let Some(cli) = cli_overrides {
            Self::apply_cli_overrides(&mut config, cli);
        }

        Self::validate(&config)?;

        Ok(config)
    }

    /// Load configuration from a TOML string (for testing).
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str).map_err(|e| ConfigError::ParseError {
            path: "<string>".to_string(),
            message: e.to_string(),
        })?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate the configuration values.
    pub fn validate(config: &StrataConfig) -> Result<(), ConfigError> {
        if let Some(secs) = config.ledger.stale_after_secs {
            if secs == 0 {
                return Err(ConfigError::ValidationFailed {
                    field: "ledger.stale_after_secs".to_string(),
                    message: "must be greater than 0".to_string(),
                });
            }
        }
        if let Some(ref table) = config.ledger.table {
            if !is_valid_table_name(table) {
                return Err(ConfigError::ValidationFailed {
                    field: "ledger.table".to_string(),
                    message: "must match [a-z_][a-z0-9_]*".to_string(),
                });
            }
        }
        if let Some(ref dir) = config.definitions.dir {
            if dir.is_empty() {
                return Err(ConfigError::ValidationFailed {
                    field: "definitions.dir".to_string(),
                    message: "must not be empty".to_string(),
                });
            }
        }
        if let Some(ref path) = config.database.path {
            if path.is_empty() {
                return Err(ConfigError::ValidationFailed {
                    field: "database.path".to_string(),
                    message: "must not be empty".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Merge a TOML file into the existing config.
    /// Unknown keys are silently ignored (forward-compatible).
    fn merge_toml_file(config: &mut StrataConfig, path: &Path) -> Result<(), ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
                path: path.display().to_string(),
            })?;

        let file_config: StrataConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        Self::merge(config, &file_config);
        Ok(())
    }

    /// Merge `other` into `base`, where `other` values override `base`
    /// values only when `other` has a `Some` value.
    fn merge(base: &mut StrataConfig, other: &StrataConfig) {
        if other.database.path.is_some() {
            base.database.path = other.database.path.clone();
        }
        if other.ledger.table.is_some() {
            base.ledger.table = other.ledger.table.clone();
        }
        if other.ledger.stale_after_secs.is_some() {
            base.ledger.stale_after_secs = other.ledger.stale_after_secs;
        }
        if other.definitions.dir.is_some() {
            base.definitions.dir = other.definitions.dir.clone();
        }
    }

    /// Apply environment variable overrides.
    /// Pattern: `STRATA_DATABASE`, `STRATA_LEDGER_TABLE`, etc.
    fn apply_env_overrides(config: &mut StrataConfig) {
        if let Ok(val) = std::env::var("STRATA_DATABASE") {
            config.database.path = Some(val);
        }
        if let Ok(val) = std::env::var("STRATA_MIGRATIONS_DIR") {
            config.definitions.dir = Some(val);
        }
        if let Ok(val) = std::env::var("STRATA_LEDGER_TABLE") {
            config.ledger.table = Some(val);
        }
        if let Ok(val) = std::env::var("STRATA_STALE_AFTER_SECS") {
            if let Ok(v) = val.parse::<u64>() {
                config.ledger.stale_after_secs = Some(v);
            }
        }
    }

    /// Apply CLI overrides (highest priority).
    fn apply_cli_overrides(config: &mut StrataConfig, cli: &CliOverrides) {
        if let Some(ref v) = cli.database {
            config.database.path = Some(v.clone());
        }
        if let Some(ref v) = cli.definitions_dir {
            config.definitions.dir = Some(v.clone());
        }
        if let Some(ref v) = cli.ledger_table {
            config.ledger.table = Some(v.clone());
        }
        if let Some(v) = cli.stale_after_secs {
            config.ledger.stale_after_secs = Some(v);
        }
    }
}

fn is_valid_table_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some('a'..='z') | Some('_') => {}
        _ => return false,
    }
    chars.all(|c| matches!(c, 'a'..='z' | '0'..='9' | '_'))
}

//! Layered configuration: defaults, project file, environment, CLI.

pub mod database_config;
pub mod definitions_config;
pub mod ledger_config;
pub mod strata_config;

pub use database_config::DatabaseConfig;
pub use definitions_config::DefinitionsConfig;
pub use ledger_config::LedgerConfig;
pub use strata_config::{CliOverrides, StrataConfig};

//! Database connection configuration.

use serde::{Deserialize, Serialize};

/// Where the target database lives.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path to the database file. `:memory:` is accepted for throwaway
    /// runs. No default: a missing path is a validation error once a
    /// command actually needs the database.
    pub path: Option<String>,
}

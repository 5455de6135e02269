//! Ledger configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the migration ledger.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LedgerConfig {
    /// Ledger table name. Default: `migrations`.
    pub table: Option<String>,
    /// Seconds before a running lease counts as stale. Default: 1800.
    pub stale_after_secs: Option<u64>,
}

impl LedgerConfig {
    /// Returns the effective table name, defaulting to `migrations`.
    pub fn effective_table(&self) -> &str {
        self.table.as_deref().unwrap_or("migrations")
    }

    /// Returns the effective staleness window, defaulting to 1800 seconds.
    pub fn effective_stale_after_secs(&self) -> u64 {
        self.stale_after_secs.unwrap_or(1800)
    }
}

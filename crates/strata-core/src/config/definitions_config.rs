//! Definition source configuration.

use serde::{Deserialize, Serialize};

/// Where migration definition files live.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DefinitionsConfig {
    /// Directory of definition JSON files, relative to the project root.
    /// Default: `migrations`.
    pub dir: Option<String>,
}

impl DefinitionsConfig {
    /// Returns the effective definitions directory, defaulting to
    /// `migrations`.
    pub fn effective_dir(&self) -> &str {
        self.dir.as_deref().unwrap_or("migrations")
    }
}

//! Ordered registry of migration definitions.

use std::fs;
use std::path::{Path, PathBuf};

use strata_core::errors::RegistryError;
use strata_core::models::{MigrationDefinition, MigrationId};

/// Where definitions come from.
#[derive(Debug, Clone)]
pub enum DefinitionSource {
    /// A directory of `*.json` definition files, one per migration,
    /// file stem equal to the identifier. Other files are ignored.
    Directory(PathBuf),
    /// Definitions built in code.
    Embedded(Vec<MigrationDefinition>),
}

/// A validated definition with its content checksum, fixed at load time.
#[derive(Debug, Clone)]
pub struct RegisteredMigration {
    pub definition: MigrationDefinition,
    pub checksum: String,
}

impl RegisteredMigration {
    pub fn identifier(&self) -> &MigrationId {
        &self.definition.identifier
    }
}

/// Ordered, validated set of migration definitions.
///
/// Loading fails on the first duplicate identifier, duplicate sequence
/// number, malformed file name, or unparseable file. A registry that loads
/// is safe to execute front to back; nothing here mutates any store.
#[derive(Debug, Default)]
pub struct Registry {
    migrations: Vec<RegisteredMigration>,
}

impl Registry {
    pub fn load(source: DefinitionSource) -> Result<Self, RegistryError> {
        let definitions = match source {
            DefinitionSource::Directory(dir) => load_directory(&dir)?,
            DefinitionSource::Embedded(definitions) => definitions,
        };
        Self::from_definitions(definitions)
    }

    fn from_definitions(definitions: Vec<MigrationDefinition>) -> Result<Self, RegistryError> {
        let mut migrations = Vec::with_capacity(definitions.len());
        for definition in definitions {
            let checksum = definition.checksum()?;
            migrations.push(RegisteredMigration {
                definition,
                checksum,
            });
        }
        migrations.sort_by(|a, b| a.identifier().cmp(b.identifier()));

        // Collisions are adjacent after sorting.
        for pair in migrations.windows(2) {
            let (a, b) = (pair[0].identifier(), pair[1].identifier());
            if a == b {
                return Err(RegistryError::DuplicateIdentifier {
                    identifier: a.to_string(),
                });
            }
            if a.sequence() == b.sequence() {
                return Err(RegistryError::DuplicateSequence {
                    sequence: a.sequence(),
                    first: a.to_string(),
                    second: b.to_string(),
                });
            }
        }

        tracing::debug!(count = migrations.len(), "migration registry loaded");
        Ok(Self { migrations })
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }

    /// All migrations in execution order.
    pub fn migrations(&self) -> &[RegisteredMigration] {
        &self.migrations
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredMigration> {
        self.migrations.iter()
    }

    pub fn find(&self, identifier: &MigrationId) -> Option<&RegisteredMigration> {
        self.migrations
            .iter()
            .find(|m| m.identifier() == identifier)
    }

    /// Position in execution order.
    pub fn position(&self, identifier: &MigrationId) -> Option<usize> {
        self.migrations
            .iter()
            .position(|m| m.identifier() == identifier)
    }

    pub fn contains(&self, identifier: &MigrationId) -> bool {
        self.position(identifier).is_some()
    }
}

fn load_directory(dir: &Path) -> Result<Vec<MigrationDefinition>, RegistryError> {
    let dir_err = |e: std::io::Error| RegistryError::Io {
        path: dir.to_path_buf(),
        message: e.to_string(),
    };

    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(dir_err)? {
        let path = entry.map_err(dir_err)?.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut definitions = Vec::with_capacity(paths.len());
    for path in paths {
        // The file name is the identifier; validate it before reading so a
        // badly named file is reported as such, not as a content error.
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        let file_id = MigrationId::parse(stem)?;

        let content = fs::read_to_string(&path).map_err(|e| RegistryError::Io {
            path: path.clone(),
            message: e.to_string(),
        })?;
        let definition: MigrationDefinition =
            serde_json::from_str(&content).map_err(|e| RegistryError::Parse {
                path: path.clone(),
                message: e.to_string(),
            })?;

        if definition.identifier != file_id {
            return Err(RegistryError::IdentifierMismatch {
                path,
                identifier: definition.identifier.to_string(),
            });
        }
        definitions.push(definition);
    }
    Ok(definitions)
}

//! Definition checksums.
//!
//! blake3 over length-delimited sections: identifier, version tag, forward
//! operations, reverse operations. The ledger stores the checksum at claim
//! time and compares on later runs, so a definition silently edited after
//! being applied is caught instead of re-applied.

use crate::errors::DefinitionError;
use crate::models::MigrationDefinition;

/// Hex-encoded blake3 checksum of a definition's content.
///
/// The free-text `description` is excluded: editing prose does not change
/// what the migration does.
pub fn definition_checksum(definition: &MigrationDefinition) -> Result<String, DefinitionError> {
    let encode_err = |e: serde_json::Error| DefinitionError::Encode {
        identifier: definition.identifier.to_string(),
        message: e.to_string(),
    };

    let mut hasher = blake3::Hasher::new();
    feed(&mut hasher, definition.identifier.as_str().as_bytes());
    feed(
        &mut hasher,
        definition.version.as_deref().unwrap_or("").as_bytes(),
    );
    let up = serde_json::to_vec(&definition.up).map_err(encode_err)?;
    feed(&mut hasher, &up);
    let down = serde_json::to_vec(&definition.down).map_err(encode_err)?;
    feed(&mut hasher, &down);
    Ok(hasher.finalize().to_hex().to_string())
}

// Length prefix keeps adjacent sections from colliding.
fn feed(hasher: &mut blake3::Hasher, bytes: &[u8]) {
    hasher.update(&(bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

impl MigrationDefinition {
    /// See [`definition_checksum`].
    pub fn checksum(&self) -> Result<String, DefinitionError> {
        definition_checksum(self)
    }
}

//! Core data models: identifiers, definitions, ledger records.

pub mod definition;
pub mod identifier;
pub mod record;

pub use definition::{IndexKey, IndexOptions, KeyOrder, MigrationDefinition, SchemaOperation};
pub use identifier::{IdentifierError, MigrationId};
pub use record::{Direction, Lease, MigrationRecord, MigrationStatus};

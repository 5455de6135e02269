//! # strata-core
//!
//! Foundation crate for the strata migration engine.
//! Defines all types, traits, errors, config, and events.
//! Every other crate in the workspace depends on this.

pub mod checksum;
pub mod config;
pub mod errors;
pub mod events;
pub mod models;
pub mod traits;

// Re-export the most commonly used types at the crate root.
pub use checksum::definition_checksum;
pub use config::{CliOverrides, StrataConfig};
pub use errors::{EngineError, EngineResult, LedgerError, RegistryError, StrataErrorCode};
pub use events::{EventDispatcher, MigrationEventHandler, TracingHandler};
pub use models::{
    Direction, IndexKey, IndexOptions, KeyOrder, Lease, MigrationDefinition, MigrationId,
    MigrationRecord, MigrationStatus, SchemaOperation,
};
pub use traits::{Cancellable, CancellationToken, Ledger, SchemaAdapter};

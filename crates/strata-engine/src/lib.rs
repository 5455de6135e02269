//! # strata-engine
//!
//! The migration engine: registry loading and validation, the sequential
//! run state machine, and run/status reporting. Storage backends and the
//! CLI live in their own crates; this one is pure orchestration over the
//! `Ledger` and `SchemaAdapter` traits.

pub mod registry;
pub mod report;
pub mod runner;

pub use registry::{DefinitionSource, RegisteredMigration, Registry};
pub use report::{MigrationOutcome, MigrationReport, RunReport, StatusEntry};
pub use runner::Runner;

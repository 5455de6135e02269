//! Migration run lifecycle events.
//!
//! The runner emits typed events through an [`EventDispatcher`]; handlers
//! turn them into logs, progress bars, or metrics. The shipped
//! [`TracingHandler`] maps them to leveled `tracing` events.

pub mod dispatcher;
pub mod handler;
pub mod types;

pub use dispatcher::EventDispatcher;
pub use handler::{MigrationEventHandler, TracingHandler};
pub use types::{
    MigrationAppliedEvent, MigrationFailedEvent, MigrationRolledBackEvent, MigrationSkippedEvent,
    MigrationStartedEvent, RunCompletedEvent, RunStartedEvent, StaleLeaseEvent,
};

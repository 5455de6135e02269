//! Synchronous event dispatch with zero overhead when empty.

use std::sync::Arc;

use super::handler::MigrationEventHandler;
use super::types::*;

/// Synchronous event dispatcher wrapping a list of handlers.
///
/// When no handlers are registered, `emit` iterates over an empty Vec.
pub struct EventDispatcher {
    handlers: Vec<Arc<dyn MigrationEventHandler>>,
}

impl EventDispatcher {
    /// Create a new empty dispatcher.
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Register an event handler.
    pub fn register(&mut self, handler: Arc<dyn MigrationEventHandler>) {
        self.handlers.push(handler);
    }

    /// Returns the number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Emit an event to all registered handlers.
    /// Handlers that panic are caught and do not prevent subsequent
    /// handlers from receiving the event.
    fn emit<F: Fn(&dyn MigrationEventHandler)>(&self, f: F) {
        for handler in &self.handlers {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                f(handler.as_ref());
            }));
            if result.is_err() {
                tracing::warn!("migration event handler panicked");
            }
        }
    }

    pub fn emit_run_started(&self, event: &RunStartedEvent) {
        self.emit(|h| h.on_run_started(event));
    }

    pub fn emit_migration_started(&self, event: &MigrationStartedEvent) {
        self.emit(|h| h.on_migration_started(event));
    }

    pub fn emit_migration_applied(&self, event: &MigrationAppliedEvent) {
        self.emit(|h| h.on_migration_applied(event));
    }

    pub fn emit_migration_skipped(&self, event: &MigrationSkippedEvent) {
        self.emit(|h| h.on_migration_skipped(event));
    }

    pub fn emit_migration_failed(&self, event: &MigrationFailedEvent) {
        self.emit(|h| h.on_migration_failed(event));
    }

    pub fn emit_migration_rolled_back(&self, event: &MigrationRolledBackEvent) {
        self.emit(|h| h.on_migration_rolled_back(event));
    }

    pub fn emit_stale_lease(&self, event: &StaleLeaseEvent) {
        self.emit(|h| h.on_stale_lease(event));
    }

    pub fn emit_run_completed(&self, event: &RunCompletedEvent) {
        self.emit(|h| h.on_run_completed(event));
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

//! Seams implemented outside the engine: record store, schema adapter,
//! cancellation.

pub mod adapter;
pub mod cancellation;
pub mod ledger;

pub use adapter::SchemaAdapter;
pub use cancellation::{Cancellable, CancellationToken};
pub use ledger::Ledger;

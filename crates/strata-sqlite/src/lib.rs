//! # strata-sqlite
//!
//! SQLite-backed implementations of the core storage traits: the
//! migration ledger ([`SqliteLedger`]) and an embedded document-store
//! catalog ([`SqliteCatalog`]). Both speak plain synchronous `rusqlite`
//! and can share one database file; WAL mode keeps a runner's ledger
//! writes and catalog writes from blocking each other.

pub mod catalog;
pub mod ledger;
pub mod pragmas;

pub use catalog::SqliteCatalog;
pub use ledger::SqliteLedger;

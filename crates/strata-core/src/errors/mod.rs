//! Error handling for strata.
//! One error enum per subsystem, `thiserror` only, zero `anyhow`.

pub mod adapter_error;
pub mod config_error;
pub mod definition_error;
pub mod engine_error;
pub mod error_code;
pub mod ledger_error;
pub mod registry_error;

pub use adapter_error::AdapterError;
pub use config_error::ConfigError;
pub use definition_error::DefinitionError;
pub use engine_error::{EngineError, EngineResult};
pub use error_code::StrataErrorCode;
pub use ledger_error::LedgerError;
pub use registry_error::RegistryError;

//! Definition model errors.

use super::error_code::{self, StrataErrorCode};

/// Errors raised by definition handling outside parsing.
#[derive(Debug, thiserror::Error)]
pub enum DefinitionError {
    #[error("failed to encode operations of {identifier} for checksum: {message}")]
    Encode { identifier: String, message: String },
}

impl StrataErrorCode for DefinitionError {
    fn error_code(&self) -> &'static str {
        error_code::REGISTRY_ERROR
    }

    fn exit_code(&self) -> i32 {
        error_code::exit::REGISTRY
    }
}

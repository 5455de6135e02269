//! Registry load errors. All of these are fatal before any mutation:
//! a registry that fails validation never reaches the runner.

use std::path::PathBuf;

use super::error_code::{self, StrataErrorCode};
use super::DefinitionError;
use crate::models::IdentifierError;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Two definitions share one identifier. Never a silent override.
    #[error("duplicate identifier {identifier:?}")]
    DuplicateIdentifier { identifier: String },

    /// Two definitions share a sequence number, so their relative order
    /// would be ambiguous.
    #[error("sequence {sequence} is claimed by both {first:?} and {second:?}")]
    DuplicateSequence {
        sequence: u32,
        first: String,
        second: String,
    },

    #[error("invalid identifier: {source}")]
    InvalidIdentifier {
        #[from]
        source: IdentifierError,
    },

    /// A definition file whose stem disagrees with its embedded identifier.
    #[error("file {path} declares identifier {identifier:?}, which does not match its file name")]
    IdentifierMismatch { path: PathBuf, identifier: String },

    #[error("failed to read {path}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("definition error: {0}")]
    Definition(#[from] DefinitionError),
}

impl StrataErrorCode for RegistryError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::DuplicateIdentifier { .. } | Self::DuplicateSequence { .. } => {
                error_code::DUPLICATE_IDENTIFIER
            }
            Self::InvalidIdentifier { .. } => error_code::INVALID_IDENTIFIER,
            Self::IdentifierMismatch { .. } | Self::Io { .. } | Self::Parse { .. } => {
                error_code::REGISTRY_ERROR
            }
            Self::Definition(e) => e.error_code(),
        }
    }

    fn exit_code(&self) -> i32 {
        error_code::exit::REGISTRY
    }
}

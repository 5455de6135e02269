//! Schema adapter errors.

use super::error_code::{self, StrataErrorCode};

/// Errors raised while executing a schema primitive.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("invalid collection or index name {name:?}")]
    InvalidName { name: String },

    #[error("collection {collection:?} does not exist")]
    UnknownCollection { collection: String },

    #[error("invalid document for {collection:?}: {detail}")]
    InvalidDocument { collection: String, detail: String },

    /// A constraint the schema itself enforces, e.g. a unique index
    /// rejecting a seed document.
    #[error("constraint violated on {collection:?}: {detail}")]
    Constraint { collection: String, detail: String },

    #[error("schema backend error: {message}")]
    Backend { message: String },
}

impl AdapterError {
    /// Map a storage failure into an adapter error.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

impl StrataErrorCode for AdapterError {
    fn error_code(&self) -> &'static str {
        error_code::ADAPTER_ERROR
    }

    fn exit_code(&self) -> i32 {
        match self {
            Self::Backend { .. } => error_code::exit::STORAGE,
            _ => error_code::exit::OPERATION_FAILED,
        }
    }
}

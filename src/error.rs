//! Error types for model loading and path enumeration.

use std::path::PathBuf;
use thiserror::Error;

/// Errors during path enumeration.
///
/// All of these are schema-content errors: the computation is deterministic,
/// so a failing model fails identically on retry. The fix is to correct the
/// model, not to retry.
#[derive(Debug, Error)]
pub enum PathError {
    #[error("unknown entity type '{name}' referenced by {referenced_by}")]
    UnknownEntityType { name: String, referenced_by: String },

    #[error("base type cycle detected at '{name}'")]
    BaseTypeCycle { name: String },

    #[error("entity type '{name}' declares no key properties")]
    MissingKey { name: String },

    #[error("operation import '{import}' references unknown operation '{operation}'")]
    UnknownOperation { import: String, operation: String },

    #[error("operation import '{import}' references bound operation '{operation}'")]
    BoundOperationImport { import: String, operation: String },

    #[error("invalid model: {message}")]
    InvalidModel { message: String },
}

impl PathError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        // Every enumeration failure is a model error.
        2
    }
}

/// Errors while loading a model document from disk.
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid model JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            LoadError::InvalidJson { .. } => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_error_exit_codes() {
        let err = PathError::UnknownEntityType {
            name: "Order".into(),
            referenced_by: "entity set 'Orders'".into(),
        };
        assert_eq!(err.exit_code(), 2);

        let err = PathError::BaseTypeCycle { name: "A".into() };
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn load_error_exit_codes() {
        let err = LoadError::FileNotFound {
            path: PathBuf::from("model.json"),
        };
        assert_eq!(err.exit_code(), 3);

        let err = LoadError::InvalidJson {
            source: serde_json::from_str::<serde_json::Value>("{").unwrap_err(),
        };
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn path_error_display() {
        let err = PathError::UnknownEntityType {
            name: "Order".into(),
            referenced_by: "navigation property 'Orders'".into(),
        };
        assert_eq!(
            err.to_string(),
            "unknown entity type 'Order' referenced by navigation property 'Orders'"
        );
    }
}

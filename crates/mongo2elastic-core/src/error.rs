//! Error types for schema conversion.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable, machine-readable error codes.
///
/// Variant names and their serialized `snake_case` strings are part of the
/// CLI's JSON error output and must not change across versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ErrorCode {
    /// JSON (de)serialization error.
    JsonParseError,
    /// A rename would move a field into a different container.
    RenamePrefixMismatch,
    /// A rename would overwrite an existing sibling property.
    RenameCollision,
    /// An override path is not a valid glob.
    InvalidPattern,
}

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("JSON (de)serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Rename path prefix does not match: {path}")]
    RenamePrefixMismatch { path: String },

    #[error("Renaming {path} to {destination} will overwrite property \"{property}\"")]
    RenameCollision {
        path: String,
        destination: String,
        property: String,
    },

    #[error("Invalid override path pattern {pattern:?}: {message}")]
    InvalidPattern { pattern: String, message: String },
}

impl ConvertError {
    /// Returns the stable error code for this error variant.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            ConvertError::JsonError(_) => ErrorCode::JsonParseError,
            ConvertError::RenamePrefixMismatch { .. } => ErrorCode::RenamePrefixMismatch,
            ConvertError::RenameCollision { .. } => ErrorCode::RenameCollision,
            ConvertError::InvalidPattern { .. } => ErrorCode::InvalidPattern,
        }
    }

    /// Returns the dotted path (or pattern) the error refers to, if any.
    pub fn path(&self) -> Option<&str> {
        match self {
            ConvertError::JsonError(_) => None,
            ConvertError::RenamePrefixMismatch { path } => Some(path),
            ConvertError::RenameCollision { path, .. } => Some(path),
            ConvertError::InvalidPattern { pattern, .. } => Some(pattern),
        }
    }

    /// Produces a structured JSON error.
    ///
    /// Format: `{"code": "...", "message": "...", "path": "..." | null}`
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "code": self.error_code(),
            "message": self.to_string(),
            "path": self.path(),
        })
    }
}

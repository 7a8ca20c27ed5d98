//! Error types for the config store.
//!
//! Every failure the store, the lock table, or the binder can surface is a
//! variant of [`Error`]. Variants carry:
//! - A stable numeric code for machine parsing
//! - A category for grouping
//! - A recoverability hint (is a retry meaningful?)
//!
//! Codes are grouped by category:
//! - 10-19: Store errors (loading, caching, versions)
//! - 20-29: Lock errors
//! - 30-39: Binding errors
//! - 40-49: Tree construction errors
//! - 50-59: Configuration errors
//! - 60-69: I/O errors

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::version::Version;

/// Result type alias for config store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Document loading, caching and version checks.
    Store,
    /// Reader-writer lock arbitration.
    Lock,
    /// Subtree-to-object binding.
    Bind,
    /// Node tree construction.
    Tree,
    /// Store configuration files.
    Config,
    /// File I/O.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Store => write!(f, "store"),
            ErrorCategory::Lock => write!(f, "lock"),
            ErrorCategory::Bind => write!(f, "bind"),
            ErrorCategory::Tree => write!(f, "tree"),
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// The two modes a document lock can be held in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockMode {
    Read,
    Write,
}

impl std::fmt::Display for LockMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LockMode::Read => write!(f, "read"),
            LockMode::Write => write!(f, "write"),
        }
    }
}

/// Failure raised by a field transformer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("transformer `{transformer}` failed: {message}")]
pub struct TransformError {
    /// Registry id of the transformer that failed.
    pub transformer: String,
    /// What went wrong.
    pub message: String,
}

impl TransformError {
    pub fn new(transformer: impl Into<String>, message: impl Into<String>) -> Self {
        TransformError {
            transformer: transformer.into(),
            message: message.into(),
        }
    }
}

/// Unified error type for the config store.
#[derive(Error, Debug)]
pub enum Error {
    // Store errors (10-19)
    #[error("document not loaded: {name}")]
    NotLoaded { name: String },

    #[error("version mismatch for document {name}: expected {expected}, got {actual}")]
    VersionMismatch {
        name: String,
        expected: Version,
        actual: Version,
    },

    #[error("failed to load document {name}: {reason}")]
    Load { name: String, reason: String },

    #[error("write lock not held on document {name}")]
    WriteLockNotHeld { name: String },

    // Lock errors (20-29)
    #[error("timed out after {timeout_ms}ms waiting for {mode} lock on document {name}")]
    LockTimeout {
        name: String,
        mode: LockMode,
        timeout_ms: u64,
    },

    // Binding errors (30-39)
    #[error("path not found in document {document}: {path}")]
    PathNotFound { document: String, path: String },

    #[error("update requested for {type_name} at {document}:{path} but nothing was bound yet")]
    UpdateWithoutExisting {
        type_name: &'static str,
        document: String,
        path: String,
    },

    #[error("required field {field} has no source `{source_name}` under {path}")]
    MissingField {
        field: String,
        source_name: String,
        path: String,
    },

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("unknown transformer: {id}")]
    UnknownTransformer { id: String },

    #[error(transparent)]
    Transformation(#[from] TransformError),

    // Tree errors (40-49)
    #[error("invalid tree: {0}")]
    InvalidTree(String),

    // Configuration errors (50-59)
    #[error("configuration error: {0}")]
    Config(String),

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns the stable error code for this error.
    pub fn code(&self) -> u32 {
        match self {
            Error::NotLoaded { .. } => 10,
            Error::VersionMismatch { .. } => 11,
            Error::Load { .. } => 12,
            Error::WriteLockNotHeld { .. } => 13,
            Error::LockTimeout { .. } => 20,
            Error::PathNotFound { .. } => 30,
            Error::UpdateWithoutExisting { .. } => 31,
            Error::MissingField { .. } => 32,
            Error::InvalidValue { .. } => 33,
            Error::UnknownTransformer { .. } => 34,
            Error::Transformation(_) => 35,
            Error::InvalidTree(_) => 40,
            Error::Config(_) => 50,
            Error::Io(_) => 60,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::NotLoaded { .. }
            | Error::VersionMismatch { .. }
            | Error::Load { .. }
            | Error::WriteLockNotHeld { .. } => ErrorCategory::Store,

            Error::LockTimeout { .. } => ErrorCategory::Lock,

            Error::PathNotFound { .. }
            | Error::UpdateWithoutExisting { .. }
            | Error::MissingField { .. }
            | Error::InvalidValue { .. }
            | Error::UnknownTransformer { .. }
            | Error::Transformation(_) => ErrorCategory::Bind,

            Error::InvalidTree(_) => ErrorCategory::Tree,
            Error::Config(_) => ErrorCategory::Config,
            Error::Io(_) => ErrorCategory::Io,
        }
    }

    /// Returns whether retrying the same call can succeed without
    /// changing the document or the target type.
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Another caller may load it first
            Error::NotLoaded { .. } => true,
            // The mismatched document stays cached
            Error::VersionMismatch { .. } => false,
            Error::Load { .. } => true,
            Error::WriteLockNotHeld { .. } => true,

            Error::LockTimeout { .. } => true,

            Error::PathNotFound { .. } => false,
            Error::UpdateWithoutExisting { .. } => true,
            Error::MissingField { .. } => false,
            Error::InvalidValue { .. } => false,
            Error::UnknownTransformer { .. } => true,
            Error::Transformation(_) => false,

            Error::InvalidTree(_) => false,
            Error::Config(_) => true,
            Error::Io(_) => true,
        }
    }
}

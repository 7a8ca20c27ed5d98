//! Config store common types, IDs, and errors.
//!
//! This crate provides foundational types shared by the tree and store crates:
//! - The unified error taxonomy with stable codes
//! - Exact-match document versions
//! - Document identity

pub mod error;
pub mod id;
pub mod version;

pub use error::{Error, ErrorCategory, LockMode, Result, TransformError};
pub use id::DocumentId;
pub use version::{Version, VersionParseError};

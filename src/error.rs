//! Error types for the docstore library
//!
//! This module provides a unified error handling system using `thiserror` for
//! all components of the docstore library.

use thiserror::Error;

/// The main error type for the docstore library
#[derive(Error, Debug)]
pub enum Error {
    /// Store operation errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration {
        /// Error message
        message: String,
    },

    /// Other errors
    #[error("Other error: {message}")]
    Other {
        /// Error message
        message: String,
    },
}

/// Store-specific error types
///
/// Driver failures are carried as their rendered message so every backend
/// reports through the same variants.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Store backend not available
    #[error("Store backend not available: {backend}")]
    BackendNotAvailable {
        /// Backend name
        backend: String,
    },

    /// Connecting to, or disconnecting from, the backend failed
    #[error("Connection error: {reason}")]
    ConnectionError {
        /// Failure detail
        reason: String,
    },

    /// Insert, update or delete rejected by the backend
    #[error("Write failed: {operation}: {reason}")]
    WriteFailed {
        /// Operation that failed
        operation: String,
        /// Failure detail
        reason: String,
    },

    /// A record with the same identifier already exists in the namespace
    #[error("Duplicate key: {namespace}/{id}")]
    DuplicateKey {
        /// Record namespace
        namespace: String,
        /// Record identifier
        id: String,
    },

    /// No record matched the identifier
    #[error("Record not found: {namespace}/{id}")]
    NotFound {
        /// Record namespace
        namespace: String,
        /// Record identifier
        id: String,
    },

    /// Query execution failed
    #[error("Query failed: {operation}: {reason}")]
    QueryFailed {
        /// Operation that failed
        operation: String,
        /// Failure detail
        reason: String,
    },

    /// A stored document does not decode into the target record
    #[error("Decode failed: {reason}")]
    DecodeFailed {
        /// Failure detail
        reason: String,
    },

    /// A record does not encode into a document
    #[error("Encode failed: {reason}")]
    EncodeFailed {
        /// Failure detail
        reason: String,
    },

    /// List options rejected before querying
    #[error("Invalid list options: {reason}")]
    InvalidListOptions {
        /// Failure detail
        reason: String,
    },
}

impl StoreError {
    /// Whether this error reports a missing record
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    pub(crate) fn not_found(namespace: &str, id: &str) -> Self {
        StoreError::NotFound {
            namespace: namespace.to_string(),
            id: id.to_string(),
        }
    }

    pub(crate) fn closed() -> Self {
        StoreError::ConnectionError {
            reason: "store is closed".to_string(),
        }
    }
}

impl From<bson::ser::Error> for StoreError {
    fn from(err: bson::ser::Error) -> Self {
        StoreError::EncodeFailed {
            reason: err.to_string(),
        }
    }
}

impl From<bson::de::Error> for StoreError {
    fn from(err: bson::de::Error) -> Self {
        StoreError::DecodeFailed {
            reason: err.to_string(),
        }
    }
}

/// Convenience type alias for Results
pub type Result<T> = std::result::Result<T, Error>;

/// Convenience type alias for Store Results
pub type StoreResult<T> = std::result::Result<T, StoreError>;

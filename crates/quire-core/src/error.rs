//! Error types for Quire.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the whole Quire workspace.
///
/// Address and validation errors are raised before any mutation happens, so a
/// caller receiving one of them can rely on the session being untouched.
/// [`QuireError::ConsistencyFault`] is the exception: it signals a broken
/// invariant and must be reported loudly rather than retried.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QuireError {
    /// Unknown session name or identifier-based address
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound { entity_type: String, id: String },

    /// Positional address outside the valid bounds
    #[error("Index {index} out of range (length {len})")]
    OutOfRange { index: i64, len: usize },

    /// Name (or backing file) collision in create mode
    #[error("Already exists: {entity_type} '{id}'")]
    AlreadyExists { entity_type: String, id: String },

    /// Reorder input is not a complete bijection over the current indices
    #[error("Invalid permutation: {0}")]
    InvalidPermutation(String),

    /// Item kind not accepted by this session kind
    #[error("Invalid kind '{kind}' (allowed: {allowed})")]
    InvalidKind { kind: String, allowed: String },

    /// Unknown or ill-typed field in an update request
    #[error("Invalid field: {0}")]
    InvalidField(String),

    /// Malformed request that does not fit any more specific category
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Address form not understood by the session's resolver
    #[error("Unsupported address: {0}")]
    UnsupportedAddress(String),

    /// An operation targeted the active session while none is set
    #[error("No active session")]
    NoActiveSession,

    /// The store could not produce items from a backing path
    #[error("Failed to load '{path}': {message}")]
    LoadFailed { path: String, message: String },

    /// An inverse application failed against its captured expectations
    #[error("Consistency fault: {0}")]
    ConsistencyFault(String),

    /// Execution exceeded its time budget
    #[error("Execution timed out after {seconds}s")]
    Timeout { seconds: f64 },

    /// The execution engine reported a failure
    #[error("Execution error: {0}")]
    Execution(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl QuireError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a NotFound error
    pub fn not_found(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }

    /// Creates an AlreadyExists error
    pub fn already_exists(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::AlreadyExists {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }

    /// Creates an OutOfRange error
    pub fn out_of_range(index: i64, len: usize) -> Self {
        Self::OutOfRange { index, len }
    }

    /// Creates a LoadFailed error
    pub fn load_failed(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::LoadFailed {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a ConsistencyFault error
    pub fn consistency(message: impl Into<String>) -> Self {
        Self::ConsistencyFault(message.into())
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is an OutOfRange error
    pub fn is_out_of_range(&self) -> bool {
        matches!(self, Self::OutOfRange { .. })
    }

    /// Check if this is an AlreadyExists error
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    /// Check if this is a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns true for errors that indicate a violated invariant.
    ///
    /// Callers must not swallow these: the session's history can no longer be
    /// trusted to reverse further operations.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ConsistencyFault(_))
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for QuireError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for QuireError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for QuireError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for QuireError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, QuireError>`.
pub type Result<T> = std::result::Result<T, QuireError>;

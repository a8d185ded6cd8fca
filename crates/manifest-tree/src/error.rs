//! Error types for manifest-tree

/// Result type for manifest-tree operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or querying property trees
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// Two input keys assign incompatible shapes to the same node
    #[error("Conflicting assignment at {path}: {reason}")]
    ConflictingPath { path: String, reason: String },

    /// A dotted input key is malformed
    #[error("Invalid property key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },

    /// A dotted input key uses a segment reserved for selector values
    #[error("Reserved key used as a property name at {path}")]
    ReservedKey { path: String },

    /// A path lookup failed at `segment`
    #[error("Path not found: {path} (no match for segment {segment:?})")]
    NotFound { path: String, segment: String },

    /// A value cannot be represented as a property value
    #[error("Invalid property value: {message}")]
    InvalidValue { message: String },
}

impl Error {
    pub fn conflict(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConflictingPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn not_found(path: impl Into<String>, segment: impl Into<String>) -> Self {
        Self::NotFound {
            path: path.into(),
            segment: segment.into(),
        }
    }

    /// Whether this error reports a missing path.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

//! Error types for memory operations.

/// Errors returned by `BoundedSemanticMemory` operations.
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    /// Persistence backend unreachable or failing during insert/evict/clear.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
    /// Similarity collaborator unreachable or failing during query.
    #[error("retrieval unavailable: {0}")]
    RetrievalUnavailable(String),
    /// Malformed input supplied by the caller.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Errors returned by injected collaborators (backends, scorers, embedders).
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    /// Remote collaborator could not be reached.
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),
    /// Collaborator returned data that cannot be used.
    #[error("invalid response: {0}")]
    Invalid(String),
}

//! Bounded, similarity-ranked conversational memory for Recollect.

pub mod backend;
pub mod content;
pub mod context;
pub mod error;
pub mod model;
pub mod policy;
pub mod similarity;
pub mod store;

/// Backend interface and built-in implementations.
pub use backend::{MemoryBackend, WindowChange, file::FileBackend, memory::InMemoryBackend};
/// Response content normalization.
pub use content::{ContentPart, MessageContent};
/// Context formatting for prompts.
pub use context::{NO_HISTORY_SENTINEL, format_context};
/// Error types.
pub use error::{BackendError, MemoryError};
/// Record model.
pub use model::{MemoryRecord, RecordId, Role};
/// Capture policy.
pub use policy::CapturePolicy;
/// Similarity interfaces and built-in scorers.
pub use similarity::{Embedder, EmbeddingSimilarity, LexicalSimilarity, Similarity, cosine_similarity};
/// The memory store.
pub use store::{
    BoundedSemanticMemory, DEFAULT_MAX_HISTORY, DEFAULT_TIMEOUT, MemoryOptions, RecallOptions,
};

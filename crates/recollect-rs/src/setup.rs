//! Mapping from configuration onto memory collaborators.

use log::info;
use recollect_rs_config::{BackendConfig, BackendKind, MemoryConfig, SimilarityConfig, SimilarityKind};
use recollect_rs_memory::{
    BoundedSemanticMemory, CapturePolicy, FileBackend, InMemoryBackend, LexicalSimilarity,
    MemoryBackend, MemoryError, MemoryOptions, RecallOptions, Similarity,
};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Translate memory config into store construction options.
pub fn memory_options(config: &MemoryConfig) -> MemoryOptions {
    MemoryOptions {
        max_history: config.max_history,
        timeout: config.timeout_ms.map(Duration::from_millis),
        capture: CapturePolicy {
            redact_patterns: config.capture.redact_patterns.clone(),
            detect_secrets: config.capture.detect_secrets,
            secret_entropy_threshold: config.capture.secret_entropy_threshold,
            max_content_chars: config.capture.max_content_chars,
            ..CapturePolicy::default()
        },
    }
}

/// Translate memory config into per-query recall options.
pub fn recall_options(config: &MemoryConfig) -> RecallOptions {
    RecallOptions {
        min_score: config.min_score,
    }
}

/// Build the configured persistence backend.
pub fn backend_from_config(config: &BackendConfig) -> Result<Arc<dyn MemoryBackend>, MemoryError> {
    match config.kind {
        BackendKind::Memory => Ok(Arc::new(InMemoryBackend::new())),
        BackendKind::File => {
            let path = config.path.as_deref().ok_or_else(|| {
                MemoryError::InvalidArgument("file backend requires a path".to_string())
            })?;
            let backend = FileBackend::new(path)
                .map_err(|err| MemoryError::StorageUnavailable(err.to_string()))?;
            Ok(Arc::new(backend))
        }
    }
}

/// Build the configured similarity scorer.
pub fn similarity_from_config(config: &SimilarityConfig) -> Arc<dyn Similarity> {
    match config.kind {
        SimilarityKind::Lexical => Arc::new(LexicalSimilarity),
    }
}

/// Build a memory from config, resuming `session_id` when given.
pub async fn build_memory(
    config: &MemoryConfig,
    session_id: Option<Uuid>,
) -> Result<BoundedSemanticMemory, MemoryError> {
    let backend = backend_from_config(&config.backend)?;
    let similarity = similarity_from_config(&config.similarity);
    let options = memory_options(config);
    let memory = match session_id {
        Some(session_id) => {
            BoundedSemanticMemory::open(session_id, backend, similarity, options).await?
        }
        None => BoundedSemanticMemory::new(backend, similarity, options)?,
    };
    info!(
        "memory ready (session_id={}, backend={:?}, max_history={})",
        memory.session_id(),
        config.backend.kind,
        memory.max_history()
    );
    Ok(memory)
}

//! Configuration schema for Recollect.

use serde::{Deserialize, Serialize};

/// Root config for the Recollect SDK.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RecollectConfig {
    #[serde(default, rename = "$schema")]
    pub schema: Option<String>,
    #[serde(default)]
    pub memory: MemoryConfig,
}

impl RecollectConfig {
    /// Start building a config programmatically with defaults applied.
    pub fn builder() -> RecollectConfigBuilder {
        RecollectConfigBuilder::new()
    }
}

/// Builder for assembling a `RecollectConfig` in code.
#[derive(Debug, Default, Clone)]
pub struct RecollectConfigBuilder {
    config: RecollectConfig,
}

impl RecollectConfigBuilder {
    /// Create a new builder seeded with default config values.
    pub fn new() -> Self {
        Self {
            config: RecollectConfig::default(),
        }
    }

    /// Replace the memory configuration.
    pub fn memory(mut self, memory: MemoryConfig) -> Self {
        self.config.memory = memory;
        self
    }

    /// Override the retention window size.
    pub fn max_history(mut self, max_history: usize) -> Self {
        self.config.memory.max_history = max_history;
        self
    }

    /// Use a file backend rooted at `path`.
    pub fn file_backend(mut self, path: impl Into<String>) -> Self {
        self.config.memory.backend = BackendConfig {
            kind: BackendKind::File,
            path: Some(path.into()),
        };
        self
    }

    /// Finalize and return the built `RecollectConfig`.
    pub fn build(self) -> RecollectConfig {
        self.config
    }
}

/// Memory store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Number of most recent records retained.
    #[serde(default = "default_max_history")]
    pub max_history: usize,
    /// Number of records recalled per query.
    #[serde(default = "default_recall_k")]
    pub recall_k: usize,
    /// Collaborator timeout in milliseconds; `null` disables it.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: Option<u64>,
    /// Minimum similarity score for recalled records.
    #[serde(default)]
    pub min_score: Option<f32>,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub similarity: SimilarityConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_history: default_max_history(),
            recall_k: default_recall_k(),
            timeout_ms: default_timeout_ms(),
            min_score: None,
            backend: BackendConfig::default(),
            similarity: SimilarityConfig::default(),
            capture: CaptureConfig::default(),
        }
    }
}

/// Default retention window size.
fn default_max_history() -> usize {
    10
}

/// Default number of memory items to recall.
fn default_recall_k() -> usize {
    5
}

/// Default collaborator timeout.
fn default_timeout_ms() -> Option<u64> {
    Some(5_000)
}

/// Persistence backend selection.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct BackendConfig {
    #[serde(default)]
    pub kind: BackendKind,
    /// Root directory for the file backend.
    #[serde(default)]
    pub path: Option<String>,
}

/// Available persistence backends.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Memory,
    File,
}

/// Similarity scorer selection.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct SimilarityConfig {
    #[serde(default)]
    pub kind: SimilarityKind,
}

/// Available similarity scorers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityKind {
    #[default]
    Lexical,
}

/// Capture policy applied before records are stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    #[serde(default)]
    pub redact_patterns: Vec<String>,
    #[serde(default = "default_detect_secrets")]
    pub detect_secrets: bool,
    #[serde(default = "default_secret_entropy_threshold")]
    pub secret_entropy_threshold: f32,
    #[serde(default)]
    pub max_content_chars: Option<usize>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            redact_patterns: Vec::new(),
            detect_secrets: default_detect_secrets(),
            secret_entropy_threshold: default_secret_entropy_threshold(),
            max_content_chars: None,
        }
    }
}

/// Default toggle for secret detection in memory capture.
fn default_detect_secrets() -> bool {
    true
}

/// Default entropy threshold for identifying secrets.
fn default_secret_entropy_threshold() -> f32 {
    3.7
}

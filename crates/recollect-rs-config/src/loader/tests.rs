//! Tests for layered configuration loading.

use super::*;
use crate::{BackendKind, SimilarityKind};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Write JSON5 contents to a path, creating parent directories if needed.
fn write_json5(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("dir");
    }
    fs::write(path, contents).expect("write");
}

/// Options that only look at the given cwd and explicit paths.
fn isolated_options(cwd: &Path) -> LayeredConfigOptions {
    let mut options = LayeredConfigOptions::new(cwd);
    options.system_config_path = None;
    options.user_config_path = None;
    options.requirements_path = None;
    options
}

/// Verify that a minimal config parses with defaults.
#[test]
fn parse_minimal_config() {
    let config = RecollectConfig::load_from_str("{}").expect("config");
    assert_eq!(config.memory.max_history, 10);
    assert_eq!(config.memory.recall_k, 5);
    assert_eq!(config.memory.timeout_ms, Some(5_000));
    assert_eq!(config.memory.backend.kind, BackendKind::Memory);
    assert_eq!(config.memory.similarity.kind, SimilarityKind::Lexical);
    assert!(config.memory.capture.detect_secrets);
}

#[test]
fn parse_full_memory_block() {
    let json5 = r#"{
        // comments are allowed
        memory: {
            max_history: 4,
            recall_k: 2,
            timeout_ms: null,
            min_score: 0.25,
            backend: { kind: "file", path: "db/history" },
            capture: { redact_patterns: ["sk-[a-z0-9]+"], max_content_chars: 200 },
        },
    }"#;
    let config = RecollectConfig::load_from_str(json5).expect("config");
    assert_eq!(config.memory.max_history, 4);
    assert_eq!(config.memory.recall_k, 2);
    assert_eq!(config.memory.timeout_ms, None);
    assert_eq!(config.memory.min_score, Some(0.25));
    assert_eq!(config.memory.backend.kind, BackendKind::File);
    assert_eq!(config.memory.backend.path.as_deref(), Some("db/history"));
    assert_eq!(config.memory.capture.max_content_chars, Some(200));
}

/// Reject unexpected keys with their dotted path.
#[test]
fn rejects_unknown_keys() {
    let err = RecollectConfig::load_from_str("{ unexpected: true }").unwrap_err();
    assert!(format!("{err}").contains("unknown key"));

    let err = RecollectConfig::load_from_str("{ memory: { window: 3 } }").unwrap_err();
    assert!(format!("{err}").contains("memory.window"));
}

#[test]
fn rejects_invalid_backend_kind() {
    let err =
        RecollectConfig::load_from_str(r#"{ memory: { backend: { kind: "chroma" } } }"#)
            .unwrap_err();
    assert!(format!("{err}").contains("memory.backend.kind"));
}

#[test]
fn rejects_zero_history_and_missing_file_path() {
    let err = RecollectConfig::load_from_str("{ memory: { max_history: 0 } }").unwrap_err();
    assert!(matches!(
        err,
        ConfigError::InvalidField { ref path, .. } if path == "memory.max_history"
    ));

    let err = RecollectConfig::load_from_str(r#"{ memory: { backend: { kind: "file" } } }"#)
        .unwrap_err();
    assert!(matches!(
        err,
        ConfigError::InvalidField { ref path, .. } if path == "memory.backend.path"
    ));
}

#[test]
fn rejects_negative_integers() {
    let err = RecollectConfig::load_from_str("{ memory: { recall_k: -1 } }").unwrap_err();
    assert!(format!("{err}").contains("memory.recall_k"));
}

#[test]
fn builder_applies_overrides() {
    let config = RecollectConfig::builder()
        .max_history(3)
        .file_backend("/tmp/recollect")
        .build();
    assert_eq!(config.memory.max_history, 3);
    assert_eq!(config.memory.backend.kind, BackendKind::File);
    config.validate().expect("valid");
}

/// Cwd config overrides the user layer; runtime overrides both.
#[test]
fn layered_precedence_user_cwd_runtime() {
    let temp = TempDir::new().expect("tmp");
    let root = temp.path();
    let cwd = root.join("work");
    fs::create_dir_all(&cwd).expect("cwd");

    let user_config = root.join("user.json5");
    write_json5(&user_config, "{ memory: { max_history: 6, recall_k: 2 } }");
    write_json5(&cwd.join(DEFAULT_CONFIG_FILE), "{ memory: { max_history: 8 } }");

    let mut options = isolated_options(&cwd);
    options.user_config_path = Some(user_config);
    let layered = RecollectConfig::load_layered_with_options(options.clone()).expect("layered");
    assert_eq!(layered.config.memory.max_history, 8);
    assert_eq!(layered.config.memory.recall_k, 2);
    assert_eq!(
        layered
            .layers
            .iter()
            .map(|layer| layer.source)
            .collect::<Vec<_>>(),
        vec![ConfigLayerSource::User, ConfigLayerSource::Cwd]
    );

    let runtime = root.join("runtime.json5");
    write_json5(&runtime, "{ memory: { max_history: 12 } }");
    let layered = RecollectConfig::load_layered_with_options(options.with_runtime_path(&runtime))
        .expect("layered");
    assert_eq!(layered.config.memory.max_history, 12);
}

/// Project root config applies below the cwd layer and is not loaded twice.
#[test]
fn project_layer_is_discovered_once() {
    let temp = TempDir::new().expect("tmp");
    let project_root = temp.path().join("project");
    fs::create_dir_all(project_root.join(".git")).expect("git");
    write_json5(
        &project_root.join(DEFAULT_CONFIG_FILE),
        "{ memory: { recall_k: 7 } }",
    );

    let layered =
        RecollectConfig::load_layered_with_options(isolated_options(&project_root))
            .expect("layered");
    assert_eq!(layered.config.memory.recall_k, 7);
    assert_eq!(layered.layers.len(), 1);
    assert_eq!(layered.layers[0].source, ConfigLayerSource::Project);
}

/// Keys set in requirements cannot be overridden by later layers.
#[test]
fn requirements_lock_overrides() {
    let temp = TempDir::new().expect("tmp");
    let root = temp.path();
    let requirements = root.join("requirements.json5");
    write_json5(&requirements, "{ memory: { max_history: 2 } }");
    let runtime = root.join("runtime.json5");
    write_json5(&runtime, "{ memory: { max_history: 50, recall_k: 9 } }");

    let mut options = isolated_options(root);
    options.requirements_path = Some(requirements);
    options.runtime_paths = vec![runtime];
    let layered = RecollectConfig::load_layered_with_options(options).expect("layered");
    assert_eq!(layered.config.memory.max_history, 2);
    assert_eq!(layered.config.memory.recall_k, 9);
}

#[test]
fn invalid_layer_reports_its_origin() {
    let temp = TempDir::new().expect("tmp");
    let runtime = temp.path().join("runtime.json5");
    write_json5(&runtime, "{ memory: { capture: { detect_secrets: \"yes\" } } }");

    let options = isolated_options(temp.path()).with_runtime_path(&runtime);
    let err = RecollectConfig::load_layered_with_options(options).unwrap_err();
    let message = format!("{err}");
    assert!(message.contains("runtime("));
    assert!(message.contains("memory.capture.detect_secrets"));
}

#[test]
fn missing_runtime_layer_is_an_error() {
    let temp = TempDir::new().expect("tmp");
    let options =
        isolated_options(temp.path()).with_runtime_path(temp.path().join("absent.json5"));
    let err = RecollectConfig::load_layered_with_options(options).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::ReadFailed { ref path, .. } if path.ends_with("absent.json5")
    ));
}

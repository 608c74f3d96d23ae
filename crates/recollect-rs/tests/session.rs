use pretty_assertions::assert_eq;
use recollect_rs::config::RecollectConfig;
use recollect_rs::{ChatSession, build_memory, recall_options};
use std::fs;
use tempfile::tempdir;

#[tokio::test]
async fn layered_config_drives_a_resumable_conversation() {
    let temp = tempdir().expect("tempdir");
    let store = temp.path().join("history");
    let config_path = temp.path().join("recollect.json5");
    fs::write(
        &config_path,
        format!(
            "{{ memory: {{ max_history: 3, recall_k: 2, backend: {{ kind: \"file\", path: {:?} }} }} }}",
            store.to_string_lossy()
        ),
    )
    .expect("write config");
    let config = RecollectConfig::load_from_path(&config_path).expect("config");

    let memory = build_memory(&config.memory, None).await.expect("memory");
    let session_id = memory.session_id();
    let chat = ChatSession::new(
        memory,
        config.memory.recall_k,
        recall_options(&config.memory),
    );
    let first = chat
        .prepare_turn("my dog is called Biscuit")
        .await
        .expect("turn");
    assert!(first.prompt.contains("USER: my dog is called Biscuit"));
    chat.record_response("What a lovely name.")
        .await
        .expect("response");
    drop(chat);

    let memory = build_memory(&config.memory, Some(session_id))
        .await
        .expect("resume");
    let chat = ChatSession::new(
        memory,
        config.memory.recall_k,
        recall_options(&config.memory),
    );
    let turn = chat
        .prepare_turn("what is my dog called?")
        .await
        .expect("turn");
    assert_eq!(turn.context.len(), 2);
    assert!(turn.prompt.contains("my dog is called Biscuit"));
    assert_eq!(chat.memory().len().await, 3);

    chat.clear().await.expect("clear");
    let empty = build_memory(&config.memory, Some(session_id))
        .await
        .expect("reopen");
    assert!(empty.is_empty().await);
}

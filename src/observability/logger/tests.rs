use super::*;
use std::collections::HashMap;
use tempfile::tempdir;

#[test]
fn test_logger_creation() {
    let temp_dir = tempdir().unwrap();
    let log_path = temp_dir.path().join("test.log");

    let logger = Logger::new(Some(&log_path), Some("debug"));
    assert!(logger.is_ok());

    let logger = logger.unwrap();
    assert_eq!(logger.log_file(), &log_path);
    assert_eq!(logger.log_level(), "DEBUG");
}

#[test]
fn test_log_file_creation() {
    let temp_dir = tempdir().unwrap();
    let log_path = temp_dir.path().join("logs").join("test.md");

    let _logger = Logger::new(Some(&log_path), None).unwrap();
    assert!(log_path.exists());

    let content = std::fs::read_to_string(&log_path).unwrap();
    assert!(content.contains("# Llamaflow Session Log"));
    assert!(content.contains("Log started:"));
}

#[test]
fn test_log_operations() {
    let temp_dir = tempdir().unwrap();
    let log_path = temp_dir.path().join("test.md");
    let logger = Logger::new(Some(&log_path), None).unwrap();

    let mut config = HashMap::new();
    config.insert(
        "model".to_string(),
        serde_json::Value::String("llama3".to_string()),
    );

    assert!(logger.log_session_start("agentic", &config).is_ok());
    assert!(logger.log_task_dispatch(0, "process", "write hello.py").is_ok());
    assert!(logger.log_file_operation("create_file", "hello.py", true).is_ok());
    assert!(logger.log_outcome(0, "**Success**: executed `create_file` on `hello.py`.").is_ok());
    assert!(logger.log_stream_event("cancelled", 3, 42).is_ok());
    assert!(logger.log_completion("Queue drained").is_ok());

    let content = std::fs::read_to_string(&log_path).unwrap();
    assert!(content.contains("Session Started"));
    assert!(content.contains("## Task 0 (process)"));
    assert!(content.contains("**Path:** `hello.py`"));
    assert!(content.contains("**Status:** applied"));
    assert!(content.contains("### Outcome 0"));
    assert!(content.contains("**State:** cancelled"));
    assert!(content.contains("Session Completed"));
}

#[test]
fn test_llm_interaction_prompt_only_in_debug() {
    let temp_dir = tempdir().unwrap();

    let info_path = temp_dir.path().join("info.md");
    let logger = Logger::new(Some(&info_path), None).unwrap();
    logger
        .log_llm_interaction("PERSONA\n\nUser: \"hi\"", "Test response", "llama3")
        .unwrap();
    let content = std::fs::read_to_string(&info_path).unwrap();
    assert!(content.contains("**Prompt:** 19 chars"));
    assert!(!content.contains("PERSONA"));
    assert!(content.contains("Test response"));

    let debug_path = temp_dir.path().join("debug.md");
    let logger = Logger::new(Some(&debug_path), Some("DEBUG")).unwrap();
    logger
        .log_llm_interaction("PERSONA\n\nUser: \"hi\"", "Test response debug", "llama3")
        .unwrap();
    let content = std::fs::read_to_string(&debug_path).unwrap();
    assert!(content.contains("PERSONA"));
    assert!(content.contains("Test response debug"));
}

#[test]
fn test_empty_interaction_is_skipped() {
    let temp_dir = tempdir().unwrap();
    let log_path = temp_dir.path().join("test.md");
    let logger = Logger::new(Some(&log_path), None).unwrap();

    let before = std::fs::read_to_string(&log_path).unwrap();
    logger.log_llm_interaction("  ", "\n", "llama3").unwrap();
    let after = std::fs::read_to_string(&log_path).unwrap();
    assert_eq!(before, after);
}

#[test]
fn test_log_error_with_context() {
    let temp_dir = tempdir().unwrap();
    let log_path = temp_dir.path().join("test.md");
    let logger = Logger::new(Some(&log_path), None).unwrap();

    let mut ctx = HashMap::new();
    ctx.insert("task".to_string(), serde_json::json!(2));
    logger.log_error("backend unreachable", Some(&ctx)).unwrap();

    let content = std::fs::read_to_string(&log_path).unwrap();
    assert!(content.contains("**Error:** backend unreachable"));
    assert!(content.contains("\"task\": 2"));
}

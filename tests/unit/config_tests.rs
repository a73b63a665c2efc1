//! Unit tests for `AssemblerConfig` parsing and validation.

use std::io::Write;

use stream_assembler::config::DEFAULT_MAX_LINE_BYTES;
use stream_assembler::{AppError, AssemblerConfig};

#[test]
fn empty_document_uses_wire_defaults() {
    let config = AssemblerConfig::from_toml_str("").expect("empty config parses");

    assert_eq!(config, AssemblerConfig::default());
    assert_eq!(config.data_prefix, "data:");
    assert_eq!(config.sentinel, "[DONE]");
    assert_eq!(config.response_field, "response");
    assert_eq!(config.directive_tag, "action");
    assert_eq!(config.max_line_bytes, DEFAULT_MAX_LINE_BYTES);
}

#[test]
fn parses_overrides() {
    let raw = r#"
data_prefix = "event:"
sentinel = "[END]"
response_field = "text"
directive_tag = "cmd"
max_line_bytes = 4096
read_chunk_bytes = 16
snapshot_channel_capacity = 2
"#;
    let config = AssemblerConfig::from_toml_str(raw).expect("config parses");

    assert_eq!(config.data_prefix, "event:");
    assert_eq!(config.sentinel, "[END]");
    assert_eq!(config.response_field, "text");
    assert_eq!(config.directive_tag, "cmd");
    assert_eq!(config.max_line_bytes, 4096);
    assert_eq!(config.read_chunk_bytes, 16);
    assert_eq!(config.snapshot_channel_capacity, 2);
}

#[test]
fn rejects_unknown_fields() {
    let result = AssemblerConfig::from_toml_str("sentinal = \"[DONE]\"");
    assert!(matches!(result, Err(AppError::Config(_))), "got: {result:?}");
}

#[test]
fn rejects_zero_max_line_bytes() {
    let result = AssemblerConfig::from_toml_str("max_line_bytes = 0");
    match result {
        Err(AppError::Config(msg)) => assert!(msg.contains("max_line_bytes"), "got: {msg}"),
        other => panic!("expected config error, got: {other:?}"),
    }
}

#[test]
fn rejects_zero_read_chunk_bytes() {
    let result = AssemblerConfig::from_toml_str("read_chunk_bytes = 0");
    assert!(matches!(result, Err(AppError::Config(ref msg)) if msg.contains("read_chunk_bytes")));
}

#[test]
fn rejects_blank_sentinel() {
    let result = AssemblerConfig::from_toml_str("sentinel = \"  \"");
    assert!(matches!(result, Err(AppError::Config(ref msg)) if msg.contains("sentinel")));
}

#[test]
fn rejects_directive_tag_with_markup() {
    let result = AssemblerConfig::from_toml_str("directive_tag = \"act>ion\"");
    assert!(matches!(result, Err(AppError::Config(ref msg)) if msg.contains("directive_tag")));
}

#[test]
fn loads_from_path() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(file, "sentinel = \"[FIN]\"").expect("write config");

    let config = AssemblerConfig::load_from_path(file.path()).expect("config loads");
    assert_eq!(config.sentinel, "[FIN]");
    assert_eq!(config.data_prefix, "data:");
}

#[test]
fn missing_file_is_config_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let result = AssemblerConfig::load_from_path(dir.path().join("absent.toml"));
    assert!(
        matches!(result, Err(AppError::Config(ref msg)) if msg.contains("failed to read config"))
    );
}

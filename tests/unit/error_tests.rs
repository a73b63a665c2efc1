//! Unit tests for `AppError` display format and conversions.

use stream_assembler::models::transport::TransportFailure;
use stream_assembler::AppError;

#[test]
fn each_variant_has_a_distinct_prefix() {
    let cases = [
        (AppError::Config("x".into()), "config: x"),
        (AppError::Frame("x".into()), "frame: x"),
        (AppError::Transport("x".into()), "transport: x"),
        (AppError::InvalidTransition("x".into()), "invalid transition: x"),
        (AppError::Io("x".into()), "io: x"),
    ];
    for (err, expected) in cases {
        assert_eq!(err.to_string(), expected);
    }
}

#[test]
fn error_message_no_trailing_period() {
    let err = AppError::Frame("line too long: exceeded 8 bytes".into());
    let s = err.to_string();
    assert!(
        !s.ends_with('.'),
        "error message must not end with a period: {s}"
    );
}

#[test]
fn toml_error_converts_to_config() {
    let toml_err = toml::from_str::<toml::Value>("= broken").expect_err("invalid toml");
    let err = AppError::from(toml_err);
    assert!(
        matches!(err, AppError::Config(ref msg) if msg.starts_with("invalid config")),
        "got: {err:?}"
    );
}

#[test]
fn io_error_converts_to_io() {
    let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
    let err = AppError::from(io);
    assert_eq!(err.to_string(), "io: pipe closed");
}

#[test]
fn transport_failure_converts_to_transport() {
    let err = AppError::from(TransportFailure::MissingBody);
    assert_eq!(err.to_string(), "transport: no response body");
}

#[test]
fn app_error_implements_std_error_trait() {
    fn assert_error<E: std::error::Error>(_: &E) {}
    let err = AppError::InvalidTransition("test".into());
    assert_error(&err);
    assert!(format!("{err:?}").contains("InvalidTransition"));
}

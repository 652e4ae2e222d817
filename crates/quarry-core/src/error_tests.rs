//! Error module tests

use crate::error::{Error, Result};

#[test]
fn test_builder_not_initialized_error() {
    let error = Error::BuilderNotInitialized;
    assert_eq!(error.code(), "E001");
    assert_eq!(error.suggestion(), Some("QueryBuilder::init".to_string()));
    assert!(error.to_string().contains("init"));
}

#[test]
fn test_decode_error() {
    let error = Error::Decode("bad base64".to_string());
    assert_eq!(error.code(), "E101");
    assert_eq!(error.suggestion(), Some("quarry encode <file>".to_string()));
    assert!(error.to_string().contains("bad base64"));
}

#[test]
fn test_label_load_error_has_no_suggestion() {
    let error = Error::LabelLoad("timeout".to_string());
    assert_eq!(error.code(), "E200");
    assert_eq!(error.suggestion(), None);
}

#[test]
fn test_serialization_error_conversion() {
    fn parse() -> Result<serde_json::Value> {
        Ok(serde_json::from_str("{not json")?)
    }

    let error = parse().unwrap_err();
    assert!(matches!(error, Error::Serialization(_)));
    assert_eq!(error.code(), "E100");
}

#[test]
fn test_io_error_conversion() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
    let error: Error = io.into();
    assert_eq!(error.code(), "E9999");
    assert!(error.to_string().contains("missing"));
}

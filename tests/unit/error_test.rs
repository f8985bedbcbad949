//! Tests for error types

use muster::core::MusterError;

#[test]
fn test_not_found_error() {
    let err = MusterError::NotFound("event 42".to_string());
    assert_eq!(format!("{}", err), "not found: event 42");
}

#[test]
fn test_full_error_reports_counts() {
    let err = MusterError::Full {
        current: 2,
        capacity: 2,
    };
    assert_eq!(format!("{}", err), "roster full: 2/2");
}

#[test]
fn test_closed_error() {
    assert_eq!(format!("{}", MusterError::Closed), "poll closed");
}

#[test]
fn test_duplicate_error() {
    let err = MusterError::Duplicate("Pizza".to_string());
    assert_eq!(format!("{}", err), "duplicate option: Pizza");
}

#[test]
fn test_storage_error_is_classified() {
    let err = MusterError::Storage("connection failed".to_string());
    assert_eq!(format!("{}", err), "storage error: connection failed");
    assert!(err.is_storage());
    assert!(!MusterError::Notify("timeout".to_string()).is_storage());
}

//! Error handling for reelwatch-store
//!
//! Wraps reelwatch-core ExError with store-specific helpers

use reelwatch_core::errors::{ExError, ExErrorKind};
use std::time::Duration;

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

/// Create a missing-object error
pub fn not_found(op: &str, key: &str) -> ExError {
    ExError::new(ExErrorKind::NotFound)
        .with_op(op.to_string())
        .with_location(key.to_string())
        .with_message("object not found")
}

/// Create a write-once collision error
pub fn already_exists(key: &str) -> ExError {
    ExError::new(ExErrorKind::AlreadyExists)
        .with_op("put")
        .with_location(key.to_string())
        .with_message("a different payload is already stored at this key")
}

/// Create an error for a key that cannot be mapped onto the backend
pub fn invalid_key(op: &str, key: &str, reason: &str) -> ExError {
    ExError::new(ExErrorKind::Internal)
        .with_op(op.to_string())
        .with_location(key.to_string())
        .with_message(format!("invalid object key: {}", reason))
}

/// Map an IO error on a read path; `NotFound` is preserved
pub fn read_io_error(op: &str, key: &str, err: std::io::Error) -> ExError {
    if err.kind() == std::io::ErrorKind::NotFound {
        return not_found(op, key);
    }
    ExError::new(ExErrorKind::StoreRead)
        .with_op(op.to_string())
        .with_location(key.to_string())
        .with_message(err.to_string())
}

/// Map an IO error on a write or delete path
pub fn write_io_error(op: &str, key: &str, err: std::io::Error) -> ExError {
    ExError::new(ExErrorKind::StoreWrite)
        .with_op(op.to_string())
        .with_location(key.to_string())
        .with_message(err.to_string())
}

/// Create a timeout error for a bounded store operation
pub fn timed_out(op: &str, location: &str, limit: Duration) -> ExError {
    ExError::new(ExErrorKind::Timeout)
        .with_op(op.to_string())
        .with_location(location.to_string())
        .with_message(format!("store operation exceeded {}ms", limit.as_millis()))
}

//! Structured error types for parsing cgroup stat files.
//!
//! - [`StatParseError::InvalidKeyValue`]: a known key carries a value that is not a number.
//! - [`StatParseError::DuplicateField`]: a key appears twice where that is disallowed.
//!
//! Callers reading controller files absorb these errors: a malformed file makes the
//! metric unavailable instead of failing the validation run.

use std::num::ParseIntError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StatParseError {
    #[error("duplicate field '{field}' at line {line}")]
    DuplicateField { field: String, line: usize },

    #[error("invalid value for '{key}' at line {line}: '{value}': {source}")]
    InvalidKeyValue {
        key: String,
        value: String,
        line: usize,
        #[source]
        source: ParseIntError,
    },
}

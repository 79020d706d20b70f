use crate::cgroup::Controller;

/// A provider value that cannot be reconciled with the cgroup filesystem.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("test failed for - {controller}:{metric}, expected [{expected}], got [{actual}]")]
    ValueMismatch {
        controller: Controller,
        metric: String,
        expected: String,
        actual: String,
    },
    #[error("test failed for - {controller}:{metric}, expected {expected:?}, got {actual:?}")]
    SetMismatch {
        controller: Controller,
        metric: String,
        expected: Vec<u32>,
        actual: Vec<u32>,
    },
    #[error(
        "test failed for - {controller}:{metric}, expected at least [{start}], got [{current}]"
    )]
    CounterRegression {
        controller: Controller,
        metric: String,
        start: i64,
        current: i64,
    },
    #[error("test failed for provider name, expected [{expected}], got [{actual}]")]
    ProviderMismatch { expected: String, actual: String },
}

pub type Result<T> = std::result::Result<T, Error>;

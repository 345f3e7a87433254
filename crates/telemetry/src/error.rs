//! Error types for the telemetry engine.
//!
//! Missing telemetry is never an error here: unsupported capabilities are
//! modeled as `None` throughout the crate. Errors are reserved for malformed
//! caller input.

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// A caller-supplied argument was malformed (e.g. an empty spec pattern).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A caller-supplied numeric reference was outside its valid range.
    #[error("value out of range: {0}")]
    OutOfRange(String),
}

pub type Result<T> = std::result::Result<T, TelemetryError>;

//! Error taxonomy for a listening session.

use thiserror::Error;

/// Fatal session failures. Everything here ends the session; cancellation
/// and normal stream end are not errors and never surface through this type.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The input device could not be opened or configured. Raised before
    /// any frame is produced.
    #[error("input device unavailable: {0}")]
    Device(String),

    /// The device failed mid-stream. The capture loop has terminated and
    /// the partially processed session must not be mistaken for a clean stop.
    #[error("audio capture failed: {0}")]
    Capture(String),

    /// The device's native rate differs from the configured processing rate.
    /// Resampling is not supported, so this fails at session construction.
    #[error("device captures at {actual} Hz but the pipeline requires {required} Hz (resampling is not supported)")]
    UnsupportedRate { actual: u32, required: u32 },
}

//! Session engine error types (thiserror-based).

use thiserror::Error;

/// Errors surfaced by the session engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// `start()` was called while a session is already running.
    #[error("a session is already running")]
    AlreadyRunning,

    /// The output device or render graph could not be started.
    #[error("audio engine failed to start: {0}")]
    AudioEngineInitFailed(String),

    /// A PCM buffer could not be described or allocated.
    #[error("failed to allocate tone buffer: {0}")]
    BufferAllocationFailed(String),

    /// A custom override was out of range. Recovered inside `start()` by
    /// falling back to the preset intensity.
    #[error("invalid custom override: {0}")]
    InvalidOverride(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        assert_eq!(
            EngineError::AlreadyRunning.to_string(),
            "a session is already running"
        );
        let err = EngineError::AudioEngineInitFailed("no default device".to_string());
        assert_eq!(err.to_string(), "audio engine failed to start: no default device");
    }
}

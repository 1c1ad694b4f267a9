//! Error types for the audio pipeline

use thiserror::Error;

/// Errors that can occur while capturing or encoding audio
#[derive(Error, Debug)]
pub enum AudioError {
    /// ALSA device or PCM configuration failure
    #[error("ALSA error: {0}")]
    Alsa(#[from] alsa::Error),

    /// Opus encoder construction or encoding failure
    #[error("Opus error: {0}")]
    Opus(#[from] opus::Error),

    /// Sample-rate converter failure
    #[error("Resampler error: {0}")]
    Resample(String),

    /// OS thread spawning failed
    #[error("Thread spawn failed: {0}")]
    ThreadSpawn(#[from] std::io::Error),
}

/// Result type for audio operations
pub type Result<T> = std::result::Result<T, AudioError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AudioError::Resample("ratio out of range".into());
        assert!(err.to_string().contains("ratio out of range"));
    }
}

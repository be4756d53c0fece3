// Playback error types and reporting

use thiserror::Error;
use tracing::error;

use super::media::MediaSide;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    /// A resource failed to load or decode
    #[error("Failed to load {side} stream: {message}")]
    MediaLoad { side: MediaSide, message: String },
}

impl PlaybackError {
    pub fn side(&self) -> MediaSide {
        match self {
            Self::MediaLoad { side, .. } => *side,
        }
    }
}

/// Sink for failures the player cannot recover from on its own
pub trait ErrorReporter {
    fn report(&self, operation: &str, error: &dyn std::error::Error);
}

/// Default reporter: one error-level event per failure
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, operation: &str, error: &dyn std::error::Error) {
        error!(operation, "{}", error);
    }
}

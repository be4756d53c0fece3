// Playback module - keeps a video resource and an audio-only companion in step

pub mod driver;
pub mod errors;
pub mod media;
pub mod state;
pub mod sync;

#[cfg(test)]
pub(crate) mod testing;

pub use driver::{PlayerCommand, PlayerDriver, PlayerHandle};
pub use errors::{ErrorReporter, PlaybackError, TracingReporter};
pub use media::{
    MediaEvent, MediaEventSender, MediaHandle, MediaSide, PlayRejected, PlaybackSurface,
    SessionId, TaggedEvent,
};
pub use state::{Phase, CORRECTION_INTERVAL, DRIFT_TOLERANCE_SECS, UNMUTE_DELAY};
pub use sync::SyncController;

// Media capability seam
//
// The controller never talks to a concrete player. A surface hands out one
// handle per side and forwards the handle's notifications, tagged with the
// session they belong to, through a MediaEventSender.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tokio::sync::mpsc;

/// Which of the two resources an event or error belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaSide {
    /// Video-bearing resource (combined or video-only); drives playback
    Video,
    /// Audio-only companion of an adaptive video
    Audio,
}

impl fmt::Display for MediaSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => write!(f, "video"),
            Self::Audio => write!(f, "audio"),
        }
    }
}

/// Identifies one playback session; events from older sessions are dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Notifications a media resource reports
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    /// Enough data buffered to play through
    CanPlayThrough,
    Play,
    Pause,
    /// A seek started; `current_time` already reports the target
    Seeking,
    /// A seek completed
    Seeked,
    VolumeChange,
    RateChange,
    /// Load or decode failure
    Error(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaggedEvent {
    pub session: SessionId,
    pub side: MediaSide,
    pub event: MediaEvent,
}

/// A play command the resource refused (autoplay policy, no data, ...)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("play rejected: {0}")]
pub struct PlayRejected(pub String);

/// Control surface of one playable resource.
///
/// Times are seconds, volume is 0.0..=1.0.
pub trait MediaHandle {
    /// Assign the source and begin buffering
    fn load(&mut self, url: &str);

    fn play(&mut self) -> Result<(), PlayRejected>;
    fn pause(&mut self);

    fn current_time(&self) -> f64;
    fn seek(&mut self, seconds: f64);

    fn paused(&self) -> bool;
    fn ended(&self) -> bool;

    fn muted(&self) -> bool;
    fn set_muted(&mut self, muted: bool);

    fn volume(&self) -> f64;
    fn set_volume(&mut self, volume: f64);

    fn playback_rate(&self) -> f64;
    fn set_playback_rate(&mut self, rate: f64);

    /// Stop buffering and free the underlying resource
    fn release(&mut self);
}

/// Render target hosting one primary and at most one secondary resource
pub trait PlaybackSurface {
    type Media: MediaHandle;

    /// Called once by the driver; handles created later report through it
    fn attach_events(&mut self, _events: MediaEventSender) {}

    fn create_media(&mut self, session: SessionId, side: MediaSide) -> Self::Media;

    fn set_title(&mut self, _title: Option<&str>) {}
}

/// Cloneable sender media handles use to report their events
#[derive(Debug, Clone)]
pub struct MediaEventSender {
    tx: mpsc::UnboundedSender<TaggedEvent>,
}

impl MediaEventSender {
    pub(crate) fn new(tx: mpsc::UnboundedSender<TaggedEvent>) -> Self {
        Self { tx }
    }

    /// Returns false once the driver has shut down
    pub fn send(&self, session: SessionId, side: MediaSide, event: MediaEvent) -> bool {
        self.tx
            .send(TaggedEvent {
                session,
                side,
                event,
            })
            .is_ok()
    }
}

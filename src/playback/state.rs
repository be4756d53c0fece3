// Playback session state

use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::media::{MediaHandle, MediaSide, SessionId};

/// Secondary is re-seeked when it is further than this from the primary
pub const DRIFT_TOLERANCE_SECS: f64 = 0.15;

/// Period of the drift check while a session is active
pub const CORRECTION_INTERVAL: Duration = Duration::from_millis(500);

/// Delay between both play commands resolving and unmuting
pub const UNMUTE_DELAY: Duration = Duration::from_millis(100);

/// Lifecycle phase of the player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Resources assigned, waiting for every one to buffer
    Loading,
    /// Started muted from zero, unmute pending
    Starting,
    Playing,
    Paused,
    /// User seek in progress on the primary
    Seeking,
    /// A resource failed; the session ignores everything until restarted
    Error,
    /// No session
    Stopped,
}

impl Phase {
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Stopped)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Loading => "loading",
            Self::Starting => "starting",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Seeking => "seeking",
            Self::Error => "error",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Buffered-enough flags; a session without secondary starts with it set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Readiness {
    pub primary: bool,
    pub secondary: bool,
}

impl Readiness {
    pub fn new(has_secondary: bool) -> Self {
        Self {
            primary: false,
            secondary: !has_secondary,
        }
    }

    pub fn mark(&mut self, side: MediaSide) {
        match side {
            MediaSide::Video => self.primary = true,
            MediaSide::Audio => self.secondary = true,
        }
    }

    pub fn all_ready(&self) -> bool {
        self.primary && self.secondary
    }
}

/// One primary resource, an optional secondary and their timers
#[derive(Debug)]
pub struct PlaybackSession<M: MediaHandle> {
    pub(crate) id: SessionId,
    pub(crate) primary: M,
    pub(crate) secondary: Option<M>,
    pub(crate) readiness: Readiness,
    pub(crate) phase: Phase,
    pub(crate) errored: bool,
    pub(crate) is_user_seeking: bool,
    pub(crate) next_correction: Option<Instant>,
    pub(crate) unmute_at: Option<Instant>,
}

impl<M: MediaHandle> PlaybackSession<M> {
    pub(crate) fn new(id: SessionId, primary: M, secondary: Option<M>, now: Instant) -> Self {
        Self {
            id,
            readiness: Readiness::new(secondary.is_some()),
            primary,
            secondary,
            phase: Phase::Loading,
            errored: false,
            is_user_seeking: false,
            next_correction: Some(now + CORRECTION_INTERVAL),
            unmute_at: None,
        }
    }

    /// Earliest pending timer
    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        match (self.next_correction, self.unmute_at) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub(crate) fn cancel_timers(&mut self) {
        self.next_correction = None;
        self.unmute_at = None;
    }

    /// Rewind both to zero, mute them and start them.
    /// A refused play is logged; the session keeps going.
    pub(crate) fn start_muted(&mut self, now: Instant) {
        self.phase = Phase::Starting;

        self.primary.seek(0.0);
        self.primary.set_muted(true);
        if let Some(secondary) = self.secondary.as_mut() {
            secondary.seek(0.0);
            secondary.set_muted(true);
        }

        if let Err(e) = self.primary.play() {
            warn!(session = %self.id, "Primary play failed: {}", e);
        }
        if let Some(secondary) = self.secondary.as_mut() {
            if let Err(e) = secondary.play() {
                warn!(session = %self.id, "Secondary play failed: {}", e);
            }
        }

        self.unmute_at = Some(now + UNMUTE_DELAY);
    }

    pub(crate) fn unmute(&mut self) {
        self.unmute_at = None;
        self.primary.set_muted(false);
        if let Some(secondary) = self.secondary.as_mut() {
            secondary.set_muted(false);
        }

        if self.phase == Phase::Starting {
            self.phase = self.settled_phase();
        }
    }

    /// Phase to return to once no transient state is pending
    pub(crate) fn settled_phase(&self) -> Phase {
        if self.unmute_at.is_some() {
            Phase::Starting
        } else if self.primary.paused() {
            Phase::Paused
        } else {
            Phase::Playing
        }
    }

    /// Re-seek the secondary if it drifted past the tolerance.
    /// Returns true when a correction was issued.
    pub(crate) fn correct_drift(&mut self) -> bool {
        if self.phase != Phase::Playing || self.is_user_seeking {
            return false;
        }
        if self.primary.paused() || self.primary.ended() {
            return false;
        }
        let Some(secondary) = self.secondary.as_mut() else {
            return false;
        };

        let target = self.primary.current_time();
        let drift = target - secondary.current_time();
        if drift.abs() <= DRIFT_TOLERANCE_SECS {
            return false;
        }

        debug!(session = %self.id, drift, "Correcting secondary drift");
        secondary.seek(target);
        true
    }

    /// Cancel timers, then release every resource
    pub(crate) fn teardown(&mut self) {
        self.cancel_timers();
        self.primary.release();
        if let Some(secondary) = self.secondary.as_mut() {
            secondary.release();
        }
        self.phase = Phase::Stopped;
    }
}

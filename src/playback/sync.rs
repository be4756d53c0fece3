// Dual-track sync controller
//
// The primary (video-bearing) resource is the source of truth. Transport
// changes flow from it to the secondary (audio) resource, never back, and a
// periodic check pulls the secondary back when it drifts. Time is passed in
// by the caller so the whole machine runs without a clock of its own.

use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use super::errors::{ErrorReporter, PlaybackError, TracingReporter};
use super::media::{MediaEvent, MediaHandle, MediaSide, PlaybackSurface, SessionId, TaggedEvent};
use super::state::{Phase, PlaybackSession, CORRECTION_INTERVAL};

pub struct SyncController<S: PlaybackSurface> {
    surface: S,
    session: Option<PlaybackSession<S::Media>>,
    last_session: u64,
    last_error: Option<PlaybackError>,
    reporter: Box<dyn ErrorReporter>,
}

impl<S: PlaybackSurface> SyncController<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            session: None,
            last_session: 0,
            last_error: None,
            reporter: Box::new(TracingReporter),
        }
    }

    pub fn with_reporter(mut self, reporter: Box<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn phase(&self) -> Phase {
        self.session
            .as_ref()
            .map(|s| s.phase)
            .unwrap_or(Phase::Stopped)
    }

    /// True from `start` until `stop`, including a failed session
    pub fn is_playing(&self) -> bool {
        self.session.is_some()
    }

    pub fn is_user_seeking(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.is_user_seeking)
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.session.as_ref().map(|s| s.id)
    }

    pub fn last_error(&self) -> Option<&PlaybackError> {
        self.last_error.as_ref()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.session.as_ref().and_then(|s| s.next_deadline())
    }

    /// Tear down any current session and load a new one.
    ///
    /// An empty `audio_url` counts as none: the video resource then plays
    /// on its own.
    pub fn start(
        &mut self,
        video_url: &str,
        audio_url: Option<&str>,
        title: Option<&str>,
        now: Instant,
    ) -> SessionId {
        self.stop();
        self.last_error = None;

        self.last_session += 1;
        let id = SessionId(self.last_session);
        let audio_url = audio_url.filter(|url| !url.is_empty());

        self.surface.set_title(title);

        let mut primary = self.surface.create_media(id, MediaSide::Video);
        primary.load(video_url);

        let secondary = audio_url.map(|url| {
            let mut media = self.surface.create_media(id, MediaSide::Audio);
            media.load(url);
            media
        });

        info!(
            session = %id,
            separate_audio = secondary.is_some(),
            "Loading {}",
            title.unwrap_or(video_url)
        );

        self.session = Some(PlaybackSession::new(id, primary, secondary, now));
        id
    }

    /// Bring the secondary in line with the primary and continue playback.
    /// Used after the host view was hidden and shown again.
    pub fn resume(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.errored {
            return;
        }

        if let Some(secondary) = session.secondary.as_mut() {
            secondary.seek(session.primary.current_time());
            secondary.set_muted(session.primary.muted());
            secondary.set_volume(session.primary.volume());
            if !session.primary.paused() {
                if let Err(e) = secondary.play() {
                    warn!(session = %session.id, "Secondary play failed on resume: {}", e);
                }
            }
        }

        session.primary.set_muted(false);
        match session.primary.play() {
            Ok(()) => {
                if session.phase == Phase::Paused {
                    session.phase = Phase::Playing;
                }
            }
            Err(e) => warn!(session = %session.id, "Primary play failed on resume: {}", e),
        }
        debug!(session = %session.id, "Resumed");
    }

    /// Cancel timers and release both resources. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.teardown();
            info!(session = %session.id, "Playback stopped");
        }
    }

    pub fn handle_event(&mut self, event: TaggedEvent, now: Instant) {
        let Some(session) = self.session.as_mut() else {
            trace!(session = %event.session, "No active session, dropping {:?}", event.event);
            return;
        };
        if event.session != session.id {
            trace!(stale = %event.session, current = %session.id, "Dropping stale event");
            return;
        }
        if session.errored {
            return;
        }

        match (event.side, event.event) {
            (side, MediaEvent::Error(message)) => {
                session.errored = true;
                session.phase = Phase::Error;
                session.cancel_timers();

                let error = PlaybackError::MediaLoad { side, message };
                self.reporter.report("playback", &error);
                self.last_error = Some(error);
            }
            (side, MediaEvent::CanPlayThrough) => {
                session.readiness.mark(side);
                if session.phase == Phase::Loading && session.readiness.all_ready() {
                    debug!(session = %session.id, "All resources ready, starting muted");
                    session.start_muted(now);
                }
            }
            (MediaSide::Video, event) => follow_primary(session, event),
            (MediaSide::Audio, event) => {
                trace!(session = %session.id, "Ignoring secondary {:?}", event);
            }
        }
    }

    /// Fire whatever timers are due at `now`
    pub fn tick(&mut self, now: Instant) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.errored {
            return;
        }

        if session.unmute_at.is_some_and(|at| at <= now) {
            session.unmute();
            info!(session = %session.id, "Playback started");
        }

        if session.next_correction.is_some_and(|at| at <= now) {
            session.correct_drift();
            session.next_correction = Some(now + CORRECTION_INTERVAL);
        }
    }
}

/// Mirror a primary transport change onto the secondary
fn follow_primary<M: MediaHandle>(session: &mut PlaybackSession<M>, event: MediaEvent) {
    let position = session.primary.current_time();

    match event {
        MediaEvent::Play => {
            if let Some(secondary) = session.secondary.as_mut() {
                secondary.seek(position);
                if let Err(e) = secondary.play() {
                    warn!(session = %session.id, "Secondary play failed: {}", e);
                }
            }
            if session.phase == Phase::Paused {
                session.phase = Phase::Playing;
            }
        }
        MediaEvent::Pause => {
            if let Some(secondary) = session.secondary.as_mut() {
                secondary.pause();
            }
            if session.phase == Phase::Playing {
                session.phase = Phase::Paused;
            }
        }
        MediaEvent::Seeking => {
            session.is_user_seeking = true;
            if let Some(secondary) = session.secondary.as_mut() {
                secondary.seek(position);
            }
            if matches!(
                session.phase,
                Phase::Starting | Phase::Playing | Phase::Paused
            ) {
                session.phase = Phase::Seeking;
            }
        }
        MediaEvent::Seeked => {
            if let Some(secondary) = session.secondary.as_mut() {
                secondary.seek(position);
                if !session.primary.paused() {
                    if let Err(e) = secondary.play() {
                        warn!(session = %session.id, "Secondary play failed after seek: {}", e);
                    }
                }
            }
            session.is_user_seeking = false;
            if session.phase == Phase::Seeking {
                session.phase = session.settled_phase();
            }
        }
        MediaEvent::VolumeChange => {
            if let Some(secondary) = session.secondary.as_mut() {
                if session.primary.muted() {
                    secondary.set_muted(true);
                } else {
                    secondary.set_muted(false);
                    secondary.set_volume(session.primary.volume());
                }
            }
        }
        MediaEvent::RateChange => {
            if let Some(secondary) = session.secondary.as_mut() {
                secondary.set_playback_rate(session.primary.playback_rate());
            }
        }
        MediaEvent::CanPlayThrough | MediaEvent::Error(_) => {}
    }
}

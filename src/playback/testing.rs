// In-memory media for controller and driver tests

use std::cell::RefCell;
use std::rc::Rc;

use super::errors::ErrorReporter;
use super::media::{
    MediaEventSender, MediaHandle, MediaSide, PlayRejected, PlaybackSurface, SessionId,
};

#[derive(Debug, Clone, PartialEq)]
pub struct FakeState {
    pub url: Option<String>,
    pub time: f64,
    pub paused: bool,
    pub ended: bool,
    pub muted: bool,
    pub volume: f64,
    pub rate: f64,
    pub released: bool,
    pub play_calls: usize,
    pub seeks: Vec<f64>,
    pub reject_play: bool,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            url: None,
            time: 0.0,
            paused: true,
            ended: false,
            muted: false,
            volume: 1.0,
            rate: 1.0,
            released: false,
            play_calls: 0,
            seeks: Vec::new(),
            reject_play: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeMedia(pub Rc<RefCell<FakeState>>);

impl FakeMedia {
    pub fn state(&self) -> FakeState {
        self.0.borrow().clone()
    }

    pub fn set_time(&self, seconds: f64) {
        self.0.borrow_mut().time = seconds;
    }

    pub fn update(&self, f: impl FnOnce(&mut FakeState)) {
        f(&mut self.0.borrow_mut());
    }
}

impl MediaHandle for FakeMedia {
    fn load(&mut self, url: &str) {
        self.0.borrow_mut().url = Some(url.to_string());
    }

    fn play(&mut self) -> Result<(), PlayRejected> {
        let mut state = self.0.borrow_mut();
        state.play_calls += 1;
        if state.reject_play {
            return Err(PlayRejected("autoplay blocked".to_string()));
        }
        state.paused = false;
        Ok(())
    }

    fn pause(&mut self) {
        self.0.borrow_mut().paused = true;
    }

    fn current_time(&self) -> f64 {
        self.0.borrow().time
    }

    fn seek(&mut self, seconds: f64) {
        let mut state = self.0.borrow_mut();
        state.time = seconds;
        state.seeks.push(seconds);
    }

    fn paused(&self) -> bool {
        self.0.borrow().paused
    }

    fn ended(&self) -> bool {
        self.0.borrow().ended
    }

    fn muted(&self) -> bool {
        self.0.borrow().muted
    }

    fn set_muted(&mut self, muted: bool) {
        self.0.borrow_mut().muted = muted;
    }

    fn volume(&self) -> f64 {
        self.0.borrow().volume
    }

    fn set_volume(&mut self, volume: f64) {
        self.0.borrow_mut().volume = volume;
    }

    fn playback_rate(&self) -> f64 {
        self.0.borrow().rate
    }

    fn set_playback_rate(&mut self, rate: f64) {
        self.0.borrow_mut().rate = rate;
    }

    fn release(&mut self) {
        let mut state = self.0.borrow_mut();
        state.released = true;
        state.paused = true;
        state.url = None;
    }
}

/// Records every handle it creates so tests can poke at them afterwards
#[derive(Debug, Clone, Default)]
pub struct FakeSurface {
    pub created: Rc<RefCell<Vec<(SessionId, MediaSide, FakeMedia)>>>,
    pub title: Rc<RefCell<Option<String>>>,
    pub events: Rc<RefCell<Option<MediaEventSender>>>,
    /// Applied to every audio handle on creation
    pub reject_audio_play: bool,
}

impl FakeSurface {
    /// Most recently created handle for `side`
    pub fn media(&self, side: MediaSide) -> FakeMedia {
        self.created
            .borrow()
            .iter()
            .rev()
            .find(|(_, s, _)| *s == side)
            .map(|(_, _, media)| media.clone())
            .expect("no media created for side")
    }

    pub fn latest_session(&self) -> SessionId {
        self.created
            .borrow()
            .last()
            .map(|(session, _, _)| *session)
            .expect("no session created")
    }

    pub fn created_count(&self) -> usize {
        self.created.borrow().len()
    }
}

impl PlaybackSurface for FakeSurface {
    type Media = FakeMedia;

    fn attach_events(&mut self, events: MediaEventSender) {
        *self.events.borrow_mut() = Some(events);
    }

    fn create_media(&mut self, session: SessionId, side: MediaSide) -> FakeMedia {
        let media = FakeMedia::default();
        if side == MediaSide::Audio && self.reject_audio_play {
            media.update(|s| s.reject_play = true);
        }
        self.created.borrow_mut().push((session, side, media.clone()));
        media
    }

    fn set_title(&mut self, title: Option<&str>) {
        *self.title.borrow_mut() = title.map(str::to_string);
    }
}

/// Collects reported failures as strings
#[derive(Debug, Clone, Default)]
pub struct RecordingReporter(pub Rc<RefCell<Vec<String>>>);

impl ErrorReporter for RecordingReporter {
    fn report(&self, operation: &str, error: &dyn std::error::Error) {
        self.0.borrow_mut().push(format!("{}: {}", operation, error));
    }
}

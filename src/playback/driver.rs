// Async driver for the sync controller
//
// Owns the controller on a single task and serializes host commands, media
// events and timer expiries through one select loop. Media handles are
// usually tied to a UI thread, so the driver is not Send; run it with
// `spawn_local` or on the thread that owns the surface.

use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info};

use super::errors::ErrorReporter;
use super::media::{MediaEventSender, PlaybackSurface, TaggedEvent};
use super::state::Phase;
use super::sync::SyncController;
use crate::player::PlaybackRequest;

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCommand {
    Start {
        video_url: String,
        audio_url: Option<String>,
        title: Option<String>,
    },
    Resume,
    Stop,
    Shutdown,
}

/// Cloneable remote control for a running driver
#[derive(Debug, Clone)]
pub struct PlayerHandle {
    commands: mpsc::UnboundedSender<PlayerCommand>,
    events: MediaEventSender,
    phase: watch::Receiver<Phase>,
}

impl PlayerHandle {
    /// Returns false if the driver is gone
    pub fn send(&self, command: PlayerCommand) -> bool {
        self.commands.send(command).is_ok()
    }

    pub fn start(&self, video_url: &str, audio_url: Option<&str>, title: Option<&str>) -> bool {
        self.send(PlayerCommand::Start {
            video_url: video_url.to_string(),
            audio_url: audio_url.map(str::to_string),
            title: title.map(str::to_string),
        })
    }

    /// Start a prepared request, e.g. after a quality switch
    pub fn play_request(&self, request: &PlaybackRequest) -> bool {
        self.start(
            &request.video_url,
            request.audio_url.as_deref(),
            request.title.as_deref(),
        )
    }

    pub fn resume(&self) -> bool {
        self.send(PlayerCommand::Resume)
    }

    pub fn stop(&self) -> bool {
        self.send(PlayerCommand::Stop)
    }

    pub fn shutdown(&self) -> bool {
        self.send(PlayerCommand::Shutdown)
    }

    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    pub fn is_playing(&self) -> bool {
        self.phase().is_active()
    }

    /// Receiver that wakes on every phase change
    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.phase.clone()
    }

    /// Sender for media handles that are created outside the surface
    pub fn media_events(&self) -> MediaEventSender {
        self.events.clone()
    }
}

pub struct PlayerDriver<S: PlaybackSurface> {
    controller: SyncController<S>,
    commands: mpsc::UnboundedReceiver<PlayerCommand>,
    events: mpsc::UnboundedReceiver<TaggedEvent>,
    phase: watch::Sender<Phase>,
}

impl<S: PlaybackSurface> PlayerDriver<S> {
    pub fn new(surface: S) -> (Self, PlayerHandle) {
        Self::with_controller(SyncController::new(surface))
    }

    pub fn with_reporter(surface: S, reporter: Box<dyn ErrorReporter>) -> (Self, PlayerHandle) {
        Self::with_controller(SyncController::new(surface).with_reporter(reporter))
    }

    fn with_controller(mut controller: SyncController<S>) -> (Self, PlayerHandle) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (phase_tx, phase_rx) = watch::channel(Phase::Stopped);

        let events = MediaEventSender::new(event_tx);
        controller.surface_mut().attach_events(events.clone());

        let driver = Self {
            controller,
            commands: command_rx,
            events: event_rx,
            phase: phase_tx,
        };
        let handle = PlayerHandle {
            commands: command_tx,
            events,
            phase: phase_rx,
        };
        (driver, handle)
    }

    /// Run until a Shutdown command arrives or every handle is dropped.
    /// The current session is torn down before returning.
    pub async fn run(mut self) {
        info!("Player driver started");

        loop {
            let deadline = self.controller.next_deadline();

            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(PlayerCommand::Shutdown) | None => break,
                    Some(command) => self.apply(command),
                },
                Some(event) = self.events.recv() => {
                    self.controller.handle_event(event, Instant::now());
                }
                _ = wait_until(deadline) => {
                    self.controller.tick(Instant::now());
                }
            }

            self.publish();
        }

        self.controller.stop();
        self.publish();
        info!("Player driver stopped");
    }

    fn apply(&mut self, command: PlayerCommand) {
        debug!("Player command: {:?}", command);
        match command {
            PlayerCommand::Start {
                video_url,
                audio_url,
                title,
            } => {
                self.controller.start(
                    &video_url,
                    audio_url.as_deref(),
                    title.as_deref(),
                    Instant::now(),
                );
            }
            PlayerCommand::Resume => self.controller.resume(),
            PlayerCommand::Stop => self.controller.stop(),
            PlayerCommand::Shutdown => {}
        }
    }

    fn publish(&self) {
        let phase = self.controller.phase();
        self.phase.send_if_modified(|current| {
            if *current == phase {
                false
            } else {
                *current = phase;
                true
            }
        });
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

//! Real-time preview playback.
//!
//! [`PlaybackDriver`] owns a [`CameraController`] and runs it against the
//! tokio clock. Commands arrive over a channel, poses go out over another.
//! The loop sleeps until whichever comes first: the next command or the
//! controller's next tick.

use std::time::Duration;

use flyover_common::{FlyoverError, FlyoverResult};
use flyover_processing_core::{CameraController, PlayerEvent};
use tokio::sync::mpsc;
use tokio::time::Instant;

const COMMAND_BUFFER: usize = 32;

/// Control input for a running preview.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaybackCommand {
    Play,
    Pause,
    SeekFrame(u32),
    SeekProgress(f64),
    SetSpeed(f64),
    /// Stop for good and end the driver loop.
    Dispose,
}

/// Sending side of a preview. Cheap to clone.
#[derive(Debug, Clone)]
pub struct PlaybackHandle {
    commands: mpsc::Sender<PlaybackCommand>,
}

impl PlaybackHandle {
    pub async fn send(&self, command: PlaybackCommand) -> FlyoverResult<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| FlyoverError::invalid_state("playback driver has stopped"))
    }

    pub async fn play(&self) -> FlyoverResult<()> {
        self.send(PlaybackCommand::Play).await
    }

    pub async fn pause(&self) -> FlyoverResult<()> {
        self.send(PlaybackCommand::Pause).await
    }

    pub async fn dispose(&self) -> FlyoverResult<()> {
        self.send(PlaybackCommand::Dispose).await
    }
}

/// Runs a camera controller in real time.
pub struct PlaybackDriver {
    controller: CameraController,
    commands: mpsc::Receiver<PlaybackCommand>,
    events: mpsc::UnboundedSender<PlayerEvent>,
    epoch: Instant,
}

impl PlaybackDriver {
    /// Wrap `controller`. Returns the driver, its command handle and the
    /// event stream.
    pub fn new(
        controller: CameraController,
    ) -> (
        Self,
        PlaybackHandle,
        mpsc::UnboundedReceiver<PlayerEvent>,
    ) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let driver = Self {
            controller,
            commands: command_rx,
            events: event_tx,
            epoch: Instant::now(),
        };
        (
            driver,
            PlaybackHandle {
                commands: command_tx,
            },
            event_rx,
        )
    }

    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }

    /// Drive playback until disposed, every handle is dropped, or the
    /// event receiver goes away. Returns the disposed controller.
    pub async fn run(mut self) -> CameraController {
        loop {
            let deadline = self.controller.next_deadline();
            let wake = self.epoch + deadline.unwrap_or(Duration::ZERO);

            let keep_going = tokio::select! {
                biased;
                command = self.commands.recv() => match command {
                    Some(command) => self.apply(command),
                    None => false,
                },
                _ = tokio::time::sleep_until(wake), if deadline.is_some() => self.tick(),
            };
            if !keep_going {
                break;
            }
        }

        self.controller.dispose();
        tracing::debug!(
            frame = self.controller.current_frame(),
            "Preview playback stopped"
        );
        self.controller
    }

    fn apply(&mut self, command: PlaybackCommand) -> bool {
        tracing::trace!(?command, "Playback command");
        let now = self.now();
        match command {
            PlaybackCommand::Play => {
                self.controller.play(now);
                true
            }
            PlaybackCommand::Pause => {
                self.controller.pause();
                true
            }
            PlaybackCommand::SeekFrame(frame) => {
                let pose = self.controller.seek_to_frame(frame);
                self.emit(PlayerEvent::Frame(pose))
            }
            PlaybackCommand::SeekProgress(progress) => {
                let pose = self.controller.seek_to_progress(progress);
                self.emit(PlayerEvent::Frame(pose))
            }
            PlaybackCommand::SetSpeed(speed) => {
                self.controller.set_speed(speed, now);
                true
            }
            PlaybackCommand::Dispose => false,
        }
    }

    fn tick(&mut self) -> bool {
        let now = self.now();
        self.controller
            .poll(now)
            .into_iter()
            .all(|event| self.emit(event))
    }

    fn emit(&self, event: PlayerEvent) -> bool {
        self.events.send(event).is_ok()
    }
}

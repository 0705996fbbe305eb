//! Replay sessions
//!
//! A session is one open replay view: it borrows a shared ride track, owns
//! its own playback clock, and broadcasts a fresh [`PlaybackFrame`] after
//! every change so renderers can redraw. While playing it also holds the
//! handle of its periodic timer task; dropping the handle cancels the task.

use replay_core::{
    clock::{ClockSnapshot, PlaybackClock},
    derive_state,
    error::Result,
    model::{RideListing, RideTrack},
    units::Seconds,
    DerivedPlaybackState, ReplayConfig,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::sync::{CancellationToken, DropGuard};

/// Frames buffered per subscriber before slow readers start lagging
const FRAME_CHANNEL_CAPACITY: usize = 64;

/// Clock state plus the playback state derived from it
#[derive(Debug, Clone, Serialize)]
pub struct PlaybackFrame {
    pub clock: ClockSnapshot,
    pub state: DerivedPlaybackState,
}

/// Control actions accepted by a session
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlAction {
    Play,
    Pause,
    Seek(Seconds),
    Speed(f64),
    CycleSpeed,
    Reset,
}

/// Handle for a running playback timer task
struct PlaybackTimer {
    generation: u64,
    _guard: DropGuard,
}

pub struct ReplaySession {
    id: String,
    track: Arc<RideTrack>,
    config: Arc<ReplayConfig>,
    clock: PlaybackClock,
    frames_tx: broadcast::Sender<PlaybackFrame>,
    timer: Option<PlaybackTimer>,
    timer_generation: u64,
}

impl ReplaySession {
    pub fn new(id: String, track: Arc<RideTrack>, config: Arc<ReplayConfig>) -> Self {
        let clock = PlaybackClock::new(&track, &config);
        let (frames_tx, _) = broadcast::channel(FRAME_CHANNEL_CAPACITY);

        Self {
            id,
            track,
            config,
            clock,
            frames_tx,
            timer: None,
            timer_generation: 0,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn track(&self) -> &Arc<RideTrack> {
        &self.track
    }

    pub fn clock(&self) -> &PlaybackClock {
        &self.clock
    }

    pub fn frame(&self) -> PlaybackFrame {
        PlaybackFrame {
            clock: self.clock.snapshot(),
            state: derive_state(&self.track, self.clock.current_offset(), &self.config),
        }
    }

    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            session_id: self.id.clone(),
            ride: self.track.listing(),
            timer_active: self.has_timer(),
            frame: self.frame(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackFrame> {
        self.frames_tx.subscribe()
    }

    /// Apply a control action and broadcast the resulting frame.
    ///
    /// Leaving the playing state releases the timer.
    pub fn apply(&mut self, action: ControlAction) -> Result<ClockSnapshot> {
        let snapshot = match action {
            ControlAction::Play => self.clock.play(),
            ControlAction::Pause => self.clock.pause(),
            ControlAction::Seek(offset) => self.clock.seek(offset),
            ControlAction::Speed(multiplier) => self.clock.set_speed(multiplier)?,
            ControlAction::CycleSpeed => self.clock.cycle_speed(),
            ControlAction::Reset => self.clock.reset(),
        };

        if !snapshot.is_playing {
            self.timer = None;
        }
        self.broadcast();
        Ok(snapshot)
    }

    /// Advance the clock by one timer tick and broadcast the new frame
    pub fn tick(&mut self, elapsed: Duration) -> PlaybackFrame {
        self.clock.tick(elapsed);
        self.broadcast()
    }

    fn broadcast(&self) -> PlaybackFrame {
        let frame = self.frame();
        // No receivers is fine, renderers pick up the next frame
        let _ = self.frames_tx.send(frame.clone());
        frame
    }

    pub fn has_timer(&self) -> bool {
        self.timer.is_some()
    }

    /// Install a timer handle if none is running.
    ///
    /// Returns the generation and token the timer task must watch, or
    /// `None` when a timer is already active or the clock is not playing.
    pub fn arm_timer(&mut self) -> Option<(u64, CancellationToken)> {
        if self.timer.is_some() || !self.clock.is_playing() {
            return None;
        }
        self.timer_generation += 1;
        let token = CancellationToken::new();
        self.timer = Some(PlaybackTimer {
            generation: self.timer_generation,
            _guard: token.clone().drop_guard(),
        });
        Some((self.timer_generation, token))
    }

    /// Release the timer handle, but only if it still belongs to `generation`
    pub fn release_timer(&mut self, generation: u64) {
        if self
            .timer
            .as_ref()
            .is_some_and(|t| t.generation == generation)
        {
            self.timer = None;
        }
    }
}

/// Serializable session info for the API
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub session_id: String,
    pub ride: RideListing,
    pub timer_active: bool,
    pub frame: PlaybackFrame,
}

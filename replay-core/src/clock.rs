//! Playback clock for a single replay
//!
//! Owns the replay cursor, the play/pause state and the speed multiplier.
//! The clock never reads wall time itself: whoever drives playback measures
//! elapsed time and feeds it to [`PlaybackClock::tick`]. Every mutator clamps
//! its input, so a constructed clock can never hold an out-of-range cursor.

use crate::config::ReplayConfig;
use crate::error::{ReplayError, Result};
use crate::model::RideTrack;
use crate::units::Seconds;
use serde::Serialize;
use std::time::Duration;

/// Serializable view of the clock returned by every mutator
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClockSnapshot {
    pub current_offset_seconds: Seconds,
    pub is_playing: bool,
    pub speed_multiplier: f64,
    pub total_duration_seconds: Seconds,
}

/// Play/pause/seek/speed state machine bound to one track duration
#[derive(Debug, Clone)]
pub struct PlaybackClock {
    duration: Seconds,
    current: Seconds,
    playing: bool,
    speed: f64,
    presets: Vec<f64>,
    restart_at_end: bool,
}

impl PlaybackClock {
    /// Create a stopped clock at offset 0 for `track`
    pub fn new(track: &RideTrack, config: &ReplayConfig) -> Self {
        Self::with_duration(track.total_duration(), config)
    }

    pub fn with_duration(duration: Seconds, config: &ReplayConfig) -> Self {
        let duration = if duration.0.is_finite() {
            Seconds(duration.0.max(0.0))
        } else {
            Seconds(0.0)
        };

        Self {
            duration,
            current: Seconds(0.0),
            playing: false,
            speed: 1.0,
            presets: config.speed_presets.clone(),
            restart_at_end: config.restart_at_end,
        }
    }

    pub fn snapshot(&self) -> ClockSnapshot {
        ClockSnapshot {
            current_offset_seconds: self.current,
            is_playing: self.playing,
            speed_multiplier: self.speed,
            total_duration_seconds: self.duration,
        }
    }

    pub fn current_offset(&self) -> Seconds {
        self.current
    }

    pub fn duration(&self) -> Seconds {
        self.duration
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn is_at_end(&self) -> bool {
        self.current.0 >= self.duration.0
    }

    /// Start playing. At the end of the track this rewinds first when
    /// `restart_at_end` is set, otherwise it stays stopped.
    pub fn play(&mut self) -> ClockSnapshot {
        if self.playing {
            return self.snapshot();
        }
        if self.is_at_end() {
            if !self.restart_at_end {
                return self.snapshot();
            }
            self.current = Seconds(0.0);
        }
        self.playing = true;
        self.snapshot()
    }

    pub fn pause(&mut self) -> ClockSnapshot {
        self.playing = false;
        self.snapshot()
    }

    /// Move the cursor, clamped to the track. Play state is untouched.
    pub fn seek(&mut self, offset: Seconds) -> ClockSnapshot {
        self.current = if offset.0.is_nan() {
            Seconds(0.0)
        } else {
            Seconds(offset.0.clamp(0.0, self.duration.0))
        };
        self.snapshot()
    }

    pub fn set_speed(&mut self, multiplier: f64) -> Result<ClockSnapshot> {
        if !multiplier.is_finite() || multiplier <= 0.0 {
            return Err(ReplayError::invalid_argument(format!(
                "speed multiplier must be a positive number, got {}",
                multiplier
            )));
        }
        self.speed = multiplier;
        Ok(self.snapshot())
    }

    /// Switch to the preset following the current multiplier, wrapping around
    pub fn cycle_speed(&mut self) -> ClockSnapshot {
        let next = match self
            .presets
            .iter()
            .position(|p| (p - self.speed).abs() < f64::EPSILON)
        {
            Some(i) => self.presets.get((i + 1) % self.presets.len()).copied(),
            None => self
                .presets
                .iter()
                .copied()
                .find(|p| *p > self.speed)
                .or_else(|| self.presets.first().copied()),
        };
        if let Some(speed) = next {
            self.speed = speed;
        }
        self.snapshot()
    }

    /// Rewind to the start and stop
    pub fn reset(&mut self) -> ClockSnapshot {
        self.playing = false;
        self.current = Seconds(0.0);
        self.snapshot()
    }

    /// Advance the cursor by `elapsed` wall-clock time scaled by the speed
    /// multiplier. Reaching the end clamps the cursor and pauses.
    pub fn tick(&mut self, elapsed: Duration) -> ClockSnapshot {
        if !self.playing {
            return self.snapshot();
        }

        let next = self.current.0 + elapsed.as_secs_f64() * self.speed;
        if next >= self.duration.0 {
            self.current = self.duration;
            self.playing = false;
        } else {
            self.current = Seconds(next);
        }
        self.snapshot()
    }
}

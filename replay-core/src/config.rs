//! Engine configuration, provided at construction time

use crate::error::{ReplayError, Result};
use crate::units::Seconds;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_PROXIMITY_WINDOW_SECONDS: f64 = 10.0;
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 100;
pub const DEFAULT_SPEED_PRESETS: [f64; 4] = [0.5, 1.0, 2.0, 4.0];

/// Tunables for interpolation and playback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Events within this many seconds of the cursor are reported as active
    pub proximity_window_seconds: f64,

    /// Wall-clock period between playback ticks
    pub tick_interval_ms: u64,

    /// Multipliers offered by the speed control, in cycling order
    pub speed_presets: Vec<f64>,

    /// Whether `play()` at the end of a track rewinds to the start
    pub restart_at_end: bool,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            proximity_window_seconds: DEFAULT_PROXIMITY_WINDOW_SECONDS,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            speed_presets: DEFAULT_SPEED_PRESETS.to_vec(),
            restart_at_end: false,
        }
    }
}

impl ReplayConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.proximity_window_seconds.is_finite() || self.proximity_window_seconds < 0.0 {
            return Err(ReplayError::invalid_config(format!(
                "proximity_window_seconds must be a non-negative number, got {}",
                self.proximity_window_seconds
            )));
        }
        if self.tick_interval_ms == 0 {
            return Err(ReplayError::invalid_config(
                "tick_interval_ms must be greater than zero",
            ));
        }
        if self.speed_presets.is_empty() {
            return Err(ReplayError::invalid_config(
                "speed_presets must contain at least one multiplier",
            ));
        }
        if let Some(bad) = self
            .speed_presets
            .iter()
            .find(|m| !m.is_finite() || **m <= 0.0)
        {
            return Err(ReplayError::invalid_config(format!(
                "speed preset {} is not a positive multiplier",
                bad
            )));
        }
        Ok(())
    }

    pub fn proximity_window(&self) -> Seconds {
        Seconds(self.proximity_window_seconds)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

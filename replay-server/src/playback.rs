//! Periodic playback timer
//!
//! One task per playing session. Each tick measures the wall-clock time
//! since the previous tick, advances the session clock by it and broadcasts
//! the new frame. The task exits when its token is cancelled (pause, close,
//! newer timer) or when the clock stops at the end of the ride.

use crate::state::AppState;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Start the timer for `session_id` unless one is already running
pub async fn start_playback_task(state: AppState, session_id: String) {
    let (generation, cancel_token) = {
        let mut sessions = state.sessions.write().await;
        match sessions.get_mut(&session_id).and_then(|s| s.arm_timer()) {
            Some(armed) => armed,
            None => return,
        }
    };

    let sessions = state.sessions.clone();
    let tick_interval = state.config.tick_interval();

    tokio::spawn(async move {
        info!(session_id = %session_id, generation, "Playback timer started");

        let mut ticker = tokio::time::interval(tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;
        let mut last_tick = Instant::now();

        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => break,
                _ = ticker.tick() => {},
            }

            let now = Instant::now();
            let elapsed = now - last_tick;
            last_tick = now;

            let mut open = sessions.write().await;
            if cancel_token.is_cancelled() {
                break;
            }
            let Some(session) = open.get_mut(&session_id) else {
                break;
            };

            let frame = session.tick(elapsed);
            if !frame.clock.is_playing {
                debug!(
                    session_id = %session_id,
                    offset = frame.clock.current_offset_seconds.0,
                    "Playback reached end of ride"
                );
                session.release_timer(generation);
                break;
            }
        }

        info!(session_id = %session_id, generation, "Playback timer stopped");
    });
}

//! Application state management

use crate::replay::{ReplaySession, SessionInfo};
use replay_core::{error::Result, model::RideTrack, source::RideTrackSource, ReplayConfig};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::RwLock;
use tracing::info;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Where ride tracks come from
    pub source: Arc<dyn RideTrackSource>,

    /// Engine configuration shared by every session
    pub config: Arc<ReplayConfig>,

    /// Open replay sessions by id
    pub sessions: Arc<RwLock<HashMap<String, ReplaySession>>>,

    /// Tracks currently borrowed by at least one session
    tracks: Arc<RwLock<HashMap<String, Weak<RideTrack>>>>,

    next_session_id: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(source: Arc<dyn RideTrackSource>, config: ReplayConfig) -> Self {
        Self {
            source,
            config: Arc::new(config),
            sessions: Arc::new(RwLock::new(HashMap::new())),
            tracks: Arc::new(RwLock::new(HashMap::new())),
            next_session_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Load a track, reusing the copy already held by an open session
    pub async fn load_track(&self, ride_id: &str) -> Result<Arc<RideTrack>> {
        if let Some(track) = self
            .tracks
            .read()
            .await
            .get(ride_id)
            .and_then(Weak::upgrade)
        {
            return Ok(track);
        }

        let track = Arc::new(self.source.load_ride_track(ride_id)?);

        let mut tracks = self.tracks.write().await;
        tracks.retain(|_, t| t.strong_count() > 0);
        tracks.insert(ride_id.to_string(), Arc::downgrade(&track));

        Ok(track)
    }

    /// Open a new replay session; nothing is created if the ride fails to load
    pub async fn open_session(&self, ride_id: &str) -> Result<SessionInfo> {
        let track = self.load_track(ride_id).await?;

        let id = format!(
            "session-{}",
            self.next_session_id.fetch_add(1, Ordering::Relaxed)
        );
        let session = ReplaySession::new(id.clone(), track, self.config.clone());
        let info = session.info();

        self.sessions.write().await.insert(id.clone(), session);
        info!(session_id = %id, ride_id, "Replay session opened");

        Ok(info)
    }

    /// Close a session, cancelling its timer. Returns false if unknown.
    pub async fn close_session(&self, session_id: &str) -> bool {
        let removed = self.sessions.write().await.remove(session_id);
        if removed.is_some() {
            info!(session_id, "Replay session closed");
        }
        removed.is_some()
    }

    pub async fn close_all_sessions(&self) {
        let mut sessions = self.sessions.write().await;
        let count = sessions.len();
        sessions.clear();
        info!("Closed {} replay sessions", count);
    }
}

//! REST API and SSE routes

use crate::error::ApiError;
use crate::playback::start_playback_task;
use crate::replay::{ControlAction, PlaybackFrame, SessionInfo};
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    routing::{get, post},
    Json, Router,
};
use futures::stream::{self, Stream, StreamExt as FuturesStreamExt};
use replay_core::{
    clock::ClockSnapshot, derive_state, model::RideListing, units::Seconds, DerivedPlaybackState,
};
use serde::Deserialize;
use std::convert::Infallible;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tower_http::cors::CorsLayer;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Ride endpoints
        .route("/api/rides", get(list_rides))
        .route("/api/rides/:id", get(get_ride))
        .route("/api/rides/:id/state", get(ride_state))
        // Session endpoints
        .route("/api/sessions", get(list_sessions).post(open_session))
        .route("/api/sessions/:id", get(get_session).delete(close_session))
        .route("/api/sessions/:id/control", post(session_control))
        .route("/api/sessions/:id/stream", get(session_stream))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// === Ride Endpoints ===

async fn list_rides(State(state): State<AppState>) -> Result<Json<Vec<RideListing>>, ApiError> {
    Ok(Json(state.source.list_rides()?))
}

async fn get_ride(
    State(state): State<AppState>,
    Path(ride_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let track = state.load_track(&ride_id).await?;

    Ok(Json(serde_json::json!({
        "track": &*track,
        "route": track.route(),
        "summary": track.summary(),
    })))
}

#[derive(Deserialize)]
struct StateQuery {
    #[serde(default)]
    offset: f64,
}

/// Stateless derivation for an arbitrary offset (hover previews, thumbnails)
async fn ride_state(
    State(state): State<AppState>,
    Path(ride_id): Path<String>,
    Query(query): Query<StateQuery>,
) -> Result<Json<DerivedPlaybackState>, ApiError> {
    let track = state.load_track(&ride_id).await?;
    Ok(Json(derive_state(&track, Seconds(query.offset), &state.config)))
}

// === Session Endpoints ===

#[derive(Deserialize)]
struct OpenSessionRequest {
    ride_id: String,
}

async fn open_session(
    State(state): State<AppState>,
    request: Result<Json<OpenSessionRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = request?;
    let info = state.open_session(&request.ride_id).await?;
    Ok((StatusCode::CREATED, Json(info)))
}

async fn list_sessions(State(state): State<AppState>) -> Json<Vec<SessionInfo>> {
    let sessions = state.sessions.read().await;
    let mut info: Vec<SessionInfo> = sessions.values().map(|s| s.info()).collect();
    info.sort_by(|a, b| a.session_id.cmp(&b.session_id));
    Json(info)
}

async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionInfo>, ApiError> {
    let sessions = state.sessions.read().await;
    let session = sessions
        .get(&session_id)
        .ok_or(ApiError::SessionNotFound(session_id.clone()))?;
    Ok(Json(session.info()))
}

async fn close_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.close_session(&session_id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::SessionNotFound(session_id))
    }
}

#[derive(Deserialize)]
struct ControlRequest {
    action: String,
    value: Option<f64>,
}

impl TryFrom<ControlRequest> for ControlAction {
    type Error = ApiError;

    fn try_from(request: ControlRequest) -> Result<Self, ApiError> {
        let value = |name: &str| {
            request
                .value
                .ok_or_else(|| ApiError::BadRequest(format!("Missing 'value' for {}", name)))
        };

        match request.action.as_str() {
            "play" => Ok(ControlAction::Play),
            "pause" => Ok(ControlAction::Pause),
            "seek" => Ok(ControlAction::Seek(Seconds(value("seek")?))),
            "speed" => Ok(ControlAction::Speed(value("speed")?)),
            "cycle_speed" => Ok(ControlAction::CycleSpeed),
            "reset" => Ok(ControlAction::Reset),
            other => Err(ApiError::BadRequest(format!("Unknown action: {}", other))),
        }
    }
}

async fn session_control(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    request: Result<Json<ControlRequest>, JsonRejection>,
) -> Result<Json<ClockSnapshot>, ApiError> {
    let Json(request) = request?;
    let action = ControlAction::try_from(request)?;

    let snapshot = {
        let mut sessions = state.sessions.write().await;
        let session = sessions
            .get_mut(&session_id)
            .ok_or(ApiError::SessionNotFound(session_id.clone()))?;
        session.apply(action)?
    };

    if snapshot.is_playing {
        start_playback_task(state.clone(), session_id).await;
    }

    Ok(Json(snapshot))
}

async fn session_stream(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let (initial, rx) = {
        let sessions = state.sessions.read().await;
        let session = sessions
            .get(&session_id)
            .ok_or(ApiError::SessionNotFound(session_id.clone()))?;
        (session.frame(), session.subscribe())
    };

    // Send the current frame first so a new subscriber can draw immediately
    let frames = stream::once(async move { Ok::<PlaybackFrame, BroadcastStreamRecvError>(initial) })
        .chain(BroadcastStream::new(rx));

    let events = frames.filter_map(|result| async move {
        match result {
            Ok(frame) => match serde_json::to_string(&frame) {
                Ok(json) => Some(Ok(Event::default().data(json))),
                Err(e) => {
                    tracing::error!("Failed to serialize frame: {}", e);
                    None
                }
            },
            Err(e) => {
                tracing::warn!("Frame stream lagged: {}", e);
                None
            }
        }
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

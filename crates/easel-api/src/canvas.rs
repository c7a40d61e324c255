use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{error, info};

use easel_types::api::{
    CanvasState, SnapshotCreated, SnapshotMeta, SnapshotRequest, SnapshotResponse,
};
use easel_types::models::Identity;

use crate::AppState;

/// The empty canvas. Clearing appends a version holding this state
/// rather than deleting history.
const EMPTY_STATE: &str = "[]";

/// Explicit save point: always appends a new version.
pub async fn save_snapshot(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<SnapshotRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let snap = tokio::task::spawn_blocking(move || {
        db.db.append_snapshot(&req.room_id, &req.state_json)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?
    .map_err(|e| {
        error!("snapshot append failed: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    info!("{} saved snapshot {} for {}", identity.email, snap.id, snap.room_id);

    Ok((
        StatusCode::CREATED,
        Json(SnapshotCreated {
            snapshot_id: snap.id,
            room_id: snap.room_id,
            created_at: snap.created_at,
        }),
    ))
}

/// Version history for a room, newest first, metadata only.
pub async fn list_snapshots(
    State(state): State<AppState>,
    Extension(_identity): Extension<Identity>,
    Path(room_id): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let snaps = tokio::task::spawn_blocking(move || db.db.list_snapshots(&room_id))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let listing: Vec<SnapshotMeta> = snaps
        .into_iter()
        .map(|s| SnapshotMeta {
            snapshot_id: s.id,
            room_id: s.room_id,
            created_at: s.created_at,
        })
        .collect();
    Ok(Json(listing))
}

/// Point lookup by id. A missing id is a 404, unlike an empty history.
pub async fn get_snapshot(
    State(state): State<AppState>,
    Extension(_identity): Extension<Identity>,
    Path(snapshot_id): Path<i64>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let snap = tokio::task::spawn_blocking(move || db.db.get_snapshot(snapshot_id))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(SnapshotResponse {
        snapshot_id: snap.id,
        room_id: snap.room_id,
        state_json: snap.state_json,
        created_at: snap.created_at,
    }))
}

/// High-frequency autosave: overwrite the latest slot in place, or
/// create it on first save. Racing writers resolve by commit order.
pub async fn save_state(
    State(state): State<AppState>,
    Extension(_identity): Extension<Identity>,
    Json(req): Json<SnapshotRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let snap = tokio::task::spawn_blocking(move || {
        db.db.upsert_latest_snapshot(&req.room_id, &req.state_json)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?
    .map_err(|e| {
        error!("canvas save failed: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok((
        StatusCode::CREATED,
        Json(SnapshotCreated {
            snapshot_id: snap.id,
            room_id: snap.room_id,
            created_at: snap.created_at,
        }),
    ))
}

/// Latest canvas state. A room with no history yields the sentinel
/// empty state, not an error.
pub async fn load_state(
    State(state): State<AppState>,
    Extension(_identity): Extension<Identity>,
    Path(room_id): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let lookup_room = room_id.clone();
    let snap = tokio::task::spawn_blocking(move || db.db.latest_snapshot(&lookup_room))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let body = match snap {
        Some(snap) => CanvasState {
            state_json: snap.state_json,
            room_id: snap.room_id,
            last_updated: Some(snap.created_at),
        },
        None => CanvasState::empty(&room_id),
    };
    Ok(Json(body))
}

/// Owner-only clear: appends a fresh version holding the empty state.
pub async fn clear_canvas(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(room_id): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    let room = state
        .db
        .get_active_room(&room_id)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;
    if room.owner_id != identity.user_id {
        return Err(StatusCode::FORBIDDEN);
    }

    let db = state.clone();
    let clear_room = room_id.clone();
    let snap = tokio::task::spawn_blocking(move || db.db.append_snapshot(&clear_room, EMPTY_STATE))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    info!("{} cleared canvas for {}", identity.email, room_id);

    Ok(Json(SnapshotCreated {
        snapshot_id: snap.id,
        room_id: snap.room_id,
        created_at: snap.created_at,
    }))
}

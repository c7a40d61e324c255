use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use easel_db::models::{ROLE_MEMBER, ROLE_OWNER};
use easel_types::api::{
    CreateRoomRequest, CreateRoomResponse, JoinRoomRequest, RemoveMemberRequest, RoomDetails,
    RoomMemberInfo, RoomSummary,
};
use easel_types::models::Identity;

use crate::AppState;

pub async fn create_room(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<CreateRoomRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let room_id = format!("room-{}", &Uuid::new_v4().to_string()[..8]);

    state
        .db
        .create_room(
            &room_id,
            &req.name,
            req.description.as_deref(),
            identity.user_id,
            req.max_users,
        )
        .map_err(|e| {
            error!("room insert failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    state
        .db
        .add_room_member(identity.user_id, &room_id, ROLE_OWNER)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    info!("{} created room {}", identity.email, room_id);

    Ok((
        StatusCode::CREATED,
        Json(CreateRoomResponse {
            room_id,
            name: req.name,
            description: req.description,
            owner_id: identity.user_id,
        }),
    ))
}

pub async fn join_room(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<JoinRoomRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let room = state
        .db
        .get_active_room(&req.room_id)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    if state
        .db
        .get_active_membership(identity.user_id, &req.room_id)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .is_some()
    {
        return Ok(Json(json!({ "message": "Already a member", "room_id": room.id })));
    }

    let members = state
        .db
        .count_active_members(&req.room_id)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    if members >= room.max_users {
        return Err(StatusCode::FORBIDDEN);
    }

    state
        .db
        .add_room_member(identity.user_id, &req.room_id, ROLE_MEMBER)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(json!({ "message": "Joined room", "room_id": room.id })))
}

pub async fn leave_room(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(room_id): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    let left = state
        .db
        .deactivate_membership(identity.user_id, &room_id)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    if !left {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(json!({ "message": "Left room", "room_id": room_id })))
}

pub async fn delete_room(
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

    state
        .db
        .deactivate_room(&room_id)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    info!("{} deleted room {}", identity.email, room_id);
    Ok(Json(json!({ "message": "Room deleted successfully." })))
}

pub async fn remove_member(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<RemoveMemberRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let room = state
        .db
        .get_active_room(&req.room_id)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;
    if room.owner_id != identity.user_id {
        return Err(StatusCode::FORBIDDEN);
    }
    // the owner cannot remove themselves
    if identity.user_id == req.user_id {
        return Err(StatusCode::FORBIDDEN);
    }

    let removed = state
        .db
        .deactivate_membership(req.user_id, &req.room_id)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    if !removed {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(json!({ "message": "Member removed successfully." })))
}

pub async fn my_rooms(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, StatusCode> {
    let rooms = state
        .db
        .rooms_for_user(identity.user_id)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let listing: Vec<RoomSummary> = rooms
        .into_iter()
        .map(|(room, role)| RoomSummary {
            room_id: room.id,
            name: room.name,
            role,
            owner_id: room.owner_id,
        })
        .collect();
    Ok(Json(listing))
}

pub async fn room_details(
    State(state): State<AppState>,
    Extension(_identity): Extension<Identity>,
    Path(room_id): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    let room = state
        .db
        .get_room(&room_id)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    let members = state
        .db
        .room_members(&room_id)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .into_iter()
        .map(|m| RoomMemberInfo {
            user_id: m.user_id,
            role: m.role,
        })
        .collect();

    Ok(Json(RoomDetails {
        room_id: room.id,
        name: room.name,
        owner_id: room.owner_id,
        description: room.description,
        max_users: room.max_users,
        members,
        is_active: room.is_active,
        created_at: room.created_at,
    }))
}

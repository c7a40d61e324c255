use serde::{Deserialize, Serialize};

// -- JWT Claims --

/// JWT claims shared by easel-api (REST middleware, token issuance) and
/// easel-gateway (WebSocket handshake). Canonical definition lives here
/// to eliminate duplication.
///
/// `sub` carries the email and `user_id` the numeric account id; both
/// must be present for a token to be accepted. `fullName` is the wire
/// spelling the web client expects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Option<String>,
    pub user_id: Option<i64>,
    #[serde(rename = "fullName", skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<usize>,
}

// -- Auth --

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
}

// -- Rooms --

#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_max_users")]
    pub max_users: i64,
}

fn default_max_users() -> i64 {
    10
}

#[derive(Debug, Serialize)]
pub struct CreateRoomResponse {
    pub room_id: String,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct JoinRoomRequest {
    pub room_id: String,
}

#[derive(Debug, Deserialize)]
pub struct RemoveMemberRequest {
    pub room_id: String,
    pub user_id: i64,
}

#[derive(Debug, Serialize)]
pub struct RoomSummary {
    pub room_id: String,
    pub name: String,
    pub role: String,
    pub owner_id: i64,
}

#[derive(Debug, Serialize)]
pub struct RoomMemberInfo {
    pub user_id: i64,
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct RoomDetails {
    pub room_id: String,
    pub name: String,
    pub owner_id: i64,
    pub description: Option<String>,
    pub max_users: i64,
    pub members: Vec<RoomMemberInfo>,
    pub is_active: bool,
    pub created_at: String,
}

// -- Canvas snapshots --

#[derive(Debug, Deserialize)]
pub struct SnapshotRequest {
    pub room_id: String,
    pub state_json: String,
}

#[derive(Debug, Serialize)]
pub struct SnapshotCreated {
    pub snapshot_id: i64,
    pub room_id: String,
    pub created_at: String,
}

/// Metadata-only listing entry — the state blob is deliberately omitted.
#[derive(Debug, Serialize)]
pub struct SnapshotMeta {
    pub snapshot_id: i64,
    pub room_id: String,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct SnapshotResponse {
    pub snapshot_id: i64,
    pub room_id: String,
    pub state_json: String,
    pub created_at: String,
}

/// Latest canvas state for a room. A room with no saved history gets
/// the sentinel empty state `"[]"` with no timestamp — a defined empty
/// canvas, not an error.
#[derive(Debug, Serialize)]
pub struct CanvasState {
    pub state_json: String,
    pub room_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

impl CanvasState {
    pub fn empty(room_id: &str) -> Self {
        Self {
            state_json: "[]".to_string(),
            room_id: room_id.to_string(),
            last_updated: None,
        }
    }
}

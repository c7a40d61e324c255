/// Database row types — these map directly to SQLite rows.
/// Distinct from easel-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: i64,
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    pub is_active: bool,
    pub created_at: String,
}

pub struct RoomRow {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: i64,
    pub is_active: bool,
    pub max_users: i64,
    pub created_at: String,
}

pub struct RoomMemberRow {
    pub id: i64,
    pub user_id: i64,
    pub room_id: String,
    pub role: String,
    pub is_active: bool,
    pub joined_at: String,
}

/// One persisted canvas state. Append-only except for the "latest"
/// slot, which the autosave path overwrites in place.
pub struct SnapshotRow {
    pub id: i64,
    pub room_id: String,
    pub state_json: String,
    pub created_at: String,
}

pub const ROLE_OWNER: &str = "owner";
pub const ROLE_MEMBER: &str = "member";

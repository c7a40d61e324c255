use serde::{Deserialize, Serialize};

/// Events the server pushes over a room's WebSocket session.
///
/// Relayed drawing payloads are not modeled here: they are dynamic
/// client JSON that the gateway forwards after stamping the sender,
/// without ever owning their schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Full membership snapshot for a room, sent after every join and leave.
    RoomMembersUpdate { members: Vec<MemberInfo> },
}

/// One entry in a membership announcement — one per connection, so a
/// user with two tabs open appears twice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberInfo {
    pub email: String,
    pub full_name: Option<String>,
}

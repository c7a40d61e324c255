use serde::{Deserialize, Serialize};

/// Verified user attributes attached to a connection for its lifetime.
/// Constructed only by the gateway's token verification — never built
/// from partial claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: i64,
    pub email: String,
    pub full_name: Option<String>,
}

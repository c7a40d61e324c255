use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use tracing::debug;
use uuid::Uuid;

use easel_types::events::{MemberInfo, SessionEvent};
use easel_types::models::Identity;

pub type ConnId = Uuid;

/// One live connection within a room: its outbound text-frame channel
/// plus the identity verified at handshake. One entry per connection,
/// so the same user with two tabs open holds two entries.
struct RoomMember {
    conn_id: ConnId,
    identity: Identity,
    tx: mpsc::UnboundedSender<String>,
}

/// Process-wide registry of active room connections.
///
/// Constructed once at server start and handed to every connection
/// handler as a cheap clone. A room key exists in the map if and only
/// if the room currently has at least one connection; the last
/// disconnect removes the entry rather than leaving an empty vec.
#[derive(Clone)]
pub struct RoomRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    rooms: RwLock<HashMap<String, Vec<RoomMember>>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                rooms: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Register a connection under a room and announce the updated
    /// membership to everyone in it, the new connection included.
    pub async fn connect(
        &self,
        room_id: &str,
        identity: Identity,
        tx: mpsc::UnboundedSender<String>,
    ) -> ConnId {
        let conn_id = Uuid::new_v4();
        {
            let mut rooms = self.inner.rooms.write().await;
            rooms.entry(room_id.to_string()).or_default().push(RoomMember {
                conn_id,
                identity,
                tx,
            });
        }
        self.announce_members(room_id).await;
        conn_id
    }

    /// Remove a connection and re-announce membership to whoever is
    /// left. Removing a connection that is not registered is a no-op:
    /// disconnect can race with handshake rejection paths.
    pub async fn disconnect(&self, room_id: &str, conn_id: ConnId) {
        {
            let mut rooms = self.inner.rooms.write().await;
            if let Some(members) = rooms.get_mut(room_id) {
                members.retain(|m| m.conn_id != conn_id);
                if members.is_empty() {
                    rooms.remove(room_id);
                }
            }
        }
        self.announce_members(room_id).await;
    }

    /// Identities currently registered for a room, one per connection.
    /// Empty for unknown rooms.
    pub async fn membership(&self, room_id: &str) -> Vec<Identity> {
        let rooms = self.inner.rooms.read().await;
        rooms
            .get(room_id)
            .map(|members| members.iter().map(|m| m.identity.clone()).collect())
            .unwrap_or_default()
    }

    /// Fan a payload out to every connection in a room, except the one
    /// in `exclude`. Each delivery is independent: a closed recipient
    /// channel is expected during its teardown and is never allowed to
    /// fail the others, nor does it mutate the registry here — the
    /// recipient's own disconnect path owns that cleanup.
    pub async fn broadcast(&self, room_id: &str, payload: &str, exclude: Option<ConnId>) {
        let rooms = self.inner.rooms.read().await;
        let Some(members) = rooms.get(room_id) else {
            return;
        };
        for member in members {
            if Some(member.conn_id) == exclude {
                continue;
            }
            if member.tx.send(payload.to_string()).is_err() {
                debug!(
                    "room {}: recipient channel closed, leaving cleanup to its disconnect path",
                    room_id
                );
            }
        }
    }

    /// Broadcast the room_members_update frame for a room. Nothing is
    /// sent when the room no longer exists.
    pub async fn announce_members(&self, room_id: &str) {
        let members: Vec<MemberInfo> = self
            .membership(room_id)
            .await
            .into_iter()
            .map(|identity| MemberInfo {
                email: identity.email,
                full_name: identity.full_name,
            })
            .collect();
        if members.is_empty() {
            return;
        }

        let event = SessionEvent::RoomMembersUpdate { members };
        match serde_json::to_string(&event) {
            Ok(payload) => self.broadcast(room_id, &payload, None).await,
            Err(e) => debug!("room {}: failed to encode members update: {}", room_id, e),
        }
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{info, warn};

use easel_types::models::Identity;

use crate::auth;
use crate::registry::RoomRegistry;

/// Close code sent when the handshake token is rejected.
pub const CLOSE_AUTH_FAILURE: u16 = 4001;

/// Drive one room session from handshake to teardown.
///
/// The token is verified before any registry state is touched; a
/// rejected connection is closed with code 4001 and never joins.
/// After admission the socket splits into a writer task draining the
/// registry channel and a reader task relaying inbound frames. Cleanup
/// runs exactly once at the join point below, whichever half exits
/// first and for whatever reason.
pub async fn handle_session(
    mut socket: WebSocket,
    registry: RoomRegistry,
    room_id: String,
    token: String,
    jwt_secret: String,
) {
    let identity = match auth::verify(&token, &jwt_secret) {
        Ok(identity) => identity,
        Err(e) => {
            warn!("handshake for room {} rejected: {}", room_id, e);
            let _ = socket
                .send(Message::Close(Some(CloseFrame {
                    code: CLOSE_AUTH_FAILURE,
                    reason: "Authentication failed".into(),
                })))
                .await;
            return;
        }
    };

    info!("{} joined room {}", identity.email, room_id);

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let conn_id = registry.connect(&room_id, identity.clone(), tx).await;

    // Writer half: everything the registry fans out to this connection.
    // A write failure only ever terminates this connection.
    let writer_email = identity.email.clone();
    let mut send_task = tokio::spawn(async move {
        while let Some(payload) = rx.recv().await {
            if let Err(e) = sender.send(Message::Text(payload.into())).await {
                warn!("write to {} failed: {}", writer_email, e);
                break;
            }
        }
    });

    // Reader half: stamp inbound frames with the sender identity and
    // relay them to the rest of the room.
    let reader_registry = registry.clone();
    let reader_room = room_id.clone();
    let reader_identity = identity.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    let outbound = stamp_sender(text.as_str(), &reader_identity);
                    reader_registry
                        .broadcast(&reader_room, &outbound, Some(conn_id))
                        .await;
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    registry.disconnect(&room_id, conn_id).await;
    info!("{} left room {}", identity.email, room_id);
}

/// Inject `sender` and `sender_name` into a relayed payload,
/// overwriting any fields the client put there itself. Frames that are
/// not JSON objects pass through untouched: the relay degrades
/// gracefully instead of dropping malformed client payloads.
pub fn stamp_sender(raw: &str, identity: &Identity) -> String {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(mut payload)) => {
            payload.insert("sender".to_string(), Value::String(identity.email.clone()));
            payload.insert(
                "sender_name".to_string(),
                identity
                    .full_name
                    .clone()
                    .map(Value::String)
                    .unwrap_or(Value::Null),
            );
            Value::Object(payload).to_string()
        }
        _ => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::sync::mpsc;

    fn alice() -> Identity {
        Identity {
            user_id: 1,
            email: "alice@x.com".to_string(),
            full_name: Some("Alice".to_string()),
        }
    }

    #[test]
    fn stamps_sender_onto_object_payloads() {
        let out = stamp_sender(r#"{"type":"draw","x":1,"y":2}"#, &alice());
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(
            parsed,
            json!({
                "type": "draw",
                "x": 1,
                "y": 2,
                "sender": "alice@x.com",
                "sender_name": "Alice"
            })
        );
    }

    #[test]
    fn overwrites_client_supplied_sender_fields() {
        let out = stamp_sender(r#"{"sender":"spoof@x.com","sender_name":"Spoof"}"#, &alice());
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["sender"], "alice@x.com");
        assert_eq!(parsed["sender_name"], "Alice");
    }

    #[test]
    fn missing_name_stamps_null() {
        let identity = Identity {
            user_id: 2,
            email: "bob@x.com".to_string(),
            full_name: None,
        };
        let out = stamp_sender(r#"{"type":"draw"}"#, &identity);
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["sender_name"], Value::Null);
    }

    #[test]
    fn non_json_passes_through_verbatim() {
        assert_eq!(stamp_sender("not json at all", &alice()), "not json at all");
    }

    #[test]
    fn non_object_json_passes_through_verbatim() {
        assert_eq!(stamp_sender("[1,2,3]", &alice()), "[1,2,3]");
        assert_eq!(stamp_sender("42", &alice()), "42");
    }

    /// The relay scenario end to end: A draws, B sees the stamped
    /// event, A hears nothing back.
    #[tokio::test]
    async fn relay_reaches_the_room_but_not_the_sender() {
        let registry = RoomRegistry::new();

        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let a = registry.connect("room-abcd1234", alice(), tx_a).await;
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        let bob = Identity {
            user_id: 2,
            email: "bob@x.com".to_string(),
            full_name: Some("Bob".to_string()),
        };
        registry.connect("room-abcd1234", bob, tx_b).await;

        // skip the join announcements
        while rx_a.try_recv().is_ok() {}
        while rx_b.try_recv().is_ok() {}

        let outbound = stamp_sender(r#"{"type":"draw","x":1,"y":2}"#, &alice());
        registry
            .broadcast("room-abcd1234", &outbound, Some(a))
            .await;

        let got: Value = serde_json::from_str(&rx_b.try_recv().unwrap()).unwrap();
        assert_eq!(
            got,
            json!({
                "type": "draw",
                "x": 1,
                "y": 2,
                "sender": "alice@x.com",
                "sender_name": "Alice"
            })
        );
        assert!(rx_a.try_recv().is_err());
    }
}

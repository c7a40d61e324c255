//! Session loop tests over real sockets: an axum router serving the
//! room endpoint, tokio-tungstenite on the client side.

use std::collections::HashMap;
use std::time::Duration;

use axum::{
    Router,
    extract::{Path, Query, State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;

use easel_gateway::connection::{CLOSE_AUTH_FAILURE, handle_session};
use easel_gateway::registry::RoomRegistry;
use easel_types::api::Claims;

const SECRET: &str = "session-test-secret";

#[derive(Clone)]
struct GatewayState {
    registry: RoomRegistry,
    jwt_secret: String,
}

async fn ws_upgrade(
    State(state): State<GatewayState>,
    Path(room_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let token = params.get("token").cloned().unwrap_or_default();
    ws.on_upgrade(move |socket| {
        handle_session(socket, state.registry, room_id, token, state.jwt_secret)
    })
}

/// Serve the room endpoint on an ephemeral port, returning the ws base URL.
async fn serve_gateway(registry: RoomRegistry) -> String {
    let app = Router::new()
        .route("/ws/{room_id}", get(ws_upgrade))
        .with_state(GatewayState {
            registry,
            jwt_secret: SECRET.to_string(),
        });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("ws://{}", addr)
}

fn token_for(user_id: i64, email: &str, full_name: Option<&str>) -> String {
    let claims = Claims {
        sub: Some(email.to_string()),
        user_id: Some(user_id),
        full_name: full_name.map(str::to_string),
        exp: Some((chrono::Utc::now() + chrono::Duration::hours(1)).timestamp() as usize),
    };
    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

type WsClient =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

async fn join_room(base: &str, room: &str, token: &str) -> WsClient {
    let (ws, _) = tokio_tungstenite::connect_async(format!("{}/ws/{}?token={}", base, room, token))
        .await
        .unwrap();
    ws
}

/// Next text frame as JSON, skipping any control frames.
async fn next_text(ws: &mut WsClient) -> Value {
    loop {
        let msg = timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("connection ended unexpectedly")
            .expect("transport error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

fn member_emails(update: &Value) -> Vec<&str> {
    assert_eq!(update["type"], "room_members_update");
    update["members"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["email"].as_str().unwrap())
        .collect()
}

#[tokio::test]
async fn rejected_handshake_closes_with_4001_and_joins_nothing() {
    let registry = RoomRegistry::new();
    let base = serve_gateway(registry.clone()).await;

    let mut ws = join_room(&base, "room-1", "garbage").await;

    let msg = timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("timed out waiting for the close frame")
        .expect("connection ended without a close frame")
        .expect("transport error");
    match msg {
        Message::Close(Some(frame)) => {
            assert_eq!(u16::from(frame.code), CLOSE_AUTH_FAILURE);
            assert_eq!(frame.reason.as_str(), "Authentication failed");
        }
        other => panic!("expected a close frame, got {:?}", other),
    }

    assert!(registry.membership("room-1").await.is_empty());
}

#[tokio::test]
async fn live_relay_stamps_the_sender_and_never_echoes_back() {
    let registry = RoomRegistry::new();
    let base = serve_gateway(registry.clone()).await;
    let room = "room-abcd1234";

    let mut alice = join_room(&base, room, &token_for(1, "alice@x.com", Some("Alice"))).await;
    let update = next_text(&mut alice).await;
    assert_eq!(member_emails(&update), vec!["alice@x.com"]);

    let mut bob = join_room(&base, room, &token_for(2, "bob@x.com", Some("Bob"))).await;
    let update = next_text(&mut bob).await;
    assert_eq!(member_emails(&update), vec!["alice@x.com", "bob@x.com"]);
    let update = next_text(&mut alice).await;
    assert_eq!(member_emails(&update), vec!["alice@x.com", "bob@x.com"]);
    assert_eq!(registry.membership(room).await.len(), 2);

    alice
        .send(Message::text(r#"{"type":"draw","x":1,"y":2}"#.to_string()))
        .await
        .unwrap();

    let drawn = next_text(&mut bob).await;
    assert_eq!(
        drawn,
        json!({
            "type": "draw",
            "x": 1,
            "y": 2,
            "sender": "alice@x.com",
            "sender_name": "Alice"
        })
    );

    // Frames to one client arrive in the order they were fanned out,
    // so the next frame alice sees after bob's reply proves her own
    // draw was never queued back to her.
    bob.send(Message::text(r#"{"type":"draw","x":9,"y":9}"#.to_string()))
        .await
        .unwrap();
    let reply = next_text(&mut alice).await;
    assert_eq!(reply["sender"], "bob@x.com");
    assert_eq!(reply["x"], 9);

    bob.close(None).await.unwrap();
    let update = next_text(&mut alice).await;
    assert_eq!(member_emails(&update), vec!["alice@x.com"]);
    assert_eq!(registry.membership(room).await.len(), 1);
}

#[tokio::test]
async fn malformed_frames_are_forwarded_verbatim() {
    let registry = RoomRegistry::new();
    let base = serve_gateway(registry.clone()).await;
    let room = "room-raw";

    let mut alice = join_room(&base, room, &token_for(1, "alice@x.com", None)).await;
    next_text(&mut alice).await;
    let mut bob = join_room(&base, room, &token_for(2, "bob@x.com", None)).await;
    next_text(&mut bob).await;
    next_text(&mut alice).await;

    alice
        .send(Message::text("not json at all".to_string()))
        .await
        .unwrap();

    let msg = timeout(Duration::from_secs(5), bob.next())
        .await
        .expect("timed out waiting for the relayed frame")
        .expect("connection ended unexpectedly")
        .expect("transport error");
    match msg {
        Message::Text(text) => assert_eq!(text.as_str(), "not json at all"),
        other => panic!("expected a text frame, got {:?}", other),
    }
}

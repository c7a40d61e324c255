use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, Query, State, WebSocketUpgrade},
    middleware,
    response::IntoResponse,
    routing::{delete, get, post},
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use easel_api::{AppState, AppStateInner, auth, canvas, middleware::require_auth, rooms};
use easel_gateway::connection;
use easel_gateway::registry::RoomRegistry;

#[derive(Clone)]
struct ServerState {
    registry: RoomRegistry,
    jwt_secret: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "easel=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("EASEL_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("EASEL_DB_PATH").unwrap_or_else(|_| "easel.db".into());
    let host = std::env::var("EASEL_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("EASEL_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Init database
    let db = easel_db::Database::open(&PathBuf::from(&db_path))?;

    // Shared state
    let registry = RoomRegistry::new();
    let app_state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret: jwt_secret.clone(),
    });

    let server_state = ServerState {
        registry,
        jwt_secret,
    };

    // Routes
    let public_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .with_state(app_state.clone());

    let protected_routes = Router::new()
        .route("/me", get(auth::me))
        .route("/rooms/create", post(rooms::create_room))
        .route("/rooms/join", post(rooms::join_room))
        .route("/rooms/leave/{room_id}", post(rooms::leave_room))
        .route("/rooms/remove_member", post(rooms::remove_member))
        .route("/rooms/my", get(rooms::my_rooms))
        .route("/rooms/{room_id}", get(rooms::room_details))
        .route("/rooms/{room_id}", delete(rooms::delete_room))
        .route("/canvas/snapshot", post(canvas::save_snapshot))
        .route("/canvas/snapshots/{room_id}", get(canvas::list_snapshots))
        .route("/canvas/snapshot/{snapshot_id}", get(canvas::get_snapshot))
        .route("/canvas/save", post(canvas::save_state))
        .route("/canvas/load/{room_id}", get(canvas::load_state))
        .route("/canvas/clear/{room_id}", post(canvas::clear_canvas))
        .layer(middleware::from_fn_with_state(app_state.clone(), require_auth))
        .with_state(app_state);

    let ws_route = Router::new()
        .route("/ws/{room_id}", get(ws_upgrade))
        .with_state(server_state);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(ws_route)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Easel server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Deserialize)]
struct WsParams {
    token: String,
}

async fn ws_upgrade(
    State(state): State<ServerState>,
    Path(room_id): Path<String>,
    Query(params): Query<WsParams>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        connection::handle_session(socket, state.registry, room_id, params.token, state.jwt_secret)
    })
}

pub mod auth;
pub mod canvas;
pub mod middleware;
pub mod rooms;

use std::sync::Arc;

use easel_db::Database;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
}

use axum::{Router, routing::post};
use std::sync::Arc;

use crate::server::AppState;

mod chat;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/chat", post(chat::chat))
}

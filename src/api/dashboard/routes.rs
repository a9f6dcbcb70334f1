/*
 * Responsibility
 * - /dashboard の URL 構造を定義
 * - Per-route checks live in the gateway pipeline, not in route layers
 */
use axum::{Router, routing::get};

use crate::api::dashboard::handlers::{
    keys::{create_key, list_keys},
    metrics::metrics,
    session::session_status,
};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/session", get(session_status))
        .route("/keys", get(list_keys).post(create_key))
        .route("/metrics", get(metrics))
}

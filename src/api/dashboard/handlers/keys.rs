use axum::{
    extract::{Request, State},
    response::Response,
};

use crate::services::gateway::{CREATE_KEY, LIST_KEYS};
use crate::state::AppState;

/// GET /dashboard/keys → GET /v1/dashboard/keys (query preserved)
pub async fn list_keys(State(state): State<AppState>, request: Request) -> Response {
    state.gateway.handle(&LIST_KEYS, request).await
}

/// POST /dashboard/keys → POST /v1/dashboard/keys
pub async fn create_key(State(state): State<AppState>, request: Request) -> Response {
    state.gateway.handle(&CREATE_KEY, request).await
}

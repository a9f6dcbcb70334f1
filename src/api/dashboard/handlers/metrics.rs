use axum::{
    extract::{Request, State},
    response::Response,
};

use crate::services::gateway::METRICS;
use crate::state::AppState;

/// GET /dashboard/metrics → GET /v1/metrics (text/plain)
pub async fn metrics(State(state): State<AppState>, request: Request) -> Response {
    state.gateway.handle(&METRICS, request).await
}

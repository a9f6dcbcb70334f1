use axum::{
    Json,
    extract::State,
    http::{HeaderMap, HeaderValue, header},
    response::{IntoResponse, Response},
};

use crate::api::dashboard::dto::session::SessionStatusResponse;
use crate::error::GatewayError;
use crate::services::auth::SessionResult;
use crate::state::AppState;

/// GET /dashboard/auth/session
///
/// Reports whether the browser holds a valid session. Not audited.
pub async fn session_status(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, GatewayError> {
    let result = state.gateway.sessions().validate(&headers).map_err(|err| {
        tracing::error!(error = %err, "cannot report session status");
        GatewayError::from(err)
    })?;

    let body = match result {
        SessionResult::Authenticated(session) => SessionStatusResponse::from(session),
        SessionResult::Unauthenticated => SessionStatusResponse::anonymous(),
    };

    Ok((
        [(header::CACHE_CONTROL, HeaderValue::from_static("no-store"))],
        Json(body),
    )
        .into_response())
}

/*
 * Responsibility
 * - GatewayError: every way a dashboard call can end other than a relayed upstream response
 * - IntoResponse: fixed status + short `{"detail", "code"}` JSON body, never internal detail
 * - Auth-related rejections carry `cache-control: no-store`
 */
use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::services::auth::SessionConfigError;
use crate::services::proxy::UpstreamError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
    pub code: &'static str,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Configuration(#[from] SessionConfigError),
    #[error("authentication required")]
    Unauthorized,
    #[error("cross-site request rejected")]
    ForbiddenCsrf,
    #[error("insufficient scope")]
    ForbiddenScope,
    #[error("request body must be valid JSON")]
    InvalidJson,
    #[error("request body too large")]
    BodyTooLarge,
    #[error("request body could not be read")]
    BodyUnreadable,
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error("internal server error")]
    Internal,
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Configuration(_) | GatewayError::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            GatewayError::Unauthorized => StatusCode::UNAUTHORIZED,
            GatewayError::ForbiddenCsrf | GatewayError::ForbiddenScope => StatusCode::FORBIDDEN,
            GatewayError::InvalidJson
            | GatewayError::BodyTooLarge
            | GatewayError::BodyUnreadable => StatusCode::BAD_REQUEST,
            GatewayError::Upstream(e) => e.status(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::Configuration(_) => "CONFIGURATION_ERROR",
            GatewayError::Unauthorized => "UNAUTHORIZED",
            GatewayError::ForbiddenCsrf => "FORBIDDEN_CSRF",
            GatewayError::ForbiddenScope => "FORBIDDEN_SCOPE",
            GatewayError::InvalidJson
            | GatewayError::BodyTooLarge
            | GatewayError::BodyUnreadable => "BAD_REQUEST",
            GatewayError::Upstream(_) => "UPSTREAM_ERROR",
            GatewayError::Internal => "INTERNAL",
        }
    }

    // Responses that describe auth state must never be cached.
    fn is_auth_related(&self) -> bool {
        matches!(
            self,
            GatewayError::Configuration(_)
                | GatewayError::Unauthorized
                | GatewayError::ForbiddenCsrf
                | GatewayError::ForbiddenScope
        )
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        // Upstream answered with an error: relay it untouched.
        let err = match self {
            GatewayError::Upstream(UpstreamError::Status(relayed)) => {
                return (*relayed).into_response();
            }
            other => other,
        };

        let status = err.status();
        let no_store = err.is_auth_related();
        let body = ErrorResponse {
            detail: err.to_string(),
            code: err.code(),
        };

        let mut response = (status, Json(body)).into_response();
        if no_store {
            response
                .headers_mut()
                .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
        }
        response
    }
}

//! HTTP-level middleware (cross-cutting concerns).
//!
//! Responsibility:
//! - Request-Id generation + propagation (X-Request-Id)
//! - Access logging / request tracing (TraceLayer)
//! - Global timeouts
//!
//! The request id is set before the handlers run, so the gateway pipeline can
//! forward it upstream and stamp it on audit entries.
//!
//! Body size is bounded by the gateway's body stage, after the origin check,
//! not here.

use axum::Router;
use axum::error_handling::HandleErrorLayer;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tower::timeout::TimeoutLayer;
use tower::{BoxError, ServiceBuilder};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::error::ErrorResponse;
use crate::services::proxy::descriptor::X_REQUEST_ID;

/// Apply HTTP-level middleware to the given Router.
///
/// The timeout comes from `Config` (`REQUEST_TIMEOUT_SECS`).
pub fn apply(router: Router, config: &Config) -> Router {
    let layers = ServiceBuilder::new()
        // Make the service error `Infallible` by converting errors into responses.
        .layer(HandleErrorLayer::new(|err: BoxError| async move {
            if err.is::<tower::timeout::error::Elapsed>() {
                tracing::warn!("request timed out");
                (
                    StatusCode::GATEWAY_TIMEOUT,
                    axum::Json(ErrorResponse {
                        detail: "request timed out".to_string(),
                        code: "TIMEOUT",
                    }),
                )
                    .into_response()
            } else {
                tracing::error!(error = %err, "unhandled middleware error");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }))
        // Generate a request id if missing, then propagate it to the response.
        .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
        .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
        .layer(TimeoutLayer::new(config.request_timeout))
        // Access log / tracing for all requests.
        .layer(TraceLayer::new_for_http());

    router.layer(layers)
}

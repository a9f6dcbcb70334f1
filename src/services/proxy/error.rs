use axum::http::StatusCode;
use thiserror::Error;

use crate::services::proxy::descriptor::DescriptorError;
use crate::services::proxy::forwarder::UpstreamResponse;

/// Forwarding failures.
///
/// Display strings are what the caller sees in `detail`; keep them short and fixed.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Connection refused/reset, DNS failure, protocol error.
    #[error("upstream unavailable")]
    Unavailable,

    #[error("upstream timed out")]
    Timeout,

    /// The upstream answered with a non-2xx status; the response is relayed as-is.
    #[error("upstream returned {}", .0.status)]
    Status(Box<UpstreamResponse>),

    /// The outbound request could not be built.
    #[error("internal server error")]
    InvalidRequest(#[from] DescriptorError),
}

impl UpstreamError {
    pub fn status(&self) -> StatusCode {
        match self {
            UpstreamError::Unavailable => StatusCode::BAD_GATEWAY,
            UpstreamError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            UpstreamError::Status(response) => response.status,
            UpstreamError::InvalidRequest(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Upstream status code, when the upstream actually answered.
    pub fn upstream_status(&self) -> Option<StatusCode> {
        match self {
            UpstreamError::Status(response) => Some(response.status),
            _ => None,
        }
    }

    /// Short tag used in audit entries and logs.
    pub fn reason(&self) -> &'static str {
        match self {
            UpstreamError::Unavailable => "unavailable",
            UpstreamError::Timeout => "timeout",
            UpstreamError::Status(_) => "status",
            UpstreamError::InvalidRequest(_) => "invalid_request",
        }
    }
}

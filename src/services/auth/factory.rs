/// Factory: build the session validator from application `Config`.
use std::sync::Arc;

use axum::http::HeaderMap;

use crate::config::Config;
use crate::services::auth::{JwtSessionValidator, SessionValidator};

pub fn build_session_validator(config: &Config) -> Arc<dyn SessionValidator> {
    let validator = JwtSessionValidator::from_settings(&config.session);

    if let Err(err) = validator.validate(&HeaderMap::new()) {
        // Keep serving: session-dependent routes will answer 500 until this is fixed.
        tracing::error!(error = %err, "session validation is misconfigured");
    }

    Arc::new(validator)
}

/*
 * Responsibility
 * - The session contract seen by the gateway: who is calling, with which scopes, until when
 * - `SessionValidator` seam: validate inbound headers without side effects
 *
 * Notes
 * - A session is either fully valid or absent. Malformed/expired credentials are
 *   `Unauthenticated`, never an error.
 * - `SessionConfigError` means the gateway itself is misconfigured (500, not 401).
 */
use std::collections::BTreeSet;

use axum::http::HeaderMap;
use chrono::{DateTime, Utc};

/// A validated browser session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub subject: String,
    pub scopes: BTreeSet<String>,
    pub expires_at: DateTime<Utc>,
    /// Short digest of the credential, for correlating audit entries without storing it.
    pub fingerprint: String,
}

impl Session {
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.contains(scope)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionResult {
    Authenticated(Session),
    Unauthenticated,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionConfigError {
    #[error("session signing key is not configured")]
    MissingKey,
    #[error("session verification key is invalid")]
    InvalidKey,
}

pub trait SessionValidator: Send + Sync {
    fn validate(&self, headers: &HeaderMap) -> Result<SessionResult, SessionConfigError>;
}

/*
 * Responsibility
 * - GET /dashboard/auth/session の response DTO
 * - Never carries the credential or its fingerprint
 */
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::services::auth::Session;

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct SessionStatusResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scopes: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl SessionStatusResponse {
    pub fn anonymous() -> Self {
        Self {
            authenticated: false,
            subject: None,
            scopes: None,
            expires_at: None,
        }
    }
}

impl From<Session> for SessionStatusResponse {
    fn from(session: Session) -> Self {
        Self {
            authenticated: true,
            subject: Some(session.subject),
            // BTreeSet keeps this sorted
            scopes: Some(session.scopes.into_iter().collect()),
            expires_at: Some(session.expires_at),
        }
    }
}

//! Audit records for privileged dashboard actions.
//!
//! One entry is written per call that reached the upstream-forwarding stage,
//! whatever the outcome. Entries are immutable once built and serialise to a
//! single JSON line.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// Upstream unreachable, timed out, or answered non-2xx.
    Upstream,
    /// The gateway could not build the outbound request.
    Internal,
    /// The call was abandoned (client gone, global timeout) while the upstream was in flight.
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum AuditOutcome {
    Success,
    Failure {
        class: FailureClass,
        /// `status`, `timeout`, `unavailable`, `invalid_request`, `cancelled`
        reason: String,
    },
}

impl AuditOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AuditOutcome::Success)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuditEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// Action tag (`list_keys`, `create_key`, `metrics`).
    pub action: String,
    pub subject: String,
    /// Digest of the session credential, never the credential itself.
    pub session: String,
    pub request_id: Option<String>,
    pub method: String,
    /// Upstream path, without the query string.
    pub path: String,
    pub upstream_status: Option<u16>,
    pub outcome: AuditOutcome,
}

impl AuditEntry {
    pub fn new(action: &str, subject: &str, session: &str, outcome: AuditOutcome) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            action: action.to_string(),
            subject: subject.to_string(),
            session: session.to_string(),
            request_id: None,
            method: String::new(),
            path: String::new(),
            upstream_status: None,
            outcome,
        }
    }

    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_outcome_serialises_with_class() {
        let mut entry = AuditEntry::new(
            "metrics",
            "user-1",
            "abcd",
            AuditOutcome::Failure {
                class: FailureClass::Upstream,
                reason: "unavailable".to_string(),
            },
        );
        entry.method = "GET".to_string();
        entry.path = "/v1/metrics".to_string();

        let line = entry.to_json_line().unwrap();
        assert!(!line.contains('\n'));

        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["action"], "metrics");
        assert_eq!(value["outcome"]["result"], "failure");
        assert_eq!(value["outcome"]["class"], "upstream");
        assert_eq!(value["outcome"]["reason"], "unavailable");
        assert!(value["upstream_status"].is_null());
    }

    #[test]
    fn entries_read_back_identically() {
        let mut entry = AuditEntry::new("list_keys", "user-1", "abcd", AuditOutcome::Success);
        entry.upstream_status = Some(200);

        let back: AuditEntry = serde_json::from_str(&entry.to_json_line().unwrap()).unwrap();
        assert_eq!(back, entry);
        assert!(back.outcome.is_success());
    }
}

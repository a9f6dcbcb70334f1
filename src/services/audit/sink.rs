//! Audit sink interface used by the recorder.
use async_trait::async_trait;
use thiserror::Error;

use crate::services::audit::entry::AuditEntry;

/// Sink-layer errors. These never reach the caller of a dashboard route.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("audit backend connection error: {0}")]
    BackendConnection(String),
    #[error("audit backend command error: {0}")]
    BackendCommand(String),
}

/// Append-only destination for audit entries.
///
/// Implementations must write each entry as one unit: concurrent appends may
/// interleave entries, never the bytes of a single entry.
#[async_trait]
pub trait AuditSink: Send + Sync + 'static {
    // Returns the sink backend name (for logging).
    fn backend_name(&self) -> &'static str;

    async fn append(&self, entry: &AuditEntry) -> Result<(), AuditError>;
}

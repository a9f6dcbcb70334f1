use async_trait::async_trait;

use crate::services::audit::entry::AuditEntry;
use crate::services::audit::sink::{AuditError, AuditSink};

/// Emits each entry as one structured event on the `audit` tracing target.
///
/// Route it to its own file/collector with a per-target filter
/// (e.g. `RUST_LOG=info,audit=info`).
#[derive(Debug, Clone, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    fn backend_name(&self) -> &'static str {
        "log"
    }

    async fn append(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        let line = entry.to_json_line()?;
        tracing::info!(
            target: "audit",
            action = %entry.action,
            subject = %entry.subject,
            success = entry.outcome.is_success(),
            entry = %line,
            "audit"
        );
        Ok(())
    }
}

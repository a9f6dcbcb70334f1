use std::sync::Arc;

use crate::services::audit::entry::AuditEntry;
use crate::services::audit::sink::AuditSink;

/// Front door to the audit sink.
///
/// `record` is awaited by the pipeline so the entry is written before the response
/// goes out, but a sink failure is only logged: the caller's result is decided by
/// the upstream, never by the audit trail.
#[derive(Clone)]
pub struct AuditRecorder {
    sink: Arc<dyn AuditSink>,
}

impl std::fmt::Debug for AuditRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditRecorder")
            .field("sink", &self.sink.backend_name())
            .finish()
    }
}

impl AuditRecorder {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }

    /// Arm a fallback entry. It is written if the returned guard is dropped
    /// before `PendingAudit::complete` runs.
    pub fn pending(&self, fallback: AuditEntry) -> PendingAudit {
        PendingAudit {
            recorder: self.clone(),
            fallback: Some(fallback),
        }
    }

    /// Write on a spawned task: dropping the caller does not interrupt the write.
    pub async fn record_detached(&self, entry: AuditEntry) {
        let recorder = self.clone();
        if let Err(err) = tokio::spawn(async move { recorder.record(entry).await }).await {
            tracing::error!(error = %err, "audit task failed");
        }
    }

    pub async fn record(&self, entry: AuditEntry) {
        if let Err(err) = self.sink.append(&entry).await {
            tracing::error!(
                error = %err,
                sink = self.sink.backend_name(),
                audit_id = %entry.id,
                action = %entry.action,
                subject = %entry.subject,
                "failed to record audit entry"
            );
        }
    }
}

/// Audit obligation for a call that has reached the upstream.
///
/// Either `complete` writes the real entry, or `Drop` writes the fallback
/// (the handler future was cancelled mid-call).
#[derive(Debug)]
pub struct PendingAudit {
    recorder: AuditRecorder,
    fallback: Option<AuditEntry>,
}

impl PendingAudit {
    pub async fn complete(mut self, entry: AuditEntry) {
        self.fallback = None;
        self.recorder.record_detached(entry).await;
    }
}

impl Drop for PendingAudit {
    fn drop(&mut self) {
        let Some(entry) = self.fallback.take() else {
            return;
        };

        tracing::warn!(
            audit_id = %entry.id,
            action = %entry.action,
            subject = %entry.subject,
            "call abandoned while upstream was in flight"
        );
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let recorder = self.recorder.clone();
                runtime.spawn(async move { recorder.record(entry).await });
            }
            Err(_) => tracing::error!(
                audit_id = %entry.id,
                action = %entry.action,
                "no runtime left to record abandoned call"
            ),
        }
    }
}

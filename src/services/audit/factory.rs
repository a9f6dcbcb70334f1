/// Factory: build the audit sink selected by `AUDIT_SINK`.
use std::sync::Arc;

use crate::config::AuditSinkKind;
use crate::services::audit::{
    AuditError, AuditSink, MemoryAuditSink, TracingAuditSink, ValkeyAuditSink,
};

pub async fn build_audit_sink(kind: &AuditSinkKind) -> Result<Arc<dyn AuditSink>, AuditError> {
    let sink: Arc<dyn AuditSink> = match kind {
        AuditSinkKind::Log => Arc::new(TracingAuditSink),
        AuditSinkKind::Memory => Arc::new(MemoryAuditSink::new()),
        AuditSinkKind::Valkey { url, key } => Arc::new(ValkeyAuditSink::new(url, key.clone()).await?),
    };

    tracing::info!(sink = sink.backend_name(), "audit sink ready");
    Ok(sink)
}

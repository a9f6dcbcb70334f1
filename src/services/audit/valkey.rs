use async_trait::async_trait;

use crate::services::audit::entry::AuditEntry;
use crate::services::audit::sink::{AuditError, AuditSink};

/// Valkey/Redis-backed sink.
///
/// Each entry is one JSON string `RPUSH`ed onto a list, so appends from
/// concurrent calls are atomic per entry and ordered by arrival.
#[derive(Clone)]
pub struct ValkeyAuditSink {
    manager: redis::aio::ConnectionManager,
    key: String,
}

impl std::fmt::Debug for ValkeyAuditSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValkeyAuditSink")
            .field("key", &self.key)
            .finish()
    }
}

impl ValkeyAuditSink {
    // Create a sink from a URL like `redis://localhost:6379`
    pub async fn new(url: &str, key: impl Into<String>) -> Result<Self, AuditError> {
        let client =
            redis::Client::open(url).map_err(|e| AuditError::BackendConnection(e.to_string()))?;

        let manager = client
            .get_connection_manager()
            .await
            .map_err(|e| AuditError::BackendConnection(e.to_string()))?;

        Ok(Self {
            manager,
            key: key.into(),
        })
    }
}

#[async_trait]
impl AuditSink for ValkeyAuditSink {
    fn backend_name(&self) -> &'static str {
        "valkey"
    }

    async fn append(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        let line = entry.to_json_line()?;
        let mut conn = self.manager.clone();

        // RPUSH returns the list length after the push.
        let _len: u64 = redis::cmd("RPUSH")
            .arg(&self.key)
            .arg(line)
            .query_async(&mut conn)
            .await
            .map_err(|e| AuditError::BackendCommand(e.to_string()))?;

        Ok(())
    }
}

use std::sync::Mutex;

use async_trait::async_trait;

use crate::services::audit::entry::AuditEntry;
use crate::services::audit::sink::{AuditError, AuditSink};

/// In-process sink (tests, local runs). Entries live as long as the process.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything appended so far, in append order.
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn append(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| AuditError::BackendCommand("memory sink poisoned".to_string()))?;
        entries.push(entry.clone());
        Ok(())
    }
}

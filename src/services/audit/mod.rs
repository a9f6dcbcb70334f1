pub mod entry;
pub mod factory;
pub mod log;
pub mod memory;
pub mod recorder;
pub mod sink;
pub mod valkey;

pub use entry::{AuditEntry, AuditOutcome, FailureClass};
pub use factory::build_audit_sink;
pub use log::TracingAuditSink;
pub use memory::MemoryAuditSink;
pub use recorder::{AuditRecorder, PendingAudit};
pub use sink::{AuditError, AuditSink};
pub use valkey::ValkeyAuditSink;

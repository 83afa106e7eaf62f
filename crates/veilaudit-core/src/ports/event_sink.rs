//! Event sink port
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because delivery errors are adapter-specific.
//! - Publishing happens after an operation has committed. A delivery
//!   failure is logged by the caller and never undoes the operation.

use crate::domain::AuditEvent;

pub trait IEventSink: Send + Sync {
    /// Delivers one event
    fn publish(&self, event: &AuditEvent) -> anyhow::Result<()>;
}

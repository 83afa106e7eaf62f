//! Event sinks that forward to other destinations

use std::sync::Arc;

use veilaudit_core::domain::AuditEvent;
use veilaudit_core::ports::IEventSink;

/// Emits every event as an `info` log line with structured fields
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl IEventSink for TracingEventSink {
    fn publish(&self, event: &AuditEvent) -> anyhow::Result<()> {
        let details = serde_json::to_string(event)?;
        match event.audit_id() {
            Some(audit_id) => tracing::info!(
                target: "veilaudit::events",
                event = event.name(),
                audit_id = %audit_id,
                %details,
                "Audit event"
            ),
            None => tracing::info!(
                target: "veilaudit::events",
                event = event.name(),
                %details,
                "Audit event"
            ),
        }
        Ok(())
    }
}

/// Publishes to every inner sink, failing if any of them failed
///
/// All sinks are attempted even after a failure.
#[derive(Default, Clone)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn IEventSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn IEventSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl IEventSink for FanoutSink {
    fn publish(&self, event: &AuditEvent) -> anyhow::Result<()> {
        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(e) = sink.publish(event) {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e.context(format!("Failed to fan out {} event", event.name()))),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EventJournal;
    use chrono::Utc;
    use veilaudit_core::domain::AuditId;

    struct Broken;

    impl IEventSink for Broken {
        fn publish(&self, _event: &AuditEvent) -> anyhow::Result<()> {
            anyhow::bail!("sink offline")
        }
    }

    fn started() -> AuditEvent {
        AuditEvent::AuditStarted {
            audit_id: AuditId::new(1),
            at: Utc::now(),
        }
    }

    #[test]
    fn test_tracing_sink_never_fails() {
        assert!(TracingEventSink.publish(&started()).is_ok());
    }

    #[test]
    fn test_fanout_reaches_every_sink() {
        let first = Arc::new(EventJournal::new());
        let second = Arc::new(EventJournal::new());
        let fanout = FanoutSink::new()
            .with(first.clone())
            .with(Arc::new(TracingEventSink))
            .with(second.clone());
        fanout.publish(&started()).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
    }

    #[test]
    fn test_fanout_reports_failure_after_delivering_rest() {
        let journal = Arc::new(EventJournal::new());
        let fanout = FanoutSink::new()
            .with(Arc::new(Broken))
            .with(journal.clone());
        let err = fanout.publish(&started()).unwrap_err();
        assert!(format!("{err:#}").contains("sink offline"));
        assert_eq!(journal.count("audit_started"), 1);
    }
}

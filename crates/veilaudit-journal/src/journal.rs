//! EventJournal - in-memory trail of published audit events
//!
//! Each event is stored as a [`JournalEntry`] with its own id, the time it
//! was recorded and the full event serialized as JSON details.

use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Context};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use veilaudit_core::domain::{AuditEvent, AuditId};
use veilaudit_core::ports::IEventSink;

/// One recorded event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: Uuid,
    pub recorded_at: DateTime<Utc>,
    /// Snake_case event name, e.g. `decryption_timed_out`
    pub event_type: String,
    pub audit_id: Option<AuditId>,
    /// The event as JSON, including its own timestamp
    pub details: serde_json::Value,
}

impl JournalEntry {
    pub fn from_event(event: &AuditEvent) -> anyhow::Result<Self> {
        let details = serde_json::to_value(event)
            .with_context(|| format!("Failed to serialize {} event", event.name()))?;
        Ok(Self {
            id: Uuid::new_v4(),
            recorded_at: Utc::now(),
            event_type: event.name().to_string(),
            audit_id: event.audit_id(),
            details,
        })
    }

    /// Decodes the stored details back into the event
    pub fn event(&self) -> anyhow::Result<AuditEvent> {
        serde_json::from_value(self.details.clone())
            .with_context(|| format!("Journal entry {} is not a valid event", self.id))
    }
}

#[derive(Debug, Default)]
pub struct EventJournal {
    entries: Mutex<Vec<JournalEntry>>,
}

impl EventJournal {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> anyhow::Result<MutexGuard<'_, Vec<JournalEntry>>> {
        self.entries
            .lock()
            .map_err(|_| anyhow!("event journal lock poisoned"))
    }

    /// Snapshot of every entry in publication order
    pub fn entries(&self) -> Vec<JournalEntry> {
        self.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Event names in publication order
    pub fn names(&self) -> Vec<String> {
        self.entries().into_iter().map(|e| e.event_type).collect()
    }

    /// Number of entries named `event_type`
    pub fn count(&self, event_type: &str) -> usize {
        self.lock()
            .map(|e| e.iter().filter(|entry| entry.event_type == event_type).count())
            .unwrap_or(0)
    }

    /// Entries concerning audit `id`
    pub fn for_audit(&self, id: AuditId) -> Vec<JournalEntry> {
        self.entries()
            .into_iter()
            .filter(|entry| entry.audit_id == Some(id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Renders the journal as newline-delimited JSON
    pub fn to_json_lines(&self) -> anyhow::Result<String> {
        let mut out = String::new();
        for entry in self.entries() {
            out.push_str(&serde_json::to_string(&entry)?);
            out.push('\n');
        }
        Ok(out)
    }
}

impl IEventSink for EventJournal {
    fn publish(&self, event: &AuditEvent) -> anyhow::Result<()> {
        let entry = JournalEntry::from_event(event)?;
        tracing::trace!(event = %entry.event_type, id = %entry.id, "Journal entry recorded");
        self.lock()?.push(entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veilaudit_core::domain::{Principal, RequestId, RiskTier};

    fn timed_out(audit: u64) -> AuditEvent {
        AuditEvent::DecryptionTimedOut {
            audit_id: AuditId::new(audit),
            request_id: RequestId::new(audit + 100),
            at: Utc::now(),
        }
    }

    #[test]
    fn test_publish_records_in_order() {
        let journal = EventJournal::new();
        journal.publish(&timed_out(1)).unwrap();
        journal
            .publish(&AuditEvent::AuditCompleted {
                audit_id: AuditId::new(2),
                risk_tier: RiskTier::Low,
                at: Utc::now(),
            })
            .unwrap();
        assert_eq!(journal.names(), vec!["decryption_timed_out", "audit_completed"]);
        assert_eq!(journal.count("audit_completed"), 1);
        assert_eq!(journal.len(), 2);
    }

    #[test]
    fn test_entries_carry_audit_and_details() {
        let journal = EventJournal::new();
        journal.publish(&timed_out(7)).unwrap();
        journal
            .publish(&AuditEvent::RefundWithdrawn {
                beneficiary: Principal::new("auditor").unwrap(),
                amount: 50,
                at: Utc::now(),
            })
            .unwrap();

        let for_seven = journal.for_audit(AuditId::new(7));
        assert_eq!(for_seven.len(), 1);
        assert_eq!(for_seven[0].details["request_id"], 107);
        assert!(matches!(
            for_seven[0].event().unwrap(),
            AuditEvent::DecryptionTimedOut { .. }
        ));
        assert!(journal.entries()[1].audit_id.is_none());
    }

    #[test]
    fn test_entry_ids_are_unique() {
        let journal = EventJournal::new();
        journal.publish(&timed_out(1)).unwrap();
        journal.publish(&timed_out(1)).unwrap();
        let entries = journal.entries();
        assert_ne!(entries[0].id, entries[1].id);
    }

    #[test]
    fn test_json_lines_one_per_entry() {
        let journal = EventJournal::new();
        assert!(journal.is_empty());
        journal.publish(&timed_out(1)).unwrap();
        journal.publish(&timed_out(2)).unwrap();
        let rendered = journal.to_json_lines().unwrap();
        assert_eq!(rendered.lines().count(), 2);
        let first: JournalEntry = serde_json::from_str(rendered.lines().next().unwrap()).unwrap();
        assert_eq!(first.event_type, "decryption_timed_out");
    }
}

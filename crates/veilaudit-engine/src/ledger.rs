//! AuditLedger - source of truth for audit records
//!
//! Owns every [`AuditRecord`] and hands out ids from a counter that only
//! moves forward. Mutation goes through the record's own transition
//! methods, which validate before they touch anything.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use veilaudit_core::domain::{
    AuditId, AuditRecord, AuditStandard, AuditStatus, CiphertextHandle, Principal,
    RevealedFindings,
};
use veilaudit_core::{AuditError, Result};

/// Owned collection of audit records keyed by id
#[derive(Debug, Default)]
pub struct AuditLedger {
    records: BTreeMap<AuditId, AuditRecord>,
    last_id: u64,
}

impl AuditLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a `Scheduled` record and returns its fresh id
    pub fn schedule(
        &mut self,
        standard: AuditStandard,
        auditor: Principal,
        auditee: Principal,
        now: DateTime<Utc>,
    ) -> Result<AuditId> {
        let next = self
            .last_id
            .checked_add(1)
            .ok_or(AuditError::Overflow("audit id counter"))?;
        let id = AuditId::new(next);
        self.last_id = next;
        info!(audit_id = %id, %standard, auditor = %auditor, auditee = %auditee, "Audit scheduled");
        self.records
            .insert(id, AuditRecord::new(id, standard, auditor, auditee, now));
        Ok(id)
    }

    pub fn get(&self, id: AuditId) -> Result<&AuditRecord> {
        self.records
            .get(&id)
            .ok_or_else(|| AuditError::unknown_audit(id))
    }

    fn record_mut(&mut self, id: AuditId) -> Result<&mut AuditRecord> {
        self.records
            .get_mut(&id)
            .ok_or_else(|| AuditError::unknown_audit(id))
    }

    pub fn start(&mut self, id: AuditId, now: DateTime<Utc>) -> Result<()> {
        self.record_mut(id)?.start(now)?;
        info!(audit_id = %id, "Audit started");
        Ok(())
    }

    pub fn record_findings(
        &mut self,
        id: AuditId,
        findings: CiphertextHandle,
        penalty: CiphertextHandle,
    ) -> Result<()> {
        self.record_mut(id)?.record_findings(findings, penalty)?;
        debug!(
            audit_id = %id,
            findings = %findings.short(),
            penalty = %penalty.short(),
            "Encrypted findings recorded"
        );
        Ok(())
    }

    pub fn begin_decryption(
        &mut self,
        id: AuditId,
        score: CiphertextHandle,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.record_mut(id)?.begin_decryption(score, now)?;
        info!(audit_id = %id, score = %score.short(), "Audit pending decryption");
        Ok(())
    }

    pub fn complete_with(
        &mut self,
        id: AuditId,
        revealed: RevealedFindings,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.record_mut(id)?.complete_with(revealed, now)?;
        info!(audit_id = %id, findings = revealed.findings_count, "Audit completed from decryption");
        Ok(())
    }

    pub fn complete_manually(
        &mut self,
        id: AuditId,
        findings_count: u32,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.record_mut(id)?.complete_manually(findings_count, now)?;
        info!(audit_id = %id, findings = findings_count, "Audit completed manually");
        Ok(())
    }

    pub fn refund(&mut self, id: AuditId, now: DateTime<Utc>) -> Result<()> {
        self.record_mut(id)?.refund(now)?;
        info!(audit_id = %id, "Audit refunded after timeout");
        Ok(())
    }

    pub fn fail(&mut self, id: AuditId, reason: &str, now: DateTime<Utc>) -> Result<()> {
        self.record_mut(id)?.fail(reason, now)?;
        info!(audit_id = %id, reason, "Audit failed");
        Ok(())
    }

    /// All records in id order
    pub fn records(&self) -> impl Iterator<Item = &AuditRecord> {
        self.records.values()
    }

    /// Records whose auditee is `entity`
    pub fn for_auditee<'a>(&'a self, entity: &'a Principal) -> impl Iterator<Item = &'a AuditRecord> {
        self.records.values().filter(move |r| r.auditee() == entity)
    }

    /// The audit of `entity` currently waiting for decryption, if any
    pub fn pending_for<'a>(&'a self, entity: &'a Principal) -> Option<&'a AuditRecord> {
        self.for_auditee(entity)
            .find(|r| r.status() == AuditStatus::DecryptionPending)
    }

    /// Number of records currently in `status`
    pub fn count_in(&self, status: AuditStatus) -> usize {
        self.records.values().filter(|r| r.status() == status).count()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(name: &str) -> Principal {
        Principal::new(name).unwrap()
    }

    fn handle(byte: u8) -> CiphertextHandle {
        CiphertextHandle::from_bytes([byte; 32])
    }

    fn schedule_one(ledger: &mut AuditLedger) -> AuditId {
        ledger
            .schedule(
                AuditStandard::Hipaa,
                principal("auditor"),
                principal("clinic"),
                Utc::now(),
            )
            .unwrap()
    }

    #[test]
    fn test_ids_increase_and_are_not_reused() {
        let mut ledger = AuditLedger::new();
        let a = schedule_one(&mut ledger);
        let b = schedule_one(&mut ledger);
        assert_eq!(a, AuditId::new(1));
        assert_eq!(b, AuditId::new(2));
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_unknown_id_is_invalid_reference() {
        let mut ledger = AuditLedger::new();
        let err = ledger.start(AuditId::new(99), Utc::now()).unwrap_err();
        assert_eq!(err, AuditError::unknown_audit(AuditId::new(99)));
    }

    #[test]
    fn test_full_decryption_path() {
        let mut ledger = AuditLedger::new();
        let id = schedule_one(&mut ledger);
        let now = Utc::now();
        ledger.start(id, now).unwrap();
        ledger.record_findings(id, handle(1), handle(2)).unwrap();
        assert!(ledger.pending_for(&principal("clinic")).is_none());
        ledger.begin_decryption(id, handle(3), now).unwrap();
        assert_eq!(ledger.count_in(AuditStatus::DecryptionPending), 1);
        assert_eq!(
            ledger.pending_for(&principal("clinic")).map(|r| r.id()),
            Some(id)
        );

        ledger
            .complete_with(id, RevealedFindings::manual(4), now)
            .unwrap();
        let record = ledger.get(id).unwrap();
        assert_eq!(record.status(), AuditStatus::Completed);
        assert!(record.end_time().is_some());
    }

    #[test]
    fn test_failed_transition_leaves_record_unchanged() {
        let mut ledger = AuditLedger::new();
        let id = schedule_one(&mut ledger);
        let before = ledger.get(id).unwrap().clone();
        assert!(ledger.refund(id, Utc::now()).is_err());
        assert!(ledger.begin_decryption(id, handle(3), Utc::now()).is_err());
        assert_eq!(ledger.get(id).unwrap(), &before);
    }

    #[test]
    fn test_for_auditee_filters() {
        let mut ledger = AuditLedger::new();
        schedule_one(&mut ledger);
        ledger
            .schedule(
                AuditStandard::Sox,
                principal("auditor"),
                principal("bank"),
                Utc::now(),
            )
            .unwrap();
        let bank = principal("bank");
        let ids: Vec<_> = ledger.for_auditee(&bank).map(|r| r.id()).collect();
        assert_eq!(ids, vec![AuditId::new(2)]);
    }
}

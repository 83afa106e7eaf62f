//! Observable events
//!
//! Fired after a guarded operation commits, for external auditability.
//! Every event names the affected audit or entity and carries the
//! timestamp of the operation that produced it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::audit::{AuditStandard, RiskTier};
use super::newtypes::{AuditId, Principal, RequestId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    ProfileRegistered {
        controller: Principal,
        /// False when an existing profile was refreshed
        first_registration: bool,
        at: DateTime<Utc>,
    },
    AuditScheduled {
        audit_id: AuditId,
        auditor: Principal,
        auditee: Principal,
        standard: AuditStandard,
        at: DateTime<Utc>,
    },
    AuditStarted {
        audit_id: AuditId,
        at: DateTime<Utc>,
    },
    FindingsRecorded {
        audit_id: AuditId,
        at: DateTime<Utc>,
    },
    DecryptionRequested {
        audit_id: AuditId,
        request_id: RequestId,
        requester: Principal,
        stake: u64,
        at: DateTime<Utc>,
    },
    DecryptionCompleted {
        audit_id: AuditId,
        request_id: RequestId,
        at: DateTime<Utc>,
    },
    DecryptionTimedOut {
        audit_id: AuditId,
        request_id: RequestId,
        at: DateTime<Utc>,
    },
    RefundIssued {
        audit_id: AuditId,
        beneficiary: Principal,
        amount: u64,
        at: DateTime<Utc>,
    },
    RefundWithdrawn {
        beneficiary: Principal,
        amount: u64,
        at: DateTime<Utc>,
    },
    AuditCompleted {
        audit_id: AuditId,
        risk_tier: RiskTier,
        at: DateTime<Utc>,
    },
    AuditFailed {
        audit_id: AuditId,
        reason: String,
        at: DateTime<Utc>,
    },
    ViolationDetected {
        audit_id: AuditId,
        auditee: Principal,
        risk_tier: RiskTier,
        at: DateTime<Utc>,
    },
    ScoreUpdated {
        audit_id: AuditId,
        auditee: Principal,
        previous: u32,
        current: u32,
        at: DateTime<Utc>,
    },
}

impl AuditEvent {
    /// Stable snake_case name of the event
    pub fn name(&self) -> &'static str {
        match self {
            AuditEvent::ProfileRegistered { .. } => "profile_registered",
            AuditEvent::AuditScheduled { .. } => "audit_scheduled",
            AuditEvent::AuditStarted { .. } => "audit_started",
            AuditEvent::FindingsRecorded { .. } => "findings_recorded",
            AuditEvent::DecryptionRequested { .. } => "decryption_requested",
            AuditEvent::DecryptionCompleted { .. } => "decryption_completed",
            AuditEvent::DecryptionTimedOut { .. } => "decryption_timed_out",
            AuditEvent::RefundIssued { .. } => "refund_issued",
            AuditEvent::RefundWithdrawn { .. } => "refund_withdrawn",
            AuditEvent::AuditCompleted { .. } => "audit_completed",
            AuditEvent::AuditFailed { .. } => "audit_failed",
            AuditEvent::ViolationDetected { .. } => "violation_detected",
            AuditEvent::ScoreUpdated { .. } => "score_updated",
        }
    }

    /// When the producing operation ran
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            AuditEvent::ProfileRegistered { at, .. }
            | AuditEvent::AuditScheduled { at, .. }
            | AuditEvent::AuditStarted { at, .. }
            | AuditEvent::FindingsRecorded { at, .. }
            | AuditEvent::DecryptionRequested { at, .. }
            | AuditEvent::DecryptionCompleted { at, .. }
            | AuditEvent::DecryptionTimedOut { at, .. }
            | AuditEvent::RefundIssued { at, .. }
            | AuditEvent::RefundWithdrawn { at, .. }
            | AuditEvent::AuditCompleted { at, .. }
            | AuditEvent::AuditFailed { at, .. }
            | AuditEvent::ViolationDetected { at, .. }
            | AuditEvent::ScoreUpdated { at, .. } => *at,
        }
    }

    /// The audit the event concerns, if any
    pub fn audit_id(&self) -> Option<AuditId> {
        match self {
            AuditEvent::ProfileRegistered { .. } | AuditEvent::RefundWithdrawn { .. } => None,
            AuditEvent::AuditScheduled { audit_id, .. }
            | AuditEvent::AuditStarted { audit_id, .. }
            | AuditEvent::FindingsRecorded { audit_id, .. }
            | AuditEvent::DecryptionRequested { audit_id, .. }
            | AuditEvent::DecryptionCompleted { audit_id, .. }
            | AuditEvent::DecryptionTimedOut { audit_id, .. }
            | AuditEvent::RefundIssued { audit_id, .. }
            | AuditEvent::AuditCompleted { audit_id, .. }
            | AuditEvent::AuditFailed { audit_id, .. }
            | AuditEvent::ViolationDetected { audit_id, .. }
            | AuditEvent::ScoreUpdated { audit_id, .. } => Some(*audit_id),
        }
    }
}

//! AuditRecord domain entity
//!
//! This module defines the audit record and the lifecycle it moves through
//! while its encrypted findings wait to be revealed.
//!
//! ## State Machine
//!
//! ```text
//!  ┌───────────┐  start   ┌─────────────┐  request   ┌────────────────────┐
//!  │ Scheduled │ ───────► │ In progress │ ─────────► │ Decryption pending │
//!  └───────────┘          └─────────────┘            └────────────────────┘
//!                                │                      │      │      │
//!                   manual       │            callback  │ fail │      │ timeout
//!                   completion   ▼                      ▼      ▼      ▼
//!                          ┌───────────┐◄───────────────┘ ┌────────┐ ┌──────────┐
//!                          │ Completed │                  │ Failed │ │ Refunded │
//!                          └───────────┘                  └────────┘ └──────────┘
//! ```
//!
//! Completed, Failed and Refunded are terminal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::{AuditError, Result};
use super::newtypes::{AuditId, CiphertextHandle, Principal};

// ============================================================================
// AuditStatus
// ============================================================================

/// Lifecycle status of an audit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    /// Created, not yet started by the auditor
    #[default]
    Scheduled,
    /// Auditor is collecting findings
    InProgress,
    /// Waiting for the decryption service to reveal the findings
    DecryptionPending,
    /// Findings revealed and applied
    Completed,
    /// Rejected while pending decryption
    Failed,
    /// Decryption never arrived; the stake was credited back
    Refunded,
}

impl AuditStatus {
    /// Returns true if no transition leaves this status
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AuditStatus::Completed | AuditStatus::Failed | AuditStatus::Refunded
        )
    }

    /// Returns true if the status is waiting on the decryption service
    pub fn is_pending_decryption(&self) -> bool {
        matches!(self, AuditStatus::DecryptionPending)
    }

    /// Checks whether `target` is reachable in one step from this status
    ///
    /// Valid transitions:
    /// - Scheduled -> InProgress
    /// - InProgress -> DecryptionPending, Completed (manual completion)
    /// - DecryptionPending -> Completed, Failed, Refunded
    pub fn can_transition_to(&self, target: AuditStatus) -> bool {
        matches!(
            (self, target),
            (AuditStatus::Scheduled, AuditStatus::InProgress)
                | (AuditStatus::InProgress, AuditStatus::DecryptionPending)
                | (AuditStatus::InProgress, AuditStatus::Completed)
                | (AuditStatus::DecryptionPending, AuditStatus::Completed)
                | (AuditStatus::DecryptionPending, AuditStatus::Failed)
                | (AuditStatus::DecryptionPending, AuditStatus::Refunded)
        )
    }
}

impl fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AuditStatus::Scheduled => "scheduled",
            AuditStatus::InProgress => "in_progress",
            AuditStatus::DecryptionPending => "decryption_pending",
            AuditStatus::Completed => "completed",
            AuditStatus::Failed => "failed",
            AuditStatus::Refunded => "refunded",
        };
        f.write_str(s)
    }
}

// ============================================================================
// AuditStandard and RiskTier
// ============================================================================

/// Regulatory framework an audit is performed against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStandard {
    Gdpr,
    Hipaa,
    Sox,
    PciDss,
    Iso27001,
    Ccpa,
}

impl fmt::Display for AuditStandard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AuditStandard::Gdpr => "GDPR",
            AuditStandard::Hipaa => "HIPAA",
            AuditStandard::Sox => "SOX",
            AuditStandard::PciDss => "PCI-DSS",
            AuditStandard::Iso27001 => "ISO-27001",
            AuditStandard::Ccpa => "CCPA",
        };
        f.write_str(s)
    }
}

/// Overall risk derived from the number of findings
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskTier {
    /// Classifies a findings count
    ///
    /// 0..=3 is Low, 4..=7 Medium, 8..=15 High, anything above Critical.
    pub fn from_findings(findings: u32) -> Self {
        match findings {
            0..=3 => RiskTier::Low,
            4..=7 => RiskTier::Medium,
            8..=15 => RiskTier::High,
            _ => RiskTier::Critical,
        }
    }

    /// Score points deducted per finding at this tier
    pub fn weight(&self) -> u32 {
        match self {
            RiskTier::Low => 2,
            RiskTier::Medium => 5,
            RiskTier::High => 10,
            RiskTier::Critical => 20,
        }
    }

    /// Returns true if the auditee must remediate
    pub fn requires_remediation(&self) -> bool {
        *self >= RiskTier::High
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskTier::Low => "low",
            RiskTier::Medium => "medium",
            RiskTier::High => "high",
            RiskTier::Critical => "critical",
        };
        f.write_str(s)
    }
}

// ============================================================================
// RevealedFindings
// ============================================================================

/// Plaintext outcome of an audit once its findings are known
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealedFindings {
    /// Number of findings
    pub findings_count: u32,
    /// Penalty amount (zero on the manual path)
    pub penalty: u64,
    /// Auditee compliance score before adjustment, when revealed
    pub score_before: Option<u32>,
    /// Auditee compliance score after adjustment, when revealed
    pub score_after: Option<u32>,
}

impl RevealedFindings {
    /// Findings entered in plaintext by the auditor
    pub fn manual(findings_count: u32) -> Self {
        Self {
            findings_count,
            penalty: 0,
            score_before: None,
            score_after: None,
        }
    }
}

// ============================================================================
// AuditRecord
// ============================================================================

/// A compliance audit of one entity by one auditor
///
/// Records are created by the ledger and only change through the
/// transition methods below, each of which checks the state machine first
/// and leaves the record untouched on error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    id: AuditId,
    standard: AuditStandard,
    status: AuditStatus,
    auditor: Principal,
    auditee: Principal,
    findings_handle: Option<CiphertextHandle>,
    penalty_handle: Option<CiphertextHandle>,
    score_handle: Option<CiphertextHandle>,
    risk_tier: Option<RiskTier>,
    scheduled_at: DateTime<Utc>,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    decryption_request_time: Option<DateTime<Utc>>,
    remediation_required: bool,
    revealed: Option<RevealedFindings>,
    failure_reason: Option<String>,
}

impl AuditRecord {
    /// Creates a record in `Scheduled`
    pub fn new(
        id: AuditId,
        standard: AuditStandard,
        auditor: Principal,
        auditee: Principal,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            standard,
            status: AuditStatus::Scheduled,
            auditor,
            auditee,
            findings_handle: None,
            penalty_handle: None,
            score_handle: None,
            risk_tier: None,
            scheduled_at: now,
            start_time: None,
            end_time: None,
            decryption_request_time: None,
            remediation_required: false,
            revealed: None,
            failure_reason: None,
        }
    }

    // --- Getters ---

    pub fn id(&self) -> AuditId {
        self.id
    }

    pub fn standard(&self) -> AuditStandard {
        self.standard
    }

    pub fn status(&self) -> AuditStatus {
        self.status
    }

    pub fn auditor(&self) -> &Principal {
        &self.auditor
    }

    pub fn auditee(&self) -> &Principal {
        &self.auditee
    }

    pub fn risk_tier(&self) -> Option<RiskTier> {
        self.risk_tier
    }

    pub fn scheduled_at(&self) -> DateTime<Utc> {
        self.scheduled_at
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    pub fn decryption_request_time(&self) -> Option<DateTime<Utc>> {
        self.decryption_request_time
    }

    pub fn remediation_required(&self) -> bool {
        self.remediation_required
    }

    pub fn revealed(&self) -> Option<&RevealedFindings> {
        self.revealed.as_ref()
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    /// Returns the three handles committed for decryption, in
    /// findings / penalty / score order, once decryption was requested
    pub fn committed_handles(&self) -> Option<[CiphertextHandle; 3]> {
        match (self.findings_handle, self.penalty_handle, self.score_handle) {
            (Some(findings), Some(penalty), Some(score)) => Some([findings, penalty, score]),
            _ => None,
        }
    }

    // --- Guards ---

    /// Fails with `WrongState` unless the record is in `expected`
    pub fn ensure_status(&self, expected: AuditStatus, operation: &'static str) -> Result<()> {
        if self.status != expected {
            return Err(self.wrong_state(operation));
        }
        Ok(())
    }

    fn wrong_state(&self, operation: &'static str) -> AuditError {
        AuditError::WrongState {
            audit: self.id,
            status: self.status,
            operation,
        }
    }

    fn transition(
        &mut self,
        target: AuditStatus,
        operation: &'static str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if !self.status.can_transition_to(target) {
            return Err(self.wrong_state(operation));
        }
        match target {
            AuditStatus::InProgress => self.start_time = Some(now),
            AuditStatus::DecryptionPending => self.decryption_request_time = Some(now),
            _ => {}
        }
        if target.is_terminal() {
            self.end_time = Some(now);
        }
        self.status = target;
        Ok(())
    }

    // --- Transitions ---

    /// Scheduled -> InProgress
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.transition(AuditStatus::InProgress, "start", now)
    }

    /// Stores the encrypted findings and penalty
    ///
    /// Allowed repeatedly while in progress; later calls replace earlier ones.
    pub fn record_findings(
        &mut self,
        findings: CiphertextHandle,
        penalty: CiphertextHandle,
    ) -> Result<()> {
        self.ensure_status(AuditStatus::InProgress, "record findings for")?;
        self.findings_handle = Some(findings);
        self.penalty_handle = Some(penalty);
        Ok(())
    }

    /// Checks that decryption may be requested, returning the handles to
    /// commit with `score` as the auditee's current score handle
    pub fn decryption_handles(&self, score: CiphertextHandle) -> Result<[CiphertextHandle; 3]> {
        self.ensure_status(AuditStatus::InProgress, "request decryption for")?;
        match (self.findings_handle, self.penalty_handle) {
            (Some(findings), Some(penalty)) => Ok([findings, penalty, score]),
            _ => Err(self.wrong_state("request decryption without recorded findings for")),
        }
    }

    /// InProgress -> DecryptionPending, committing `score` and stamping
    /// the request time
    pub fn begin_decryption(&mut self, score: CiphertextHandle, now: DateTime<Utc>) -> Result<()> {
        self.decryption_handles(score)?;
        self.transition(AuditStatus::DecryptionPending, "request decryption for", now)?;
        self.score_handle = Some(score);
        Ok(())
    }

    /// DecryptionPending -> Completed with the revealed findings
    pub fn complete_with(&mut self, revealed: RevealedFindings, now: DateTime<Utc>) -> Result<()> {
        self.ensure_status(AuditStatus::DecryptionPending, "apply callback to")?;
        self.finish(revealed, "apply callback to", now)
    }

    /// InProgress -> Completed with plaintext findings from the auditor
    pub fn complete_manually(&mut self, findings_count: u32, now: DateTime<Utc>) -> Result<()> {
        self.ensure_status(AuditStatus::InProgress, "complete")?;
        self.finish(RevealedFindings::manual(findings_count), "complete", now)
    }

    fn finish(
        &mut self,
        revealed: RevealedFindings,
        operation: &'static str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.transition(AuditStatus::Completed, operation, now)?;
        let tier = RiskTier::from_findings(revealed.findings_count);
        self.risk_tier = Some(tier);
        self.remediation_required = tier.requires_remediation();
        self.revealed = Some(revealed);
        Ok(())
    }

    /// DecryptionPending -> Refunded
    pub fn refund(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.ensure_status(AuditStatus::DecryptionPending, "expire")?;
        self.transition(AuditStatus::Refunded, "expire", now)
    }

    /// DecryptionPending -> Failed with a reason
    pub fn fail(&mut self, reason: impl Into<String>, now: DateTime<Utc>) -> Result<()> {
        self.ensure_status(AuditStatus::DecryptionPending, "fail")?;
        self.transition(AuditStatus::Failed, "fail", now)?;
        self.failure_reason = Some(reason.into());
        Ok(())
    }
}

//! AuditOrchestrator - the guarded operations of the system
//!
//! Every operation takes `&mut self`, so a caller holding the orchestrator
//! has exclusive access for the whole call. Each operation first runs every
//! check and every port call it needs, then mutates. A failed operation
//! therefore leaves ledger, tracker, refunds and profiles as they were.
//!
//! Events are published after the mutation commits. Publishing is best
//! effort: a failing sink is logged and the operation still succeeds.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use veilaudit_core::config::Config;
use veilaudit_core::domain::{
    AuditEvent, AuditId, AuditRecord, AuditStandard, AuditStatus, Capability, CapabilitySet,
    CiphertextHandle, ComplianceProfile, ComplianceScoreAdjuster, DecryptedFindings,
    DecryptionProof, DecryptionRequest, Principal, ProfileSubmission, RequestId,
    RevealedFindings, RiskTier, ValueObfuscator,
};
use veilaudit_core::ports::{
    IClock, IDecryptionService, IEncryptor, IEventSink, IProofVerifier, IRoleDirectory,
    DECRYPTION_CALLBACK,
};
use veilaudit_core::{AuditError, Result};

use crate::ledger::AuditLedger;
use crate::profiles::ProfileRegistry;
use crate::refunds::RefundLedger;
use crate::settings::EngineSettings;
use crate::tracker::DecryptionRequestTracker;

/// The external ports the orchestrator talks to
#[derive(Clone)]
pub struct Collaborators {
    pub decryption: Arc<dyn IDecryptionService>,
    pub verifier: Arc<dyn IProofVerifier>,
    pub encryptor: Arc<dyn IEncryptor>,
    pub roles: Arc<dyn IRoleDirectory>,
    pub clock: Arc<dyn IClock>,
    pub events: Arc<dyn IEventSink>,
}

/// A closed decryption request that still owes its stake to the payer
struct PendingStake {
    request_id: RequestId,
    payer: Principal,
    stake: u64,
}

/// Aggregate view of the orchestrator state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerSummary {
    pub audits: usize,
    pub scheduled: usize,
    pub in_progress: usize,
    pub decryption_pending: usize,
    pub completed: usize,
    pub failed: usize,
    pub refunded: usize,
    pub outstanding_requests: usize,
    pub profiles: usize,
    pub total_refunds_owed: u128,
}

pub struct AuditOrchestrator {
    settings: EngineSettings,
    ports: Collaborators,
    ledger: AuditLedger,
    tracker: DecryptionRequestTracker,
    refunds: RefundLedger,
    profiles: ProfileRegistry,
    obfuscator: ValueObfuscator,
}

impl AuditOrchestrator {
    pub fn new(settings: EngineSettings, ports: Collaborators) -> Self {
        let obfuscator = ValueObfuscator::from_label(settings.seed_label());
        info!(
            timeout_secs = settings.timeout_secs(),
            min_stake = settings.min_stake(),
            max_stake = settings.max_stake(),
            "Audit orchestrator initialised"
        );
        Self {
            settings,
            ports,
            ledger: AuditLedger::new(),
            tracker: DecryptionRequestTracker::new(),
            refunds: RefundLedger::new(),
            profiles: ProfileRegistry::new(),
            obfuscator,
        }
    }

    /// Builds an orchestrator from a validated configuration
    pub fn from_config(config: &Config, ports: Collaborators) -> anyhow::Result<Self> {
        Ok(Self::new(EngineSettings::from_config(config)?, ports))
    }

    // ========================================================================
    // Guards
    // ========================================================================

    fn capabilities(&self, principal: &Principal) -> CapabilitySet {
        CapabilitySet::for_roles(&self.ports.roles.roles_of(principal))
    }

    fn require(&self, caller: &Principal, capability: Capability) -> Result<()> {
        self.capabilities(caller).require(caller, capability)
    }

    /// Returns the record if `caller` is its auditor
    fn own_audit(&self, caller: &Principal, id: AuditId, action: &str) -> Result<&AuditRecord> {
        self.require(caller, Capability::Audit)?;
        let record = self.ledger.get(id)?;
        if record.auditor() != caller {
            return Err(AuditError::Unauthorized {
                principal: caller.clone(),
                action: format!("{action} audit {id}"),
            });
        }
        Ok(record)
    }

    /// Checks that audit `id` has an open request and returns what it staked
    fn pending_stake(&self, id: AuditId) -> Result<PendingStake> {
        let request = self
            .tracker
            .current_for(id)
            .ok_or_else(|| AuditError::InvalidReference {
                kind: "decryption request",
                id: format!("for audit {id}"),
            })?;
        if request.is_completed() {
            return Err(AuditError::AlreadyCompleted(request.id()));
        }
        Ok(PendingStake {
            request_id: request.id(),
            payer: request.requester().clone(),
            stake: request.stake(),
        })
    }

    /// Credits the stake back and closes the request
    ///
    /// The credit is the only step that can fail, so it runs first.
    fn release_stake(&mut self, pending: &PendingStake, now: DateTime<Utc>) -> Result<()> {
        self.refunds.credit(&pending.payer, pending.stake)?;
        self.tracker.mark_expired(pending.request_id, now)
    }

    fn emit(&self, event: AuditEvent) {
        if let Err(e) = self.ports.events.publish(&event) {
            warn!(error = %e, event = event.name(), "Failed to publish audit event");
        }
    }

    fn emit_completion(&self, record: &AuditRecord, now: DateTime<Utc>) {
        let Some(tier) = record.risk_tier() else {
            return;
        };
        self.emit(AuditEvent::AuditCompleted {
            audit_id: record.id(),
            risk_tier: tier,
            at: now,
        });
        if record.remediation_required() {
            warn!(audit_id = %record.id(), auditee = %record.auditee(), risk_tier = %tier, "Compliance violation detected");
            self.emit(AuditEvent::ViolationDetected {
                audit_id: record.id(),
                auditee: record.auditee().clone(),
                risk_tier: tier,
                at: now,
            });
        }
    }

    // ========================================================================
    // Profiles
    // ========================================================================

    /// Registers or refreshes the compliance profile of `caller`
    ///
    /// The derived magnitude is obfuscated and encrypted before storage.
    /// A refresh keeps the stored compliance score once an audit has
    /// published one, and while an audit of `caller` waits for decryption.
    /// Returns true on first registration.
    pub fn register_profile(
        &mut self,
        caller: &Principal,
        submission: &ProfileSubmission,
    ) -> Result<bool> {
        let now = self.ports.clock.now();
        self.require(caller, Capability::ControlData)?;

        let mut obfuscator = self.obfuscator.clone();
        let obfuscated = obfuscator.obfuscate(submission.derived_magnitude, caller, now)?;
        let handle = self
            .ports
            .encryptor
            .encrypt(obfuscated.raw())
            .map_err(AuditError::collaborator)?;

        self.obfuscator = obfuscator;
        let keep_score = self.ledger.pending_for(caller).is_some();
        let first_registration = self
            .profiles
            .upsert(caller, submission, handle, keep_score, now);
        info!(controller = %caller, first_registration, "Compliance profile stored");
        self.emit(AuditEvent::ProfileRegistered {
            controller: caller.clone(),
            first_registration,
            at: now,
        });
        Ok(first_registration)
    }

    // ========================================================================
    // Audit lifecycle
    // ========================================================================

    /// Schedules an audit of `auditee` by `caller`
    pub fn schedule_audit(
        &mut self,
        caller: &Principal,
        auditee: &Principal,
        standard: AuditStandard,
    ) -> Result<AuditId> {
        let now = self.ports.clock.now();
        self.require(caller, Capability::Audit)?;
        let controller = self.capabilities(auditee).contains(Capability::ControlData);
        if !controller || !self.profiles.contains(auditee) {
            return Err(AuditError::unknown_entity(auditee));
        }

        let id = self
            .ledger
            .schedule(standard, caller.clone(), auditee.clone(), now)?;
        self.emit(AuditEvent::AuditScheduled {
            audit_id: id,
            auditor: caller.clone(),
            auditee: auditee.clone(),
            standard,
            at: now,
        });
        Ok(id)
    }

    pub fn start_audit(&mut self, caller: &Principal, id: AuditId) -> Result<()> {
        let now = self.ports.clock.now();
        self.own_audit(caller, id, "start")?;
        self.ledger.start(id, now)?;
        self.emit(AuditEvent::AuditStarted { audit_id: id, at: now });
        Ok(())
    }

    /// Stores encrypted findings and penalty for an audit in progress
    pub fn record_findings(
        &mut self,
        caller: &Principal,
        id: AuditId,
        findings: CiphertextHandle,
        penalty: CiphertextHandle,
    ) -> Result<()> {
        let now = self.ports.clock.now();
        self.own_audit(caller, id, "record findings for")?
            .ensure_status(AuditStatus::InProgress, "record findings for")?;

        self.ledger.record_findings(id, findings, penalty)?;
        self.emit(AuditEvent::FindingsRecorded { audit_id: id, at: now });
        Ok(())
    }

    /// Submits the findings, the penalty and the auditee's current score
    /// handle for decryption
    ///
    /// At most one audit per auditee waits for decryption at a time, so the
    /// score handle committed here stays the auditee's live score until the
    /// request settles. `stake` is paid by the caller. It is kept as the
    /// service fee when the callback succeeds and credited back otherwise.
    pub fn request_decryption(
        &mut self,
        caller: &Principal,
        id: AuditId,
        stake: u64,
    ) -> Result<RequestId> {
        let now = self.ports.clock.now();
        let record = self.own_audit(caller, id, "request decryption for")?;
        let auditee = record.auditee().clone();
        let score = self.profiles.get(&auditee)?.compliance_score();
        let handles = record.decryption_handles(score)?;
        if let Some(other) = self.ledger.pending_for(&auditee) {
            return Err(AuditError::WrongState {
                audit: other.id(),
                status: other.status(),
                operation: "request a second decryption for the auditee of",
            });
        }
        if !self.settings.stake_in_bounds(stake) {
            return Err(AuditError::OutOfRange {
                field: "stake",
                reason: format!(
                    "{stake} is outside [{}, {}]",
                    self.settings.min_stake(),
                    self.settings.max_stake()
                ),
            });
        }
        let request_id = self
            .ports
            .decryption
            .submit(&handles, DECRYPTION_CALLBACK)
            .map_err(AuditError::collaborator)?;

        self.tracker
            .register(request_id, id, caller.clone(), handles, stake, now)?;
        self.ledger.begin_decryption(id, score, now)?;
        info!(audit_id = %id, request_id = %request_id, stake, "Decryption requested");
        self.emit(AuditEvent::DecryptionRequested {
            audit_id: id,
            request_id,
            requester: caller.clone(),
            stake,
            at: now,
        });
        Ok(request_id)
    }

    /// Applies the decryption service's answer for `request_id`
    ///
    /// Open to any caller; authenticity comes from the proof. A rejected
    /// callback changes nothing, so the service may retry.
    pub fn apply_callback(
        &mut self,
        request_id: RequestId,
        cleartext: &[u8],
        proof: &DecryptionProof,
    ) -> Result<RevealedFindings> {
        let outcome = self.resolve_callback(request_id, cleartext, proof);
        if let Err(err) = &outcome {
            warn!(request_id = %request_id, error = %err, "Decryption callback rejected");
        }
        outcome
    }

    fn resolve_callback(
        &mut self,
        request_id: RequestId,
        cleartext: &[u8],
        proof: &DecryptionProof,
    ) -> Result<RevealedFindings> {
        let now = self.ports.clock.now();
        let audit_id = self.tracker.lookup_audit_for(request_id)?;
        debug!(request_id = %request_id, audit_id = %audit_id, "Callback resolved to audit");
        let record = self.ledger.get(audit_id)?;
        record.ensure_status(AuditStatus::DecryptionPending, "apply callback to")?;
        let auditee = record.auditee().clone();

        let request = self
            .tracker
            .get(request_id)
            .ok_or_else(|| AuditError::unknown_request(request_id))?;
        if !self
            .ports
            .verifier
            .verify(request_id, request.handles(), cleartext, proof)
        {
            return Err(AuditError::ProofInvalid(request_id));
        }
        let stake = request.stake();

        let decoded = DecryptedFindings::decode(cleartext)?;
        let tier = RiskTier::from_findings(decoded.findings);
        let score_after = ComplianceScoreAdjuster::adjusted(decoded.score, decoded.findings, tier);
        self.profiles.get(&auditee)?;
        let score_handle = self
            .ports
            .encryptor
            .encrypt(u64::from(score_after))
            .map_err(AuditError::collaborator)?;

        let revealed = RevealedFindings {
            findings_count: decoded.findings,
            penalty: decoded.penalty,
            score_before: Some(decoded.score),
            score_after: Some(score_after),
        };
        self.tracker.mark_completed(request_id, now)?;
        self.ledger.complete_with(audit_id, revealed, now)?;
        self.profiles
            .apply_score(&auditee, score_handle, score_after, now)?;
        info!(
            audit_id = %audit_id,
            request_id = %request_id,
            risk_tier = %tier,
            score_before = decoded.score,
            score_after,
            stake,
            "Decryption applied; stake retained as service fee"
        );

        self.emit(AuditEvent::DecryptionCompleted {
            audit_id,
            request_id,
            at: now,
        });
        self.emit(AuditEvent::ScoreUpdated {
            audit_id,
            auditee,
            previous: decoded.score,
            current: score_after,
            at: now,
        });
        let record = self.ledger.get(audit_id)?;
        self.emit_completion(record, now);
        Ok(revealed)
    }

    /// Expires a pending decryption whose deadline has passed
    ///
    /// Open to any caller. The stake is credited to whoever paid it.
    /// Returns the credited amount.
    pub fn timeout_expire(&mut self, caller: &Principal, id: AuditId) -> Result<u64> {
        let now = self.ports.clock.now();
        let record = self.ledger.get(id)?;
        record.ensure_status(AuditStatus::DecryptionPending, "expire")?;
        let deadline = self.pending_deadline(record)?;
        if now < deadline {
            return Err(AuditError::TimeoutNotReached { audit: id, deadline });
        }
        let pending = self.pending_stake(id)?;

        self.release_stake(&pending, now)?;
        self.ledger.refund(id, now)?;
        info!(
            audit_id = %id,
            request_id = %pending.request_id,
            triggered_by = %caller,
            refund = pending.stake,
            "Decryption timed out"
        );
        self.emit(AuditEvent::DecryptionTimedOut {
            audit_id: id,
            request_id: pending.request_id,
            at: now,
        });
        self.emit(AuditEvent::RefundIssued {
            audit_id: id,
            beneficiary: pending.payer,
            amount: pending.stake,
            at: now,
        });
        Ok(pending.stake)
    }

    /// Expires every outstanding request past its deadline
    ///
    /// Each expiry stands on its own; one failing does not stop the rest.
    pub fn expire_overdue(&mut self, caller: &Principal) -> Vec<(AuditId, Result<u64>)> {
        let now = self.ports.clock.now();
        let mut overdue: Vec<AuditId> = self
            .tracker
            .outstanding()
            .map(DecryptionRequest::audit_id)
            .filter(|id| self.deadline_for(*id).is_some_and(|deadline| now >= deadline))
            .collect();
        overdue.sort();
        debug!(count = overdue.len(), "Sweeping overdue decryption requests");
        overdue
            .into_iter()
            .map(|id| (id, self.timeout_expire(caller, id)))
            .collect()
    }

    /// Completes an audit in progress with a plaintext findings count
    ///
    /// No decryption takes place, so the auditee's score is left alone.
    pub fn complete_manually(
        &mut self,
        caller: &Principal,
        id: AuditId,
        findings_count: u32,
    ) -> Result<RiskTier> {
        let now = self.ports.clock.now();
        self.own_audit(caller, id, "complete")?;
        self.ledger.complete_manually(id, findings_count, now)?;

        let record = self.ledger.get(id)?;
        self.emit_completion(record, now);
        Ok(RiskTier::from_findings(findings_count))
    }

    /// Rejects a pending audit on behalf of a regulator
    ///
    /// The stake is credited back to the payer. Returns the credited amount.
    pub fn mark_failed(&mut self, caller: &Principal, id: AuditId, reason: &str) -> Result<u64> {
        let now = self.ports.clock.now();
        self.require(caller, Capability::Regulate)?;
        self.ledger
            .get(id)?
            .ensure_status(AuditStatus::DecryptionPending, "fail")?;
        let pending = self.pending_stake(id)?;

        self.release_stake(&pending, now)?;
        self.ledger.fail(id, reason, now)?;
        self.emit(AuditEvent::AuditFailed {
            audit_id: id,
            reason: reason.to_string(),
            at: now,
        });
        self.emit(AuditEvent::RefundIssued {
            audit_id: id,
            beneficiary: pending.payer,
            amount: pending.stake,
            at: now,
        });
        Ok(pending.stake)
    }

    // ========================================================================
    // Refunds
    // ========================================================================

    /// Pays out everything credited to `caller`
    pub fn withdraw_refund(&mut self, caller: &Principal) -> Result<u64> {
        let now = self.ports.clock.now();
        let amount = self.refunds.withdraw(caller)?;
        info!(beneficiary = %caller, amount, "Refund withdrawn");
        self.emit(AuditEvent::RefundWithdrawn {
            beneficiary: caller.clone(),
            amount,
            at: now,
        });
        Ok(amount)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    fn pending_deadline(&self, record: &AuditRecord) -> Result<DateTime<Utc>> {
        record
            .decryption_request_time()
            .zip(self.settings.timeout())
            .and_then(|(requested, timeout)| requested.checked_add_signed(timeout))
            .ok_or(AuditError::Overflow("decryption deadline"))
    }

    /// When audit `id` becomes expirable, if it is pending decryption
    pub fn deadline_for(&self, id: AuditId) -> Option<DateTime<Utc>> {
        let record = self.ledger.get(id).ok()?;
        if !record.status().is_pending_decryption() {
            return None;
        }
        self.pending_deadline(record).ok()
    }

    pub fn audit(&self, id: AuditId) -> Result<&AuditRecord> {
        self.ledger.get(id)
    }

    pub fn audits(&self) -> impl Iterator<Item = &AuditRecord> {
        self.ledger.records()
    }

    pub fn audits_of<'a>(&'a self, auditee: &'a Principal) -> impl Iterator<Item = &'a AuditRecord> {
        self.ledger.for_auditee(auditee)
    }

    pub fn request(&self, id: RequestId) -> Option<&DecryptionRequest> {
        self.tracker.get(id)
    }

    /// The latest decryption request issued for audit `id`
    pub fn current_request(&self, id: AuditId) -> Option<&DecryptionRequest> {
        self.tracker.current_for(id)
    }

    pub fn profile(&self, controller: &Principal) -> Result<&ComplianceProfile> {
        self.profiles.get(controller)
    }

    pub fn pending_refund(&self, user: &Principal) -> u64 {
        self.refunds.balance(user)
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn summary(&self) -> LedgerSummary {
        LedgerSummary {
            audits: self.ledger.len(),
            scheduled: self.ledger.count_in(AuditStatus::Scheduled),
            in_progress: self.ledger.count_in(AuditStatus::InProgress),
            decryption_pending: self.ledger.count_in(AuditStatus::DecryptionPending),
            completed: self.ledger.count_in(AuditStatus::Completed),
            failed: self.ledger.count_in(AuditStatus::Failed),
            refunded: self.ledger.count_in(AuditStatus::Refunded),
            outstanding_requests: self.tracker.outstanding().count(),
            profiles: self.profiles.len(),
            total_refunds_owed: self.refunds.total_owed(),
        }
    }
}

//! Shared harness: an orchestrator wired to the loopback adapters

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{Duration, Utc};
use veilaudit_core::domain::{
    AuditId, AuditStandard, DataCategories, Principal, ProfileSubmission, RequestId, Role,
};
use veilaudit_core::ports::{IEncryptor, IEventSink};
use veilaudit_engine::{AuditOrchestrator, Collaborators, EngineSettings};
use veilaudit_journal::EventJournal;
use veilaudit_loopback::{DigestProofVerifier, LoopbackCipher, ManualClock, StaticRoleDirectory};

pub const TIMEOUT_SECS: u64 = 3_600;

pub struct Harness {
    pub engine: AuditOrchestrator,
    pub cipher: Arc<LoopbackCipher>,
    pub roles: Arc<StaticRoleDirectory>,
    pub clock: Arc<ManualClock>,
    pub journal: Arc<EventJournal>,
    pub auditor: Principal,
    pub controller: Principal,
    pub regulator: Principal,
}

pub fn principal(name: &str) -> Principal {
    Principal::new(name).unwrap()
}

impl Harness {
    pub fn new() -> Self {
        let journal = Arc::new(EventJournal::new());
        Self::build(journal.clone(), journal)
    }

    /// Publishes events to `sink`; the journal field stays empty
    pub fn with_sink(sink: Arc<dyn IEventSink>) -> Self {
        Self::build(sink, Arc::new(EventJournal::new()))
    }

    fn build(events: Arc<dyn IEventSink>, journal: Arc<EventJournal>) -> Self {
        let cipher = Arc::new(LoopbackCipher::new());
        let roles = Arc::new(StaticRoleDirectory::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let auditor = principal("auditor-1");
        let controller = principal("acme-health");
        let regulator = principal("regulator");
        roles.grant(&auditor, Role::AuthorizedAuditor);
        roles.grant(&controller, Role::DataController);
        roles.grant(&regulator, Role::Regulator);

        let ports = Collaborators {
            decryption: cipher.clone(),
            verifier: Arc::new(DigestProofVerifier),
            encryptor: cipher.clone(),
            roles: roles.clone(),
            clock: clock.clone(),
            events,
        };
        let settings = EngineSettings::new(TIMEOUT_SECS).with_stake_bounds(1, 10_000);
        Self {
            engine: AuditOrchestrator::new(settings, ports),
            cipher,
            roles,
            clock,
            journal,
            auditor,
            controller,
            regulator,
        }
    }

    pub fn advance(&self, seconds: i64) {
        self.clock.advance(Duration::seconds(seconds));
    }

    /// A second data controller with its own profile slot
    pub fn add_controller(&self, name: &str) -> Principal {
        let controller = principal(name);
        self.roles.grant(&controller, Role::DataController);
        controller
    }

    /// Registers the controller with an encrypted compliance score
    pub fn register(&mut self, score: u64) {
        let controller = self.controller.clone();
        self.register_as(&controller, score);
    }

    pub fn register_as(&mut self, controller: &Principal, score: u64) {
        let submission = ProfileSubmission {
            data_points: self.cipher.encrypt(42_000).unwrap(),
            risk_score: self.cipher.encrypt(4).unwrap(),
            compliance_score: self.cipher.encrypt(score).unwrap(),
            derived_magnitude: 5_000,
            categories: DataCategories {
                personal: true,
                health: true,
                ..Default::default()
            },
        };
        self.engine
            .register_profile(controller, &submission)
            .unwrap();
    }

    /// Schedules and starts an audit with recorded findings
    pub fn in_progress_audit(&mut self, findings: u64, penalty: u64) -> AuditId {
        let controller = self.controller.clone();
        self.in_progress_audit_of(&controller, findings, penalty)
    }

    pub fn in_progress_audit_of(
        &mut self,
        controller: &Principal,
        findings: u64,
        penalty: u64,
    ) -> AuditId {
        let id = self
            .engine
            .schedule_audit(&self.auditor, controller, AuditStandard::Hipaa)
            .unwrap();
        self.engine.start_audit(&self.auditor, id).unwrap();
        let findings = self.cipher.encrypt(findings).unwrap();
        let penalty = self.cipher.encrypt(penalty).unwrap();
        self.engine
            .record_findings(&self.auditor, id, findings, penalty)
            .unwrap();
        id
    }

    /// An audit waiting for the decryption service
    pub fn pending_audit(&mut self, findings: u64, stake: u64) -> (AuditId, RequestId) {
        let controller = self.controller.clone();
        self.pending_audit_of(&controller, findings, stake)
    }

    pub fn pending_audit_of(
        &mut self,
        controller: &Principal,
        findings: u64,
        stake: u64,
    ) -> (AuditId, RequestId) {
        let id = self.in_progress_audit_of(controller, findings, findings * 1_000);
        let request = self
            .engine
            .request_decryption(&self.auditor, id, stake)
            .unwrap();
        (id, request)
    }

    /// Delivers the loopback service's genuine answer
    pub fn deliver(
        &mut self,
        request: RequestId,
    ) -> veilaudit_core::Result<veilaudit_core::domain::RevealedFindings> {
        let (cleartext, proof) = self.cipher.fulfil(request).unwrap();
        self.engine.apply_callback(request, &cleartext, &proof)
    }
}

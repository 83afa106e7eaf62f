//! Integration test: schedule -> start -> findings -> decryption -> callback
//!
//! Drives the orchestrator through the loopback cipher, which answers
//! decryption requests only when the test asks it to.

mod common;

use std::sync::Arc;

use common::{principal, Harness};
use veilaudit_core::domain::{
    cleartext::encode_words, AuditEvent, AuditStatus, DecryptionProof, RequestId, RequestState,
    RiskTier, Role,
};
use veilaudit_core::ports::IEventSink;
use veilaudit_core::AuditError;
use veilaudit_loopback::DigestProofVerifier;

#[test]
fn test_callback_completes_audit_and_reduces_score() {
    let mut h = Harness::new();
    h.register(90);
    let (id, request) = h.pending_audit(5, 500);
    h.advance(120);

    let revealed = h.deliver(request).unwrap();
    assert_eq!(revealed.findings_count, 5);
    assert_eq!(revealed.penalty, 5_000);
    assert_eq!(revealed.score_before, Some(90));
    assert_eq!(revealed.score_after, Some(65));

    let record = h.engine.audit(id).unwrap();
    assert_eq!(record.status(), AuditStatus::Completed);
    assert_eq!(record.risk_tier(), Some(RiskTier::Medium));
    assert!(!record.remediation_required());
    assert!(record.end_time().unwrap() >= record.start_time().unwrap());

    let profile = h.engine.profile(&h.controller).unwrap();
    assert_eq!(profile.published_score(), Some(65));
    assert_eq!(h.cipher.plaintext_of(&profile.compliance_score()), Some(65));

    // Stake is retained as the service fee
    assert_eq!(h.engine.pending_refund(&h.auditor), 0);
    assert_eq!(h.engine.request(request).unwrap().state(), RequestState::Completed);
}

#[test]
fn test_event_trail_for_completed_audit() {
    let mut h = Harness::new();
    h.register(90);
    let (id, request) = h.pending_audit(5, 500);
    h.deliver(request).unwrap();

    let names: Vec<String> = h
        .journal
        .for_audit(id)
        .into_iter()
        .map(|entry| entry.event_type)
        .collect();
    assert_eq!(
        names,
        vec![
            "audit_scheduled",
            "audit_started",
            "findings_recorded",
            "decryption_requested",
            "decryption_completed",
            "score_updated",
            "audit_completed",
        ]
    );
    assert_eq!(h.journal.count("violation_detected"), 0);
}

#[test]
fn test_score_change_and_summary_serialize() {
    let mut h = Harness::new();
    h.register(90);
    let (id, request) = h.pending_audit(5, 500);
    h.deliver(request).unwrap();

    let entry = h
        .journal
        .for_audit(id)
        .into_iter()
        .find(|entry| entry.event_type == "score_updated")
        .unwrap();
    assert_eq!(entry.details["previous"], 90);
    assert_eq!(entry.details["current"], 65);

    let summary = serde_json::to_value(h.engine.summary()).unwrap();
    assert_eq!(summary["completed"], 1);
    assert_eq!(summary["outstanding_requests"], 0);
    assert_eq!(summary["total_refunds_owed"], 0);
}

#[test]
fn test_high_risk_flags_remediation() {
    let mut h = Harness::new();
    h.register(80);
    let (id, request) = h.pending_audit(9, 100);
    h.deliver(request).unwrap();

    let record = h.engine.audit(id).unwrap();
    assert_eq!(record.risk_tier(), Some(RiskTier::High));
    assert!(record.remediation_required());
    assert_eq!(h.journal.count("violation_detected"), 1);
    // 9 findings at weight 10 exceed the score
    assert_eq!(h.engine.profile(&h.controller).unwrap().published_score(), Some(0));
}

#[test]
fn test_critical_reduction_is_capped() {
    let mut h = Harness::new();
    h.register(100);
    let (_, request) = h.pending_audit(20, 100);
    let revealed = h.deliver(request).unwrap();
    assert_eq!(revealed.score_after, Some(0));
}

#[test]
fn test_refresh_while_pending_keeps_committed_score() {
    let mut h = Harness::new();
    h.register(70);
    let (_, request) = h.pending_audit(2, 100);
    h.register(20);
    let revealed = h.deliver(request).unwrap();
    assert_eq!(revealed.score_before, Some(70));
    assert_eq!(revealed.score_after, Some(66));

    // The audited score survives a later refresh as well
    h.register(50);
    assert_eq!(h.engine.profile(&h.controller).unwrap().published_score(), Some(66));
    let (_, request) = h.pending_audit(1, 100);
    let revealed = h.deliver(request).unwrap();
    assert_eq!(revealed.score_before, Some(66));
    assert_eq!(revealed.score_after, Some(64));
}

#[test]
fn test_overlapping_audits_of_one_auditee_compound() {
    let mut h = Harness::new();
    h.register(90);
    let (first, first_request) = h.pending_audit(5, 100);
    let second = h.in_progress_audit(5, 5_000);
    let submitted = h.cipher.submissions();

    let err = h
        .engine
        .request_decryption(&h.auditor, second, 100)
        .unwrap_err();
    assert!(matches!(
        err,
        AuditError::WrongState {
            audit,
            status: AuditStatus::DecryptionPending,
            ..
        } if audit == first
    ));
    assert_eq!(h.engine.audit(second).unwrap().status(), AuditStatus::InProgress);
    assert!(h.engine.current_request(second).is_none());
    assert_eq!(h.cipher.submissions(), submitted);

    let revealed = h.deliver(first_request).unwrap();
    assert_eq!(revealed.score_after, Some(65));

    let second_request = h
        .engine
        .request_decryption(&h.auditor, second, 100)
        .unwrap();
    let revealed = h.deliver(second_request).unwrap();
    assert_eq!(revealed.score_before, Some(65));
    assert_eq!(revealed.score_after, Some(40));
    assert_eq!(h.engine.profile(&h.controller).unwrap().published_score(), Some(40));
}

#[test]
fn test_audits_of_different_auditees_may_overlap() {
    let mut h = Harness::new();
    h.register(90);
    let clinic = h.add_controller("north-clinic");
    h.register_as(&clinic, 60);
    let (_, acme_request) = h.pending_audit(5, 100);
    let (_, clinic_request) = h.pending_audit_of(&clinic, 1, 100);

    assert_eq!(h.deliver(clinic_request).unwrap().score_after, Some(58));
    assert_eq!(h.deliver(acme_request).unwrap().score_after, Some(65));
}

mod callback_rejection_tests {
    use super::*;

    #[test]
    fn test_invalid_proof_changes_nothing_and_retry_succeeds() {
        let mut h = Harness::new();
        h.register(90);
        let (id, request) = h.pending_audit(5, 500);
        let (cleartext, proof) = h.cipher.fulfil(request).unwrap();

        let forged = DecryptionProof::new(vec![0u8; 32]);
        assert_eq!(
            h.engine.apply_callback(request, &cleartext, &forged),
            Err(AuditError::ProofInvalid(request))
        );
        assert_eq!(h.engine.audit(id).unwrap().status(), AuditStatus::DecryptionPending);
        assert!(h.engine.request(request).unwrap().is_outstanding());
        assert!(h.engine.profile(&h.controller).unwrap().published_score().is_none());

        assert!(h.engine.apply_callback(request, &cleartext, &proof).is_ok());
        assert_eq!(h.engine.audit(id).unwrap().status(), AuditStatus::Completed);
    }

    #[test]
    fn test_tampered_cleartext_fails_proof() {
        let mut h = Harness::new();
        h.register(90);
        let (_, request) = h.pending_audit(5, 500);
        let (_, proof) = h.cipher.fulfil(request).unwrap();
        let lowered = encode_words(&[0, 0, 90]);
        assert_eq!(
            h.engine.apply_callback(request, &lowered, &proof),
            Err(AuditError::ProofInvalid(request))
        );
    }

    #[test]
    fn test_malformed_cleartext_is_out_of_range() {
        let mut h = Harness::new();
        h.register(90);
        let (id, request) = h.pending_audit(5, 500);
        let handles = *h.engine.request(request).unwrap().handles();
        let short = encode_words(&[5, 5_000]);
        let proof = DigestProofVerifier::prove(request, &handles, &short);

        let err = h.engine.apply_callback(request, &short, &proof).unwrap_err();
        assert!(matches!(err, AuditError::OutOfRange { field: "cleartext", .. }));
        assert_eq!(h.engine.audit(id).unwrap().status(), AuditStatus::DecryptionPending);
    }

    #[test]
    fn test_score_above_maximum_is_out_of_range() {
        let mut h = Harness::new();
        h.register(150);
        let (id, request) = h.pending_audit(1, 100);
        let err = h.deliver(request).unwrap_err();
        assert!(matches!(err, AuditError::OutOfRange { field: "score", .. }));
        assert_eq!(h.engine.audit(id).unwrap().status(), AuditStatus::DecryptionPending);
    }

    #[test]
    fn test_unknown_request_is_invalid_reference() {
        let mut h = Harness::new();
        let unknown = RequestId::new(999);
        assert_eq!(
            h.engine.apply_callback(unknown, &[], &DecryptionProof::new(Vec::new())),
            Err(AuditError::unknown_request(unknown))
        );
    }

    #[test]
    fn test_second_callback_is_already_completed() {
        let mut h = Harness::new();
        h.register(90);
        let (_, request) = h.pending_audit(5, 500);
        h.deliver(request).unwrap();
        assert_eq!(h.deliver(request), Err(AuditError::AlreadyCompleted(request)));
    }

    #[test]
    fn test_encryption_outage_during_callback_keeps_pending() {
        let mut h = Harness::new();
        h.register(90);
        let (id, request) = h.pending_audit(5, 500);
        let (cleartext, proof) = h.cipher.fulfil(request).unwrap();

        h.cipher.set_available(false);
        let err = h.engine.apply_callback(request, &cleartext, &proof).unwrap_err();
        assert!(matches!(err, AuditError::Collaborator(_)));
        assert_eq!(h.engine.audit(id).unwrap().status(), AuditStatus::DecryptionPending);
        assert!(h.engine.request(request).unwrap().is_outstanding());

        h.cipher.set_available(true);
        assert!(h.engine.apply_callback(request, &cleartext, &proof).is_ok());
    }
}

mod authorization_tests {
    use super::*;

    #[test]
    fn test_schedule_requires_auditor_role() {
        let mut h = Harness::new();
        h.register(90);
        let outsider = principal("outsider");
        let err = h
            .engine
            .schedule_audit(&outsider, &h.controller, veilaudit_core::domain::AuditStandard::Gdpr)
            .unwrap_err();
        assert!(matches!(err, AuditError::Unauthorized { .. }));
    }

    #[test]
    fn test_other_auditor_cannot_request_decryption() {
        let mut h = Harness::new();
        h.register(90);
        let id = h.in_progress_audit(3, 0);
        let rival = principal("auditor-2");
        h.roles.grant(&rival, Role::AuthorizedAuditor);

        let err = h.engine.request_decryption(&rival, id, 100).unwrap_err();
        assert!(matches!(err, AuditError::Unauthorized { .. }));
        assert_eq!(h.engine.audit(id).unwrap().status(), AuditStatus::InProgress);
        assert_eq!(h.cipher.submissions(), 0);
    }

    #[test]
    fn test_revoked_auditor_loses_access() {
        let mut h = Harness::new();
        h.register(90);
        let id = h.in_progress_audit(3, 0);
        h.roles.revoke(&h.auditor, Role::AuthorizedAuditor);
        assert!(matches!(
            h.engine.complete_manually(&h.auditor, id, 1),
            Err(AuditError::Unauthorized { .. })
        ));
    }

    #[test]
    fn test_owner_may_regulate() {
        let mut h = Harness::new();
        h.register(90);
        let (id, _) = h.pending_audit(3, 100);
        let owner = principal("owner");
        h.roles.grant(&owner, Role::Owner);
        assert_eq!(h.engine.mark_failed(&owner, id, "withdrawn").unwrap(), 100);
    }
}

mod manual_path_tests {
    use super::*;

    #[test]
    fn test_manual_completion_without_decryption() {
        let mut h = Harness::new();
        h.register(90);
        let id = h.in_progress_audit(0, 0);

        let tier = h.engine.complete_manually(&h.auditor, id, 12).unwrap();
        assert_eq!(tier, RiskTier::High);
        let record = h.engine.audit(id).unwrap();
        assert_eq!(record.status(), AuditStatus::Completed);
        assert!(record.remediation_required());
        assert!(record.decryption_request_time().is_none());
        assert_eq!(h.cipher.submissions(), 0);
        assert!(h.engine.profile(&h.controller).unwrap().published_score().is_none());
        assert_eq!(h.journal.count("violation_detected"), 1);
    }

    #[test]
    fn test_manual_completion_rejected_once_pending() {
        let mut h = Harness::new();
        h.register(90);
        let (id, _) = h.pending_audit(3, 100);
        assert!(matches!(
            h.engine.complete_manually(&h.auditor, id, 1),
            Err(AuditError::WrongState {
                status: AuditStatus::DecryptionPending,
                ..
            })
        ));
    }

    #[test]
    fn test_decryption_requires_recorded_findings() {
        let mut h = Harness::new();
        h.register(90);
        let id = h
            .engine
            .schedule_audit(&h.auditor, &h.controller, veilaudit_core::domain::AuditStandard::Ccpa)
            .unwrap();
        assert!(matches!(
            h.engine.request_decryption(&h.auditor, id, 100),
            Err(AuditError::WrongState {
                status: AuditStatus::Scheduled,
                ..
            })
        ));
        h.engine.start_audit(&h.auditor, id).unwrap();
        assert!(matches!(
            h.engine.request_decryption(&h.auditor, id, 100),
            Err(AuditError::WrongState {
                status: AuditStatus::InProgress,
                ..
            })
        ));
    }
}

mod event_sink_tests {
    use super::*;

    struct Offline;

    impl IEventSink for Offline {
        fn publish(&self, _event: &AuditEvent) -> anyhow::Result<()> {
            anyhow::bail!("event bus offline")
        }
    }

    #[test]
    fn test_failing_sink_does_not_abort_operations() {
        let mut h = Harness::with_sink(Arc::new(Offline));
        h.register(90);
        let (id, request) = h.pending_audit(5, 500);
        assert!(h.deliver(request).is_ok());
        assert_eq!(h.engine.audit(id).unwrap().status(), AuditStatus::Completed);
        assert!(h.journal.is_empty());
    }
}

//! DecryptionRequestTracker - joins asynchronous callbacks back to audits
//!
//! Each request carries its owning audit id, so resolving a callback is a
//! single map lookup. The tracker also indexes the current request of each
//! audit, which the timeout path needs; that index lives here and nowhere
//! else, so the audit record never stores a request id.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::debug;
use veilaudit_core::domain::{AuditId, CiphertextHandle, DecryptionRequest, Principal, RequestId};
use veilaudit_core::{AuditError, Result};

#[derive(Debug, Default)]
pub struct DecryptionRequestTracker {
    requests: HashMap<RequestId, DecryptionRequest>,
    current_by_audit: HashMap<AuditId, RequestId>,
}

impl DecryptionRequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a service-assigned request for `audit_id`
    ///
    /// # Errors
    ///
    /// Fails without recording anything if the id was issued before or the
    /// audit still has an outstanding request.
    pub fn register(
        &mut self,
        request_id: RequestId,
        audit_id: AuditId,
        requester: Principal,
        handles: [CiphertextHandle; 3],
        stake: u64,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if self.requests.contains_key(&request_id) {
            return Err(AuditError::Collaborator(format!(
                "decryption service reissued request id {request_id}"
            )));
        }
        if let Some(current) = self.current_for(audit_id) {
            if current.is_outstanding() {
                return Err(AuditError::Validation(format!(
                    "audit {audit_id} already has outstanding request {}",
                    current.id()
                )));
            }
        }
        self.requests.insert(
            request_id,
            DecryptionRequest::new(request_id, audit_id, requester, handles, stake, now),
        );
        self.current_by_audit.insert(audit_id, request_id);
        debug!(request_id = %request_id, audit_id = %audit_id, "Decryption request registered");
        Ok(())
    }

    /// Resolves a callback's request id to its audit
    ///
    /// # Errors
    ///
    /// `InvalidReference` for unknown ids, `AlreadyCompleted` once the
    /// request has been fulfilled. Expired requests still resolve so that
    /// the caller can report the audit's terminal status.
    pub fn lookup_audit_for(&self, request_id: RequestId) -> Result<AuditId> {
        let request = self
            .requests
            .get(&request_id)
            .ok_or_else(|| AuditError::unknown_request(request_id))?;
        if request.is_completed() {
            return Err(AuditError::AlreadyCompleted(request_id));
        }
        Ok(request.audit_id())
    }

    pub fn get(&self, request_id: RequestId) -> Option<&DecryptionRequest> {
        self.requests.get(&request_id)
    }

    /// The most recent request issued for `audit_id`
    pub fn current_for(&self, audit_id: AuditId) -> Option<&DecryptionRequest> {
        self.current_by_audit
            .get(&audit_id)
            .and_then(|id| self.requests.get(id))
    }

    fn request_mut(&mut self, request_id: RequestId) -> Result<&mut DecryptionRequest> {
        self.requests
            .get_mut(&request_id)
            .ok_or_else(|| AuditError::unknown_request(request_id))
    }

    pub fn mark_completed(&mut self, request_id: RequestId, now: DateTime<Utc>) -> Result<()> {
        self.request_mut(request_id)?.complete(now)?;
        debug!(request_id = %request_id, "Decryption request completed");
        Ok(())
    }

    pub fn mark_expired(&mut self, request_id: RequestId, now: DateTime<Utc>) -> Result<()> {
        self.request_mut(request_id)?.expire(now)?;
        debug!(request_id = %request_id, "Decryption request expired");
        Ok(())
    }

    /// Requests still waiting for the service
    pub fn outstanding(&self) -> impl Iterator<Item = &DecryptionRequest> {
        self.requests.values().filter(|r| r.is_outstanding())
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

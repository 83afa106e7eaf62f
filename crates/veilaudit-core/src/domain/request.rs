//! DecryptionRequest domain entity
//!
//! A request is born when an auditor asks the decryption service to reveal
//! an audit's committed handles, and it carries everything the second half
//! of the round-trip needs: the owning audit, the payer, the stake and the
//! handles the proof must match.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::{AuditError, Result};
use super::newtypes::{AuditId, CiphertextHandle, Principal, RequestId};

/// Lifecycle of a decryption request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestState {
    /// Waiting for the service to answer
    #[default]
    Outstanding,
    /// The service answered and the answer was applied
    Completed,
    /// Abandoned because its audit timed out or failed
    Expired,
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RequestState::Outstanding => "outstanding",
            RequestState::Completed => "completed",
            RequestState::Expired => "expired",
        };
        f.write_str(s)
    }
}

/// An issued decryption request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptionRequest {
    id: RequestId,
    audit_id: AuditId,
    requester: Principal,
    handles: [CiphertextHandle; 3],
    stake: u64,
    issued_at: DateTime<Utc>,
    state: RequestState,
    closed_at: Option<DateTime<Utc>>,
}

impl DecryptionRequest {
    pub fn new(
        id: RequestId,
        audit_id: AuditId,
        requester: Principal,
        handles: [CiphertextHandle; 3],
        stake: u64,
        issued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            audit_id,
            requester,
            handles,
            stake,
            issued_at,
            state: RequestState::Outstanding,
            closed_at: None,
        }
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn audit_id(&self) -> AuditId {
        self.audit_id
    }

    /// The payer whose stake backs this request
    pub fn requester(&self) -> &Principal {
        &self.requester
    }

    pub fn handles(&self) -> &[CiphertextHandle; 3] {
        &self.handles
    }

    pub fn stake(&self) -> u64 {
        self.stake
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    pub fn closed_at(&self) -> Option<DateTime<Utc>> {
        self.closed_at
    }

    pub fn is_completed(&self) -> bool {
        self.state == RequestState::Completed
    }

    pub fn is_outstanding(&self) -> bool {
        self.state == RequestState::Outstanding
    }

    fn close(&mut self, target: RequestState, now: DateTime<Utc>) -> Result<()> {
        match self.state {
            RequestState::Outstanding => {
                self.state = target;
                self.closed_at = Some(now);
                Ok(())
            }
            RequestState::Completed => Err(AuditError::AlreadyCompleted(self.id)),
            RequestState::Expired => Err(AuditError::Validation(format!(
                "decryption request {} already expired",
                self.id
            ))),
        }
    }

    /// Outstanding -> Completed
    pub fn complete(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.close(RequestState::Completed, now)
    }

    /// Outstanding -> Expired
    pub fn expire(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.close(RequestState::Expired, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_request() -> DecryptionRequest {
        DecryptionRequest::new(
            RequestId::new(900),
            AuditId::new(3),
            Principal::new("auditor").unwrap(),
            [CiphertextHandle::from_bytes([7; 32]); 3],
            250,
            Utc::now(),
        )
    }

    #[test]
    fn test_new_request_is_outstanding() {
        let request = create_test_request();
        assert!(request.is_outstanding());
        assert!(!request.is_completed());
        assert!(request.closed_at().is_none());
        assert_eq!(request.stake(), 250);
    }

    #[test]
    fn test_completion_is_terminal() {
        let mut request = create_test_request();
        request.complete(Utc::now()).unwrap();
        assert!(request.is_completed());
        assert_eq!(
            request.complete(Utc::now()),
            Err(AuditError::AlreadyCompleted(RequestId::new(900)))
        );
        assert_eq!(
            request.expire(Utc::now()),
            Err(AuditError::AlreadyCompleted(RequestId::new(900)))
        );
        assert_eq!(request.state(), RequestState::Completed);
    }

    #[test]
    fn test_expired_request_cannot_complete() {
        let mut request = create_test_request();
        request.expire(Utc::now()).unwrap();
        assert!(request.complete(Utc::now()).is_err());
        assert_eq!(request.state(), RequestState::Expired);
    }
}

//! Domain error types
//!
//! Every guarded operation fails with exactly one of these variants and
//! leaves all entities as they were before the call.

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::audit::AuditStatus;
use super::newtypes::{AuditId, Principal, RequestId};

/// Result alias used throughout the core and engine crates
pub type Result<T> = std::result::Result<T, AuditError>;

/// Errors that can occur in audit operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuditError {
    /// The caller does not hold the capability the operation requires
    #[error("{principal} is not authorized to {action}")]
    Unauthorized {
        /// The rejected caller
        principal: Principal,
        /// What the caller attempted
        action: String,
    },

    /// No audit, request or entity exists with the given identifier
    #[error("Unknown {kind}: {id}")]
    InvalidReference {
        /// Kind of entity that was looked up
        kind: &'static str,
        /// The identifier that failed to resolve
        id: String,
    },

    /// An input violates a declared bound
    #[error("{field} out of range: {reason}")]
    OutOfRange {
        /// Name of the offending input
        field: &'static str,
        /// Human-readable explanation
        reason: String,
    },

    /// The operation is not valid for the audit's current status
    #[error("Cannot {operation} audit {audit} in status {status}")]
    WrongState {
        /// The audit the operation targeted
        audit: AuditId,
        /// The audit's status at the time of the call
        status: AuditStatus,
        /// The rejected operation
        operation: &'static str,
    },

    /// The proof verifier rejected the decryption result
    #[error("Decryption proof rejected for request {0}")]
    ProofInvalid(RequestId),

    /// An arithmetic result would exceed its representable range
    #[error("Arithmetic overflow in {0}")]
    Overflow(&'static str),

    /// The user has no pending refund to withdraw
    #[error("Nothing to withdraw for {0}")]
    NothingToWithdraw(Principal),

    /// The decryption deadline has not passed yet
    #[error("Timeout for audit {audit} not reached until {deadline}")]
    TimeoutNotReached {
        /// The audit whose request is still within its window
        audit: AuditId,
        /// Earliest instant at which expiry is allowed
        deadline: DateTime<Utc>,
    },

    /// The decryption request has already been fulfilled
    #[error("Decryption request {0} already completed")]
    AlreadyCompleted(RequestId),

    /// An external collaborator failed before any state was changed
    #[error("Collaborator failure: {0}")]
    Collaborator(String),

    /// A newtype rejected its raw input
    #[error("Validation failed: {0}")]
    Validation(String),
}

impl AuditError {
    /// Unknown audit id
    pub fn unknown_audit(id: AuditId) -> Self {
        AuditError::InvalidReference {
            kind: "audit",
            id: id.to_string(),
        }
    }

    /// Unknown decryption request id
    pub fn unknown_request(id: RequestId) -> Self {
        AuditError::InvalidReference {
            kind: "decryption request",
            id: id.to_string(),
        }
    }

    /// Entity without a registered compliance profile
    pub fn unknown_entity(principal: &Principal) -> Self {
        AuditError::InvalidReference {
            kind: "entity",
            id: principal.to_string(),
        }
    }

    /// Wraps an adapter error raised by a port
    pub fn collaborator(err: anyhow::Error) -> Self {
        AuditError::Collaborator(format!("{err:#}"))
    }

    /// Stable machine-readable code for the error kind
    pub fn code(&self) -> &'static str {
        match self {
            AuditError::Unauthorized { .. } => "unauthorized",
            AuditError::InvalidReference { .. } => "invalid_reference",
            AuditError::OutOfRange { .. } => "out_of_range",
            AuditError::WrongState { .. } => "wrong_state",
            AuditError::ProofInvalid(_) => "proof_invalid",
            AuditError::Overflow(_) => "overflow",
            AuditError::NothingToWithdraw(_) => "nothing_to_withdraw",
            AuditError::TimeoutNotReached { .. } => "timeout_not_reached",
            AuditError::AlreadyCompleted(_) => "already_completed",
            AuditError::Collaborator(_) => "collaborator",
            AuditError::Validation(_) => "validation",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AuditError::WrongState {
            audit: AuditId::new(7),
            status: AuditStatus::Refunded,
            operation: "apply callback to",
        };
        assert_eq!(
            err.to_string(),
            "Cannot apply callback to audit 7 in status refunded"
        );

        let err = AuditError::unknown_request(RequestId::new(42));
        assert_eq!(err.to_string(), "Unknown decryption request: 42");

        let err = AuditError::Overflow("refund credit");
        assert_eq!(err.to_string(), "Arithmetic overflow in refund credit");
    }

    #[test]
    fn test_collaborator_keeps_context_chain() {
        let inner = anyhow::anyhow!("connection refused").context("submit decryption");
        let err = AuditError::collaborator(inner);
        assert_eq!(
            err,
            AuditError::Collaborator("submit decryption: connection refused".to_string())
        );
    }

    #[test]
    fn test_codes_are_distinct() {
        let errors = [
            AuditError::ProofInvalid(RequestId::new(1)),
            AuditError::AlreadyCompleted(RequestId::new(1)),
            AuditError::Overflow("x"),
            AuditError::unknown_audit(AuditId::new(1)),
        ];
        let codes: std::collections::HashSet<_> = errors.iter().map(|e| e.code()).collect();
        assert_eq!(codes.len(), errors.len());
    }
}

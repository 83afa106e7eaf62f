//! Cryptographic service ports (driven/secondary ports)
//!
//! Producing ciphertexts, decrypting them and proving the decryption are
//! delegated to an external service. The core only decides when those
//! operations happen and on whose behalf.
//!
//! ## Design Notes
//!
//! - `submit` and `encrypt` use `anyhow::Result` because transport failures
//!   are adapter-specific; the engine maps them to
//!   [`AuditError::Collaborator`](crate::AuditError::Collaborator) before
//!   any state changes.
//! - The service answers a submission at most once, at an unspecified
//!   later time, by invoking the callback named in [`DECRYPTION_CALLBACK`].
//! - `verify` is a plain predicate; a `false` answer leaves the request
//!   outstanding so the service may retry with a corrected proof.

use crate::domain::{CiphertextHandle, DecryptionProof, RequestId};

/// Entry point the decryption service calls back with its result
pub const DECRYPTION_CALLBACK: &str = "apply_decryption_callback";

/// Port trait for the asynchronous decryption service
pub trait IDecryptionService: Send + Sync {
    /// Queues `handles` for decryption and returns the service-assigned id
    ///
    /// # Arguments
    /// * `handles` - Ciphertext handles to reveal, in the order the cleartext will use
    /// * `callback` - Name of the entry point to deliver the result to
    fn submit(&self, handles: &[CiphertextHandle], callback: &str) -> anyhow::Result<RequestId>;
}

/// Port trait for checking decryption proofs
pub trait IProofVerifier: Send + Sync {
    /// Returns true if `proof` shows that `cleartext` is the decryption of
    /// `handles` for `request_id`
    fn verify(
        &self,
        request_id: RequestId,
        handles: &[CiphertextHandle],
        cleartext: &[u8],
        proof: &DecryptionProof,
    ) -> bool;
}

/// Port trait for committing plaintext values as ciphertexts
pub trait IEncryptor: Send + Sync {
    /// Encrypts `value` and returns a handle to the new ciphertext
    fn encrypt(&self, value: u64) -> anyhow::Result<CiphertextHandle>;
}

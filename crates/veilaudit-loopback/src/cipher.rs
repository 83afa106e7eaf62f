//! LoopbackCipher - a decryption service that lives in memory
//!
//! "Encryption" mints an opaque handle and remembers the plaintext behind
//! it. Submitted decryption requests are answered only when a test or the
//! simulator calls [`LoopbackCipher::fulfil`], which mirrors the real
//! service answering at some later, unknown time.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, bail, Context};
use sha2::{Digest, Sha256};
use veilaudit_core::domain::cleartext::encode_words;
use veilaudit_core::domain::{CiphertextHandle, DecryptionProof, RequestId};
use veilaudit_core::ports::{IDecryptionService, IEncryptor, IProofVerifier};

const HANDLE_DOMAIN: &[u8] = b"veilaudit-loopback-handle";
const PROOF_DOMAIN: &[u8] = b"veilaudit-loopback-proof";

#[derive(Debug)]
struct CipherState {
    plaintexts: HashMap<CiphertextHandle, u64>,
    submissions: HashMap<RequestId, Vec<CiphertextHandle>>,
    minted: u64,
    last_request: u64,
    available: bool,
}

/// In-memory encryptor and decryption service
#[derive(Debug)]
pub struct LoopbackCipher {
    state: Mutex<CipherState>,
}

impl Default for LoopbackCipher {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackCipher {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(CipherState {
                plaintexts: HashMap::new(),
                submissions: HashMap::new(),
                minted: 0,
                last_request: 0,
                available: true,
            }),
        }
    }

    fn lock(&self) -> anyhow::Result<MutexGuard<'_, CipherState>> {
        self.state
            .lock()
            .map_err(|_| anyhow!("loopback cipher lock poisoned"))
    }

    /// Makes every port call fail until re-enabled
    pub fn set_available(&self, available: bool) {
        if let Ok(mut state) = self.lock() {
            state.available = available;
        }
    }

    /// Plaintext behind `handle`, if this cipher minted it
    pub fn plaintext_of(&self, handle: &CiphertextHandle) -> Option<u64> {
        self.lock().ok()?.plaintexts.get(handle).copied()
    }

    /// Number of decryption requests received so far
    pub fn submissions(&self) -> usize {
        self.lock().map(|s| s.submissions.len()).unwrap_or(0)
    }

    /// Produces the cleartext and proof the service would deliver
    ///
    /// The cleartext holds one big-endian word per submitted handle.
    pub fn fulfil(&self, request_id: RequestId) -> anyhow::Result<(Vec<u8>, DecryptionProof)> {
        let state = self.lock()?;
        let handles = state
            .submissions
            .get(&request_id)
            .with_context(|| format!("no decryption request {request_id} was submitted"))?;
        let words = handles
            .iter()
            .map(|h| {
                state
                    .plaintexts
                    .get(h)
                    .copied()
                    .with_context(|| format!("handle {} was not minted here", h.short()))
            })
            .collect::<anyhow::Result<Vec<u64>>>()?;
        let cleartext = encode_words(&words);
        let proof = DigestProofVerifier::prove(request_id, handles, &cleartext);
        tracing::debug!(request_id = %request_id, handles = handles.len(), "Loopback decryption fulfilled");
        Ok((cleartext, proof))
    }
}

impl IEncryptor for LoopbackCipher {
    fn encrypt(&self, value: u64) -> anyhow::Result<CiphertextHandle> {
        let mut state = self.lock()?;
        if !state.available {
            bail!("loopback cipher is unavailable");
        }
        state.minted += 1;
        let mut hasher = Sha256::new();
        hasher.update(HANDLE_DOMAIN);
        hasher.update(state.minted.to_be_bytes());
        hasher.update(value.to_be_bytes());
        let handle = CiphertextHandle::from_bytes(hasher.finalize().into());
        state.plaintexts.insert(handle, value);
        Ok(handle)
    }
}

impl IDecryptionService for LoopbackCipher {
    fn submit(&self, handles: &[CiphertextHandle], callback: &str) -> anyhow::Result<RequestId> {
        let mut state = self.lock()?;
        if !state.available {
            bail!("loopback decryption service is unavailable");
        }
        let next = state
            .last_request
            .checked_add(1)
            .context("loopback request ids exhausted")?;
        state.last_request = next;
        let request_id = RequestId::new(next);
        state.submissions.insert(request_id, handles.to_vec());
        tracing::debug!(request_id = %request_id, callback, "Loopback decryption submitted");
        Ok(request_id)
    }
}

/// Accepts proofs that are a SHA-256 digest over the request
///
/// The digest covers the request id, the submitted handles in order and
/// the cleartext, so changing any of them invalidates the proof.
#[derive(Debug, Clone, Copy, Default)]
pub struct DigestProofVerifier;

impl DigestProofVerifier {
    pub fn prove(
        request_id: RequestId,
        handles: &[CiphertextHandle],
        cleartext: &[u8],
    ) -> DecryptionProof {
        let mut hasher = Sha256::new();
        hasher.update(PROOF_DOMAIN);
        hasher.update(request_id.get().to_be_bytes());
        for handle in handles {
            hasher.update(handle.as_bytes());
        }
        hasher.update(cleartext);
        DecryptionProof::new(hasher.finalize().to_vec())
    }
}

impl IProofVerifier for DigestProofVerifier {
    fn verify(
        &self,
        request_id: RequestId,
        handles: &[CiphertextHandle],
        cleartext: &[u8],
        proof: &DecryptionProof,
    ) -> bool {
        Self::prove(request_id, handles, cleartext).as_bytes() == proof.as_bytes()
    }
}

//! Value obfuscation
//!
//! Scales a plaintext magnitude by a pseudo-random factor in the 80%–120%
//! band before it is encrypted, so that derived values committed for the
//! same input cannot be matched by frequency or repetition.
//!
//! The result is fixed-point with [`BASE_UNIT`] fractional steps: for an
//! input `v` the raw output lies in `[0.8·v·K, 1.2·v·K]` and
//! [`ObfuscatedValue::to_whole`] rescales it back to whole units.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::errors::{AuditError, Result};
use super::newtypes::Principal;

/// Fixed-point scale of obfuscated values
pub const BASE_UNIT: u64 = 10_000;

/// Lowest multiplier, 80% of the base unit
const BAND_LOW: u64 = BASE_UNIT * 8 / 10;

/// Highest multiplier, 120% of the base unit
const BAND_HIGH: u64 = BASE_UNIT * 12 / 10;

/// A magnitude after obfuscation, in units of `1 / BASE_UNIT`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObfuscatedValue(u64);

impl ObfuscatedValue {
    /// The scaled magnitude
    pub fn raw(&self) -> u64 {
        self.0
    }

    /// Rescales by the base unit, truncating the fraction
    pub fn to_whole(&self) -> u64 {
        self.0 / BASE_UNIT
    }
}

/// Stateful obfuscator with an evolving seed
///
/// Every successful call replaces the seed with
/// `SHA-256(seed ‖ time ‖ caller)` before deriving the multiplier. A call
/// that fails leaves the seed untouched.
#[derive(Debug, Clone)]
pub struct ValueObfuscator {
    seed: [u8; 32],
}

impl ValueObfuscator {
    /// Creates an obfuscator from an explicit initial seed
    pub fn new(seed: [u8; 32]) -> Self {
        Self { seed }
    }

    /// Creates an obfuscator whose initial seed is the digest of `label`
    pub fn from_label(label: &str) -> Self {
        Self::new(Sha256::digest(label.as_bytes()).into())
    }

    fn next_seed(&self, caller: &Principal, now: DateTime<Utc>) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.seed);
        hasher.update(now.timestamp().to_be_bytes());
        hasher.update(now.timestamp_subsec_nanos().to_be_bytes());
        hasher.update(caller.as_str().as_bytes());
        hasher.finalize().into()
    }

    fn multiplier(seed: &[u8; 32]) -> u64 {
        let mut word = [0u8; 8];
        word.copy_from_slice(&seed[..8]);
        BAND_LOW + u64::from_be_bytes(word) % (BAND_HIGH - BAND_LOW + 1)
    }

    /// Obfuscates `value` on behalf of `caller`
    ///
    /// # Errors
    ///
    /// Returns `AuditError::Overflow` if the scaled value does not fit in a `u64`.
    pub fn obfuscate(
        &mut self,
        value: u64,
        caller: &Principal,
        now: DateTime<Utc>,
    ) -> Result<ObfuscatedValue> {
        let seed = self.next_seed(caller, now);
        let raw = value
            .checked_mul(Self::multiplier(&seed))
            .ok_or(AuditError::Overflow("value obfuscation"))?;
        self.seed = seed;
        Ok(ObfuscatedValue(raw))
    }
}

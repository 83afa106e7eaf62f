//! Cleartext layout of a decryption result
//!
//! The decryption service reveals the committed handles as consecutive
//! big-endian `u64` words, one per handle, in commit order. For an audit
//! that is findings count, penalty, compliance score.

use super::errors::{AuditError, Result};
use super::scoring::ComplianceScoreAdjuster;

/// Bytes per revealed value
pub const WORD_LEN: usize = 8;

/// Concatenates `words` as big-endian `u64`s
pub fn encode_words(words: &[u64]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_be_bytes()).collect()
}

/// Splits `bytes` into exactly `N` big-endian words
pub fn decode_words<const N: usize>(bytes: &[u8]) -> Result<[u64; N]> {
    if bytes.len() != N * WORD_LEN {
        return Err(AuditError::OutOfRange {
            field: "cleartext",
            reason: format!("expected {} bytes, got {}", N * WORD_LEN, bytes.len()),
        });
    }
    let mut words = [0u64; N];
    for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(WORD_LEN)) {
        let mut buf = [0u8; WORD_LEN];
        buf.copy_from_slice(chunk);
        *word = u64::from_be_bytes(buf);
    }
    Ok(words)
}

/// The three values revealed for an audit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecryptedFindings {
    pub findings: u32,
    pub penalty: u64,
    pub score: u32,
}

impl DecryptedFindings {
    /// Decodes and range-checks a callback cleartext
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let [findings, penalty, score] = decode_words::<3>(bytes)?;
        let findings = u32::try_from(findings).map_err(|_| AuditError::OutOfRange {
            field: "findings",
            reason: format!("{findings} exceeds {}", u32::MAX),
        })?;
        let score = u32::try_from(score)
            .ok()
            .filter(|s| *s <= ComplianceScoreAdjuster::MAX_SCORE)
            .ok_or_else(|| AuditError::OutOfRange {
                field: "score",
                reason: format!(
                    "{score} exceeds maximum score {}",
                    ComplianceScoreAdjuster::MAX_SCORE
                ),
            })?;
        Ok(Self {
            findings,
            penalty,
            score,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        encode_words(&[u64::from(self.findings), self.penalty, u64::from(self.score)])
    }
}

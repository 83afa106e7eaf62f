//! Domain newtypes with validation
//!
//! Strongly-typed wrappers for identifiers, caller identities and the
//! opaque ciphertext material that flows through the core.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::AuditError;

// ============================================================================
// Numeric identifiers
// ============================================================================

/// Identifier of an audit record
///
/// Issued by the audit ledger from a monotonically increasing counter;
/// never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditId(u64);

impl AuditId {
    /// Wrap a raw audit number
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw audit number
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl Display for AuditId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AuditId {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>()
            .map(Self)
            .map_err(|e| AuditError::Validation(format!("Invalid AuditId '{s}': {e}")))
    }
}

/// Identifier of a decryption request
///
/// Assigned by the external decryption service, opaque to the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(u64);

impl RequestId {
    /// Wrap a service-assigned request number
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw request number
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RequestId {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>()
            .map(Self)
            .map_err(|e| AuditError::Validation(format!("Invalid RequestId '{s}': {e}")))
    }
}

// ============================================================================
// Principal
// ============================================================================

/// Maximum length of a principal identifier
const MAX_PRINCIPAL_LEN: usize = 128;

/// A caller identity as supplied by the identity source
///
/// Accepts ASCII alphanumerics plus `-`, `_`, `.`, `:` and `@`, which covers
/// account addresses, service names and email-like identities.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Principal(String);

impl Principal {
    /// Create a new validated Principal
    ///
    /// # Errors
    /// Returns `AuditError::Validation` if the identity is empty, too long,
    /// or contains characters outside the allowed set
    pub fn new(raw: impl Into<String>) -> Result<Self, AuditError> {
        let raw = raw.into();
        Self::validate(&raw)?;
        Ok(Self(raw))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(raw: &str) -> Result<(), AuditError> {
        if raw.is_empty() {
            return Err(AuditError::Validation(
                "Principal cannot be empty".to_string(),
            ));
        }
        if raw.len() > MAX_PRINCIPAL_LEN {
            return Err(AuditError::Validation(format!(
                "Principal too long (max {MAX_PRINCIPAL_LEN} chars): {raw}"
            )));
        }
        if let Some(c) = raw
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':' | '@')))
        {
            return Err(AuditError::Validation(format!(
                "Principal contains invalid character {c:?}: {raw}"
            )));
        }
        Ok(())
    }
}

impl Display for Principal {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Principal {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Principal {
    type Error = AuditError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Principal> for String {
    fn from(value: Principal) -> Self {
        value.0
    }
}

// ============================================================================
// Ciphertext material
// ============================================================================

/// Opaque reference to an encrypted value
///
/// The core never interprets the bytes; it only stores, copies and commits
/// handles. Serialized as 64 lowercase hex characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CiphertextHandle([u8; 32]);

impl CiphertextHandle {
    /// Wrap raw handle bytes
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw handle bytes
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Short prefix used in log lines
    #[must_use]
    pub fn short(&self) -> String {
        self.to_string()[..12].to_string()
    }
}

impl Display for CiphertextHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl FromStr for CiphertextHandle {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 64 || !s.is_ascii() {
            return Err(AuditError::Validation(format!(
                "Ciphertext handle must be 64 hex characters: {s}"
            )));
        }
        let mut bytes = [0u8; 32];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16).map_err(|e| {
                AuditError::Validation(format!("Invalid ciphertext handle '{s}': {e}"))
            })?;
        }
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for CiphertextHandle {
    type Error = AuditError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CiphertextHandle> for String {
    fn from(value: CiphertextHandle) -> Self {
        value.to_string()
    }
}

/// Proof returned by the decryption service alongside a cleartext
///
/// The format belongs to the proof verifier; the core passes it through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DecryptionProof(Vec<u8>);

impl DecryptionProof {
    /// Wrap raw proof bytes
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Get the raw proof bytes
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns true if the proof carries no bytes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

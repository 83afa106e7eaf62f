//! Domain entities and business logic
//!
//! This module contains the core domain types for Veilaudit:
//! - Newtypes for identifiers, principals and ciphertext handles
//! - The audit record and its state machine
//! - Decryption requests and their lifecycle
//! - Compliance profiles owned by data controllers
//! - Roles and capabilities
//! - Observable events
//! - The cleartext layout of decryption results
//! - The score adjustment and value obfuscation algorithms
//! - The error taxonomy

pub mod access;
pub mod audit;
pub mod cleartext;
pub mod errors;
pub mod events;
pub mod newtypes;
pub mod obfuscation;
pub mod profile;
pub mod request;
pub mod scoring;

// Re-export commonly used types
pub use access::{Capability, CapabilitySet, Role};
pub use audit::{AuditRecord, AuditStandard, AuditStatus, RevealedFindings, RiskTier};
pub use cleartext::DecryptedFindings;
pub use errors::AuditError;
pub use events::AuditEvent;
pub use newtypes::*;
pub use obfuscation::{ObfuscatedValue, ValueObfuscator};
pub use profile::{ComplianceProfile, DataCategories, ProfileSubmission};
pub use request::{DecryptionRequest, RequestState};
pub use scoring::ComplianceScoreAdjuster;

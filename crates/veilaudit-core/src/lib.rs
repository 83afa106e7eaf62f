//! Veilaudit Core - Domain logic for confidential compliance audits
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `AuditRecord`, `DecryptionRequest`, `ComplianceProfile`, `AuditEvent`
//! - **Algorithms** - `ValueObfuscator` and `ComplianceScoreAdjuster`
//! - **Port definitions** - Traits for collaborators: `IDecryptionService`, `IProofVerifier`,
//!   `IEncryptor`, `IRoleDirectory`, `IClock`, `IEventSink`
//! - **Configuration** - YAML-backed settings with validation
//!
//! # Architecture
//!
//! The domain module holds pure business rules with no knowledge of how
//! ciphertexts are produced or decrypted. Ports define the trait interfaces
//! that adapter crates implement; the engine crate wires them together.

pub mod config;
pub mod domain;
pub mod ports;

pub use domain::errors::{AuditError, Result};

//! Veilaudit Engine - audit orchestration over encrypted findings
//!
//! Keeps the audit ledger, the outstanding decryption requests, the pending
//! refunds and the compliance profiles, and exposes the guarded operations
//! that move audits through their lifecycle. External systems are reached
//! only through the ports in [`veilaudit_core::ports`].
//!
//! ## Modules
//!
//! - [`ledger`] - Audit records and their transitions
//! - [`tracker`] - Decryption requests and callback resolution
//! - [`refunds`] - Pending compensation per principal
//! - [`profiles`] - Compliance profiles per controller
//! - [`settings`] - Runtime settings derived from configuration
//! - [`orchestrator`] - The guarded operations

pub mod ledger;
pub mod orchestrator;
pub mod profiles;
pub mod refunds;
pub mod settings;
pub mod tracker;

pub use orchestrator::{AuditOrchestrator, Collaborators, LedgerSummary};
pub use settings::EngineSettings;

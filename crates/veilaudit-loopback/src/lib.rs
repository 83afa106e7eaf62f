//! Veilaudit Loopback - in-process implementations of the ports
//!
//! The cipher keeps plaintexts in memory and answers decryption requests
//! on demand, so an entire audit round trip can run inside one process.
//! Intended for tests, demos and the CLI simulator.

pub mod cipher;
pub mod clock;
pub mod identity;

pub use cipher::{DigestProofVerifier, LoopbackCipher};
pub use clock::{ManualClock, SystemClock};
pub use identity::StaticRoleDirectory;

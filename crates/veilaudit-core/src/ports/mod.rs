//! Port definitions (hexagonal architecture interfaces)
//!
//! The core depends on these traits; their implementations live in adapter
//! crates. All ports are synchronous: an orchestrator operation runs to
//! completion without suspending, and the asynchronous character of
//! decryption lives between operations, not inside one.
//!
//! ## Ports Overview
//!
//! - [`IDecryptionService`] - accepts handles for decryption, returns a request id
//! - [`IProofVerifier`] - checks a decryption result against its request
//! - [`IEncryptor`] - commits a plaintext value as a new ciphertext handle
//! - [`IRoleDirectory`] - role membership of a caller
//! - [`IClock`] - current time
//! - [`IEventSink`] - receives observable events

pub mod clock;
pub mod cipher;
pub mod event_sink;
pub mod identity;

pub use cipher::{IDecryptionService, IEncryptor, IProofVerifier, DECRYPTION_CALLBACK};
pub use clock::IClock;
pub use event_sink::IEventSink;
pub use identity::IRoleDirectory;

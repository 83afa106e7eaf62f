//! Veilaudit Journal - where audit events end up
//!
//! Provides:
//! - `EventJournal`: In-memory, queryable record of every published event
//! - `TracingEventSink`: Forwards events to `tracing` as structured logs
//! - `FanoutSink`: Publishes each event to several sinks

pub mod journal;
pub mod sink;

pub use journal::{EventJournal, JournalEntry};
pub use sink::{FanoutSink, TracingEventSink};

//! Lossy, rate-paced telemetry sinks for realtime producers.
//!
//! Producers register typed measurement "sources" once via [`sink::Sink::assign`],
//! mutate their fields at arbitrary rates, and call [`sink::Sink::write`] to
//! snapshot the current value. A background drain thread walks the registry
//! at a configured frequency and hands each dirty source to a pluggable
//! [`emitter::Emitter`] — see `intrometry-mcap` for a container-file emitter
//! and `intrometry-mqtt` for a topic-bus emitter.
//!
//! The library is explicitly lossy: a write arriving between two drains
//! overwrites the previous unwritten snapshot, and a write or drain that
//! cannot acquire a source's lock is silently dropped rather than queued or
//! retried. See the crate's `SPEC_FULL.md` for the full design rationale.

pub mod cell;
pub mod clock;
pub mod composite;
pub mod drain;
pub mod emitter;
pub mod id;
pub mod rate;
pub mod reflect;
pub mod registry;
pub mod sink;
pub mod supervisor;

pub use cell::{Header, NamesRecord, SerializationCell, ValuesRecord};
pub use composite::{SinkWithSources, SourceTuple};
pub use emitter::Emitter;
pub use reflect::{Reflect, ReflectSink};
pub use registry::{Parameters, Registry, SourceKey};
pub use sink::Sink;
pub use supervisor::RestartPolicy;

#[cfg(feature = "derive")]
pub use intrometry_derive::Reflect;

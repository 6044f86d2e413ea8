//! The narrow interface concrete sinks (`intrometry-mcap`, `intrometry-mqtt`)
//! implement. The core never depends on a specific transport; see spec §4.6.

use crate::cell::{NamesRecord, ValuesRecord};

/// A sink-specific encoder + transport. `display_id` is the source's
/// collision-resolved identifier (spec's `DisplayId`), used by emitters to
/// derive file/topic names.
pub trait Emitter: Send {
    /// Writes a names record. Called only when `names_dirty` holds.
    fn write_names(&mut self, display_id: &str, record: &NamesRecord) -> anyhow::Result<()>;

    /// Writes a values record. Called on every drain tick where `dirty` holds.
    fn write_values(&mut self, display_id: &str, record: &ValuesRecord) -> anyhow::Result<()>;

    /// Best-effort flush/close. Must be idempotent — [`crate::drain::drain_loop`]
    /// calls this once on its clean-interrupt exit, and an emitter may also be
    /// closed again via its own `Drop` impl as a backstop. The default no-op
    /// is correct for emitters with no buffering; file- and broker-backed
    /// emitters override this.
    fn close(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

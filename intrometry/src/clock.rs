//! Wall-clock helpers shared by the registry, the cell, and the emitters.

use std::time::{SystemTime, UNIX_EPOCH};

/// Nanoseconds since the Unix epoch, per the wall clock.
///
/// `0` is never returned in practice (it would require running this process
/// at the epoch), so callers may treat `0` as "unset" (see [`crate::sink::Sink::write`]).
pub fn now_nanos() -> u64 {
    let since_epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    since_epoch.as_nanos() as u64
}

/// Splits nanoseconds-since-epoch into the `(sec, nanosec)` pair used by
/// [`crate::cell::Header`], matching the wire record schema in the spec.
pub fn split_stamp(nanos: u64) -> (i32, u32) {
    let sec = (nanos / 1_000_000_000) as i32;
    let nanosec = (nanos % 1_000_000_000) as u32;
    (sec, nanosec)
}

/// Compact UTC timestamp, `YYYYMMDD_HHMMSS`, used to build emitter file/topic names.
pub fn date_stamp() -> String {
    chrono::Utc::now().format("%Y%m%d_%H%M%S").to_string()
}

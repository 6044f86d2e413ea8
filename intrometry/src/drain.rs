//! The rate-paced drain loop (spec §4.5).

use std::sync::atomic::{AtomicBool, Ordering};

use crate::emitter::Emitter;
use crate::rate::RateTimer;
use crate::registry::Registry;

/// Runs the drain loop until `interrupted` is set or the rate is invalid.
///
/// A config error (`rate_hz == 0`) is a clean, non-restarting exit: retrying
/// it would only fail again. An emitter error propagates out of this
/// function so the caller's [`crate::supervisor::run_supervised`] restarts
/// the whole loop (spec §4.5, §7).
pub fn drain_loop(
    registry: &Registry,
    emitter: &mut dyn Emitter,
    rate_hz: f64,
    interrupted: &AtomicBool,
) -> anyhow::Result<()> {
    let mut timer = RateTimer::new(rate_hz);
    if !timer.valid() {
        log::error!("drain worker: rate must be > 0, got {rate_hz}; worker will not run");
        return Ok(());
    }

    while !interrupted.load(Ordering::Relaxed) {
        registry.visit_all(|cell| cell.emit(emitter).map(|_| ()))?;
        timer.step();
    }

    // Spec §4.6: close is idempotent and best-effort-completes in-flight
    // writes; call it on the clean-interrupt path so a normal `Sink` drop
    // leaves a readable file/connection without waiting on the emitter's own
    // `Drop` impl (which still runs as a backstop if the worker is ever
    // killed before this point, e.g. restart budget exhaustion).
    emitter.close()
}

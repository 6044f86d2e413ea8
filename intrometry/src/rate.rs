//! Rate pacing for the drain worker.
//!
//! Grounded on the teacher's use of `spin_sleep::LoopHelper` in `main.rs` to
//! pace the audio-visualizer's render loop at a target frame rate; here the
//! same spin-sleep precision paces the drain worker at a target publish rate
//! instead of a target frame rate.

use std::time::{Duration, Instant};

/// Paces a loop at a configured frequency, skipping missed ticks instead of
/// bursting to catch up (see spec §4.1: `step()` advances the threshold by
/// `floor(elapsed/step)+1` steps).
pub struct RateTimer {
    period: Option<Duration>,
    next_tick: Instant,
}

impl RateTimer {
    /// `rate_hz == 0` produces an invalid timer (see [`RateTimer::valid`]);
    /// the drain worker treats this as a configuration error and exits.
    pub fn new(rate_hz: f64) -> Self {
        let period = if rate_hz > 0.0 {
            Some(Duration::from_secs_f64(1.0 / rate_hz))
        } else {
            None
        };
        RateTimer {
            period,
            next_tick: Instant::now(),
        }
    }

    /// `false` iff constructed with `rate_hz == 0`.
    pub fn valid(&self) -> bool {
        self.period.is_some()
    }

    /// Advances the internal threshold past "now" (skipping any ticks that
    /// were already missed) and sleeps until the new threshold.
    ///
    /// Panics if called on an invalid timer; callers must check
    /// [`RateTimer::valid`] first, matching step 1 of the drain loop in spec §4.5.
    pub fn step(&mut self) {
        let period = self.period.expect("RateTimer::step called on an invalid (rate=0) timer");
        let now = Instant::now();

        if now >= self.next_tick {
            let elapsed = now.duration_since(self.next_tick);
            let missed_steps = (elapsed.as_secs_f64() / period.as_secs_f64()).floor() as u32;
            self.next_tick += period * (missed_steps + 1);
        } else {
            self.next_tick += period;
        }

        let sleep_for = self.next_tick.saturating_duration_since(Instant::now());
        if !sleep_for.is_zero() {
            spin_sleep::sleep(sleep_for);
        }
    }
}

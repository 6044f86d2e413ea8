//! Crash-restart supervision for the drain worker (spec §4.5, §7).
//!
//! Treated as an external collaborator capability by the spec; this module
//! provides the one default implementation the core ships with, matching the
//! "100 restarts, 50ms backoff" policy values from the distilled spec.

use std::panic::{self, AssertUnwindSafe};
use std::thread;
use std::time::Duration;

/// Restart budget for a supervised worker body.
#[derive(Debug, Clone, Copy)]
pub struct RestartPolicy {
    pub max_restarts: u32,
    pub backoff: Duration,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        RestartPolicy {
            max_restarts: 100,
            backoff: Duration::from_millis(50),
        }
    }
}

/// Runs `body` repeatedly until it returns `Ok(())` (a clean, intentional
/// exit) or the restart budget is exhausted. A panic escaping `body` is
/// treated the same as an `Err` return: logged, backed off, and retried.
///
/// After the budget is exhausted the worker is "effectively inert" (spec
/// §7): this function simply returns, and the sink's `write`/`assign` calls
/// keep accepting data that is never drained.
pub fn run_supervised<F>(policy: RestartPolicy, mut body: F)
where
    F: FnMut() -> anyhow::Result<()>,
{
    let mut restarts = 0u32;
    loop {
        let outcome = panic::catch_unwind(AssertUnwindSafe(&mut body));
        match outcome {
            Ok(Ok(())) => {
                log::debug!("drain worker exited cleanly after {restarts} restart(s)");
                return;
            }
            Ok(Err(err)) => {
                log::warn!("drain worker failed: {err:#}");
            }
            Err(panic) => {
                let msg = panic_message(&panic);
                log::warn!("drain worker panicked: {msg}");
            }
        }

        restarts += 1;
        if restarts > policy.max_restarts {
            log::error!("drain worker exhausted its restart budget ({} restarts); giving up", policy.max_restarts);
            return;
        }
        thread::sleep(policy.backoff);
    }
}

fn panic_message(payload: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn stops_after_clean_exit() {
        let calls = AtomicU32::new(0);
        run_supervised(RestartPolicy::default(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn restarts_on_error_up_to_the_budget() {
        let calls = AtomicU32::new(0);
        let policy = RestartPolicy {
            max_restarts: 3,
            backoff: Duration::from_millis(1),
        };
        run_supervised(policy, || {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(anyhow::anyhow!("boom"))
        });
        // initial attempt + 3 restarts = 4 calls
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn restarts_on_panic() {
        let calls = AtomicU32::new(0);
        let policy = RestartPolicy {
            max_restarts: 1,
            backoff: Duration::from_millis(1),
        };
        run_supervised(policy, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n == 0 {
                panic!("boom");
            }
            Ok(())
        });
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}

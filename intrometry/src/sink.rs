//! The public sink façade (spec §4.7): `assign`, `retract`, `write`,
//! composed from the registry, cell, drain worker, and emitter.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::clock::now_nanos;
use crate::drain::drain_loop;
use crate::emitter::Emitter;
use crate::reflect::Reflect;
use crate::registry::{Parameters, Registry, SourceKey};
use crate::supervisor::{run_supervised, RestartPolicy};

/// Builds a [`Sink`]. The emitter is constructed lazily inside
/// [`Sink::initialize`], since emitter construction is fallible (opening a
/// file, dialing a broker) and the spec requires `initialize()` to surface
/// that failure as `false` rather than a panic at `Sink::new` time.
pub struct Sink<E: Emitter + 'static> {
    id: String,
    rate_hz: f64,
    registry: Arc<Registry>,
    interrupted: Arc<AtomicBool>,
    restart_policy: RestartPolicy,
    emitter_factory: Option<Box<dyn FnOnce() -> anyhow::Result<E> + Send>>,
    worker: Option<JoinHandle<()>>,
    initialized: bool,
}

impl<E: Emitter + 'static> Sink<E> {
    /// `id` empty disables the sink entirely (spec §6). `rate_hz` is the
    /// drain frequency, conventionally 500. `emitter_factory` builds the
    /// concrete emitter; it runs on the drain thread during `initialize`.
    pub fn new(
        id: impl Into<String>,
        rate_hz: f64,
        emitter_factory: impl FnOnce() -> anyhow::Result<E> + Send + 'static,
    ) -> Self {
        Sink {
            id: id.into(),
            rate_hz,
            registry: Arc::new(Registry::new()),
            interrupted: Arc::new(AtomicBool::new(false)),
            restart_policy: RestartPolicy::default(),
            emitter_factory: Some(Box::new(emitter_factory)),
            worker: None,
            initialized: false,
        }
    }

    pub fn with_restart_policy(mut self, policy: RestartPolicy) -> Self {
        self.restart_policy = policy;
        self
    }

    /// Builds the emitter and starts the drain thread. Returns `false` (and
    /// logs why) if the sink id is empty or the emitter factory fails; every
    /// other sink operation becomes a no-op in that case.
    pub fn initialize(&mut self) -> bool {
        if self.id.is_empty() {
            log::warn!("intrometry sink disabled: empty id");
            return false;
        }

        let factory = match self.emitter_factory.take() {
            Some(factory) => factory,
            None => {
                log::warn!("intrometry sink '{}' already initialized", self.id);
                return false;
            }
        };

        let mut emitter = match factory() {
            Ok(emitter) => emitter,
            Err(err) => {
                log::error!("intrometry sink '{}' failed to initialize emitter: {err:#}", self.id);
                return false;
            }
        };

        let registry = Arc::clone(&self.registry);
        let interrupted = Arc::clone(&self.interrupted);
        let rate_hz = self.rate_hz;
        let policy = self.restart_policy;
        let sink_id = self.id.clone();

        let worker = thread::Builder::new()
            .name(format!("intrometry-drain-{sink_id}"))
            .spawn(move || {
                run_supervised(policy, || drain_loop(&registry, &mut emitter, rate_hz, &interrupted));
            })
            .expect("failed to spawn drain thread");

        self.worker = Some(worker);
        self.initialized = true;
        true
    }

    /// Registers `source` under the empty user id (falling back to
    /// `source.default_id()`). No-op if the sink is not initialized.
    pub fn assign<T: Reflect + 'static>(&self, source: &T, params: Parameters) {
        self.assign_with_id("", source, params)
    }

    pub fn assign_with_id<T: Reflect + 'static>(&self, user_id: &str, source: &T, params: Parameters) {
        if !self.initialized {
            return;
        }
        let raw_id = if user_id.is_empty() { source.default_id() } else { user_id };
        let key = SourceKey::of::<T>(raw_id);
        self.registry.try_emplace(key, raw_id, source, params);
    }

    pub fn retract<T: Reflect + 'static>(&self, source: &T) {
        self.retract_with_id("", source)
    }

    pub fn retract_with_id<T: Reflect + 'static>(&self, user_id: &str, source: &T) {
        if !self.initialized {
            return;
        }
        let raw_id = if user_id.is_empty() { source.default_id() } else { user_id };
        let key = SourceKey::of::<T>(raw_id);
        self.registry.erase(&key);
    }

    /// `ts == 0` is replaced with the current wall clock (spec §4.7).
    pub fn write<T: Reflect + 'static>(&self, source: &T, ts: u64) {
        self.write_with_id("", source, ts)
    }

    pub fn write_with_id<T: Reflect + 'static>(&self, user_id: &str, source: &T, ts: u64) {
        if !self.initialized {
            return;
        }
        let raw_id = if user_id.is_empty() { source.default_id() } else { user_id };
        let key = SourceKey::of::<T>(raw_id);
        let timestamp = if ts == 0 { now_nanos() } else { ts };

        let registry = &self.registry;
        let counter = registry.names_version_counter();
        let found = registry.visit_one(&key, |cell| {
            cell.reflect(source, timestamp, counter);
        });
        if !found {
            log::warn!("intrometry: write to unassigned source '{raw_id}'");
        }
    }

    /// Applies `write` to every element of `sources` (the batch variant from
    /// spec §4.7, expressed as a slice since Rust has no true variadics).
    pub fn write_all<T: Reflect + 'static>(&self, sources: &[&T]) {
        for source in sources {
            self.write(*source, 0);
        }
    }
}

impl<E: Emitter + 'static> Drop for Sink<E> {
    fn drop(&mut self) {
        self.interrupted.store(true, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

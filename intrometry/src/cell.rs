//! The per-source serialization cell (spec §3, §4.3).
//!
//! Generalizes the teacher's lock-free `FlipCell`/`SpectrumCell` (three
//! `UnsafeCell<T>` slots swapped via an atomic index, `flip-cell/src/lib.rs`
//! and `src/sync.rs`) into the try-locked-mutex design the spec mandates:
//! the spec's non-blocking contract only requires a lock whose acquisition
//! can fail cheaply, and `std::sync::Mutex::try_lock` gives us exactly that
//! without `unsafe`. See `DESIGN.md` for the rationale.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use crate::clock::split_stamp;
use crate::emitter::Emitter;
use crate::reflect::{Reflect, ReflectSink};

/// Common header carried by both the names and values records (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub sec: i32,
    pub nanosec: u32,
    pub names_version: u32,
}

/// The field-path record, emitted whenever `names_dirty` holds.
#[derive(Debug, Clone)]
pub struct NamesRecord {
    pub header: Header,
    pub names: Vec<String>,
}

/// The numeric-value record, emitted on every non-skipped drain tick where `dirty` holds.
#[derive(Debug, Clone)]
pub struct ValuesRecord {
    pub header: Header,
    pub values: Vec<f64>,
}

/// The mutable state behind the cell's try-lock. Also the sole implementor
/// of [`ReflectSink`]: reflection writes straight into `names`/`values`.
struct CellInner {
    names: Vec<String>,
    values: Vec<f64>,
    stamp_nanos: u64,
    names_version: u32,
    names_dirty: bool,
    dirty: bool,
    persistent_shape: bool,
}

impl ReflectSink for CellInner {
    fn size(&self) -> usize {
        debug_assert_eq!(self.names.len(), self.values.len());
        self.names.len()
    }

    fn resize(&mut self, n: usize) {
        self.names.resize_with(n, String::new);
        self.values.resize(n, 0.0);
    }

    fn reserve(&mut self, n: usize) {
        self.names.reserve(n);
        self.values.reserve(n);
    }

    fn set_name(&mut self, i: usize, name: &str) {
        self.names[i].clear();
        self.names[i].push_str(name);
    }

    fn set_value(&mut self, i: usize, value: f64) {
        self.values[i] = value;
    }
}

/// Owns the last snapshot reflected from one registered source (spec §3).
///
/// All operations take the inner lock as **try-lock only**: a failed
/// acquisition is not an error, it is the deliberate backpressure mechanism
/// described in spec §5 — the caller returns without side effects.
pub struct SerializationCell {
    display_id: String,
    inner: Mutex<CellInner>,
}

impl SerializationCell {
    /// Performs the *first* reflection pass that sizes the records (spec
    /// invariant V2: a cell is only visible to the drain thread after this
    /// initial reflection). Used by `Registry::try_emplace`.
    pub fn new(
        display_id: String,
        source: &dyn Reflect,
        persistent_shape: bool,
        names_version_counter: &AtomicU32,
    ) -> Self {
        let mut inner = CellInner {
            names: Vec::new(),
            values: Vec::new(),
            stamp_nanos: 0,
            // V4: the counter itself starts at a random value (Registry::new);
            // the first reflection always claims a fresh version.
            names_version: names_version_counter.fetch_add(1, Ordering::Relaxed),
            names_dirty: true,
            dirty: false,
            persistent_shape,
        };
        source.reflect(&mut inner, persistent_shape);

        SerializationCell {
            display_id,
            inner: Mutex::new(inner),
        }
    }

    pub fn display_id(&self) -> &str {
        &self.display_id
    }

    /// Reflects `source` into the cell and marks it dirty. Returns `false`
    /// without side effects if the cell lock is contended (spec invariant V5).
    pub fn reflect(&self, source: &dyn Reflect, timestamp_nanos: u64, names_version_counter: &AtomicU32) -> bool {
        let mut inner = match self.inner.try_lock() {
            Ok(guard) => guard,
            Err(_) => return false,
        };

        let previous_size = inner.names.len();
        source.reflect(&mut *inner, inner.persistent_shape);
        let shape_changed = !inner.persistent_shape || inner.names.len() != previous_size;

        if shape_changed {
            inner.names_version = names_version_counter.fetch_add(1, Ordering::Relaxed);
            inner.names_dirty = true;
        }

        inner.stamp_nanos = timestamp_nanos;
        inner.dirty = true;
        true
    }

    /// If dirty, serializes the current record(s) via `emitter` (names first,
    /// iff `names_dirty`, then values) and clears the flags on success.
    ///
    /// Returns `Ok(true)` if something was emitted, `Ok(false)` if the cell
    /// was skipped (contended lock or nothing new to send). An emitter error
    /// leaves the dirty flags set so the next successful drain retries.
    pub fn emit(&self, emitter: &mut dyn Emitter) -> anyhow::Result<bool> {
        let mut inner = match self.inner.try_lock() {
            Ok(guard) => guard,
            Err(_) => return Ok(false),
        };

        if !inner.dirty {
            return Ok(false);
        }

        let (sec, nanosec) = split_stamp(inner.stamp_nanos);
        let header = Header {
            sec,
            nanosec,
            names_version: inner.names_version,
        };

        if inner.names_dirty {
            let record = NamesRecord {
                header,
                names: inner.names.clone(),
            };
            emitter.write_names(&self.display_id, &record)?;
            inner.names_dirty = false;
        }

        let record = ValuesRecord {
            header,
            values: inner.values.clone(),
        };
        emitter.write_values(&self.display_id, &record)?;
        inner.dirty = false;

        Ok(true)
    }
}

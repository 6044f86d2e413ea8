//! The concurrent source registry (spec §3, §4.4).

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::atomic::AtomicU32;
use std::sync::{Arc, RwLock};

use crate::cell::SerializationCell;
use crate::id::random_u32;
use crate::reflect::Reflect;

/// `(type_identity, user_id)`. Two sources of the same concrete type
/// registered under different `user_id`s are distinct cells.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceKey {
    type_id: TypeId,
    user_id: String,
}

impl SourceKey {
    pub fn of<T: 'static>(user_id: &str) -> Self {
        SourceKey {
            type_id: TypeId::of::<T>(),
            user_id: user_id.to_string(),
        }
    }
}

/// Per-source construction hint (spec §6).
#[derive(Debug, Clone, Copy, Default)]
pub struct Parameters {
    /// When true, the reflector may assume the field ordering is stable
    /// between writes and skip re-deriving names (spec invariant V3).
    pub persistent_structure: bool,
}

struct RegistryInner {
    cells: HashMap<SourceKey, Arc<SerializationCell>>,
    /// raw_id -> number of times it has been seen; never decremented on
    /// `erase`, matching the DisplayId policy in spec §3.
    collisions: HashMap<String, u32>,
}

/// Keyed map of serialization cells with try-lock visit semantics (spec §4.4).
pub struct Registry {
    lock: RwLock<RegistryInner>,
    /// Shared, sink-wide, monotonically increasing version counter (spec
    /// invariant V4). Seeded randomly so a consumer restart is never mistaken
    /// for a shape-compatible continuation of a previous process's stream.
    names_version_counter: AtomicU32,
}

impl Registry {
    pub fn new() -> Self {
        Registry {
            lock: RwLock::new(RegistryInner {
                cells: HashMap::new(),
                collisions: HashMap::new(),
            }),
            names_version_counter: AtomicU32::new(random_u32()),
        }
    }

    /// Resolves the `DisplayId` for `raw_id`, bumping the per-raw-id
    /// collision counter. Must be called while holding the registry lock
    /// exclusively (only `try_emplace` calls this).
    fn resolve_display_id(collisions: &mut HashMap<String, u32>, raw_id: &str) -> String {
        let count = collisions.entry(raw_id.to_string()).or_insert(0);
        let display_id = if *count == 0 {
            raw_id.to_string()
        } else {
            format!("{raw_id}_intro{count}")
        };
        *count += 1;
        display_id
    }

    /// Registers `source` under `key`, unless a cell already exists for that
    /// key (duplicate registration is a no-op, not an error). `raw_id` is the
    /// caller-supplied `user_id`, or the source's own `default_id()` when the
    /// caller passed an empty string.
    pub fn try_emplace<T: Reflect + 'static>(&self, key: SourceKey, raw_id: &str, source: &T, params: Parameters) {
        let mut inner = self.lock.write().expect("registry lock poisoned");
        if inner.cells.contains_key(&key) {
            return;
        }
        let display_id = Self::resolve_display_id(&mut inner.collisions, raw_id);
        let cell = SerializationCell::new(display_id, source, params.persistent_structure, &self.names_version_counter);
        inner.cells.insert(key, Arc::new(cell));
    }

    /// Removes the cell for `key`, if any. No error on missing.
    pub fn erase(&self, key: &SourceKey) {
        let mut inner = self.lock.write().expect("registry lock poisoned");
        inner.cells.remove(key);
    }

    /// Shared-lock iteration over every registered cell. Each cell try-locks
    /// internally; `f` is responsible for skipping/handling contention.
    pub fn visit_all<F>(&self, mut f: F) -> anyhow::Result<()>
    where
        F: FnMut(&SerializationCell) -> anyhow::Result<()>,
    {
        let inner = self.lock.read().expect("registry lock poisoned");
        for cell in inner.cells.values() {
            f(cell)?;
        }
        Ok(())
    }

    /// Shared-lock lookup of a single cell. Returns `false` if `key` is not
    /// registered, so callers can log "source not assigned".
    pub fn visit_one<F>(&self, key: &SourceKey, f: F) -> bool
    where
        F: FnOnce(&SerializationCell),
    {
        let inner = self.lock.read().expect("registry lock poisoned");
        match inner.cells.get(key) {
            Some(cell) => {
                f(cell);
                true
            }
            None => false,
        }
    }

    /// Number of currently registered cells. Exposed for tests and metrics,
    /// not part of the producer/drain hot paths.
    pub fn len(&self) -> usize {
        self.lock.read().expect("registry lock poisoned").cells.len()
    }

    /// The sink-wide, monotonically increasing `names_version` counter
    /// (spec invariant V4). Exposed so `Sink::write` can hand it to
    /// `SerializationCell::reflect` on the write path, the same counter
    /// `try_emplace` uses for the initial reflection.
    pub fn names_version_counter(&self) -> &AtomicU32 {
        &self.names_version_counter
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

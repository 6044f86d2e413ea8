//! The `Reflect` contract: converting a user-defined structured value into
//! parallel `(name, value)` arrays.
//!
//! This is the "external collaborator" described by the spec: the core never
//! knows the concrete shape of a source, only that it can flatten itself into
//! the capability-set exposed by [`ReflectSink`]. `intrometry-derive` provides
//! one concrete implementation via `#[derive(Reflect)]`; hand-written `impl
//! Reflect` blocks are equally valid.

/// The capability-set a [`Reflect`] implementation writes into. A
/// [`crate::cell::SerializationCell`] is the only implementor in this crate,
/// but the trait is kept separate so reflection code can be unit-tested
/// against a bare `Vec`-backed stand-in.
pub trait ReflectSink {
    /// Current number of `(name, value)` pairs.
    fn size(&self) -> usize;

    /// Grows or shrinks the record to exactly `n` entries.
    fn resize(&mut self, n: usize);

    /// Reserves capacity for at least `n` entries without changing `size()`.
    fn reserve(&mut self, n: usize);

    /// Overwrites the name at `i`. `i` must be `< size()`.
    fn set_name(&mut self, i: usize, name: &str);

    /// Overwrites the value at `i`. `i` must be `< size()`.
    fn set_value(&mut self, i: usize, value: f64);
}

/// A structured value that can be flattened into a [`ReflectSink`].
///
/// Implementations must write exactly as many `(name, value)` pairs as
/// `sink.size()` after the call (the cell resizes the sink to match before
/// invoking `reflect`, based on the field count discovered during `assign`'s
/// first reflection pass, or on `sink.resize` calls the implementation itself
/// makes when its shape is not fixed, e.g. a `Vec`-backed field).
pub trait Reflect {
    /// The identifier used when the caller passes an empty `user_id` to
    /// `Sink::assign`/`Sink::write`.
    fn default_id(&self) -> &str;

    /// Flattens `self` into `sink`. When `persistent_shape` is true the
    /// implementation may assume the field count and order are identical to
    /// the previous call and skip re-deriving names, per spec invariant V3.
    fn reflect(&self, sink: &mut dyn ReflectSink, persistent_shape: bool);
}

/// A freestanding, growable [`ReflectSink`] backed by a plain `Vec`.
///
/// `intrometry-derive` uses one of these per nested field: the nested value
/// reflects into a fresh `FlatSink` (so its internal indices start at 0
/// regardless of where the parent is in its own flattening), and the
/// generated code then splices the collected entries into the parent's
/// sink with the field name prepended as a dotted prefix.
#[derive(Default)]
pub struct FlatSink {
    entries: Vec<(String, f64)>,
}

impl FlatSink {
    pub fn new() -> Self {
        FlatSink::default()
    }

    /// Consumes the sink, yielding its `(name, value)` pairs in order.
    pub fn into_entries(self) -> Vec<(String, f64)> {
        self.entries
    }
}

impl ReflectSink for FlatSink {
    fn size(&self) -> usize {
        self.entries.len()
    }

    fn resize(&mut self, n: usize) {
        self.entries.resize_with(n, || (String::new(), 0.0));
    }

    fn reserve(&mut self, n: usize) {
        self.entries.reserve(n);
    }

    fn set_name(&mut self, i: usize, name: &str) {
        self.entries[i].0 = name.to_string();
    }

    fn set_value(&mut self, i: usize, value: f64) {
        self.entries[i].1 = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_sink_round_trips_entries_in_order() {
        let mut sink = FlatSink::new();
        sink.resize(2);
        sink.set_name(0, "a");
        sink.set_value(0, 1.0);
        sink.set_name(1, "b");
        sink.set_value(1, 2.0);
        let entries = sink.into_entries();
        assert_eq!(entries, vec![("a".to_string(), 1.0), ("b".to_string(), 2.0)]);
    }
}

//! The composite "sink-with-sources" helper from spec §4.7: bundles a sink
//! with a fixed tuple of source values, `assign`s all of them at
//! `initialize` time, and exposes one `write()` that iterates the tuple.

use crate::emitter::Emitter;
use crate::reflect::Reflect;
use crate::registry::Parameters;
use crate::sink::Sink;

/// Implemented for tuples of `(Source, Parameters)` pairs up to arity 6
/// (see the `impl_source_tuple!` invocations below). Rust has no variadic
/// generics, so a tuple stands in for the source language's argument pack.
pub trait SourceTuple {
    fn assign_all<E: Emitter + 'static>(&self, sink: &Sink<E>);
    fn write_all<E: Emitter + 'static>(&self, sink: &Sink<E>);
}

macro_rules! impl_source_tuple {
    ( $( ($source:ident, $params:ident, $idx:tt) ),+ ) => {
        impl<$($source: Reflect + 'static),+> SourceTuple for ( $( ($source, Parameters), )+ ) {
            fn assign_all<E: Emitter + 'static>(&self, sink: &Sink<E>) {
                $( sink.assign(&self.$idx.0, self.$idx.1); )+
            }
            fn write_all<E: Emitter + 'static>(&self, sink: &Sink<E>) {
                $( sink.write(&self.$idx.0, 0); )+
            }
        }
    };
}

impl_source_tuple!((A, PA, 0));
impl_source_tuple!((A, PA, 0), (B, PB, 1));
impl_source_tuple!((A, PA, 0), (B, PB, 1), (C, PC, 2));
impl_source_tuple!((A, PA, 0), (B, PB, 1), (C, PC, 2), (D, PD, 3));
impl_source_tuple!((A, PA, 0), (B, PB, 1), (C, PC, 2), (D, PD, 3), (E2, PE2, 4));
impl_source_tuple!((A, PA, 0), (B, PB, 1), (C, PC, 2), (D, PD, 3), (E2, PE2, 4), (F, PF, 5));

/// Bundles a [`Sink`] with a fixed tuple of `(source, Parameters)` pairs.
/// `initialize` assigns every source; `write` drains the whole tuple.
pub struct SinkWithSources<E: Emitter + 'static, S: SourceTuple> {
    sink: Sink<E>,
    sources: S,
}

impl<E: Emitter + 'static, S: SourceTuple> SinkWithSources<E, S> {
    pub fn new(sink: Sink<E>, sources: S) -> Self {
        SinkWithSources { sink, sources }
    }

    /// Initializes the inner sink and, on success, assigns every bundled source.
    pub fn initialize(&mut self) -> bool {
        if !self.sink.initialize() {
            return false;
        }
        self.sources.assign_all(&self.sink);
        true
    }

    /// Writes every bundled source in one call.
    pub fn write(&self) {
        self.sources.write_all(&self.sink);
    }

    pub fn sink(&self) -> &Sink<E> {
        &self.sink
    }
}

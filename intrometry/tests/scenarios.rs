//! Integration tests for the concrete scenarios in spec §8, driving the
//! registry + cell + drain worker end-to-end against an in-memory `Emitter`.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use intrometry::{Emitter, NamesRecord, Parameters, Reflect, ReflectSink, Sink, ValuesRecord};

#[derive(Clone, Default)]
struct RecordingEmitter {
    names: Arc<Mutex<Vec<NamesRecord>>>,
    values: Arc<Mutex<Vec<ValuesRecord>>>,
}

impl Emitter for RecordingEmitter {
    fn write_names(&mut self, _display_id: &str, record: &NamesRecord) -> anyhow::Result<()> {
        self.names.lock().unwrap().push(record.clone());
        Ok(())
    }
    fn write_values(&mut self, _display_id: &str, record: &ValuesRecord) -> anyhow::Result<()> {
        self.values.lock().unwrap().push(record.clone());
        Ok(())
    }
}

struct ImuSample {
    duration: f64,
    size: usize,
    vec: [f32; 3],
}

impl Reflect for ImuSample {
    fn default_id(&self) -> &str {
        "imu"
    }
    fn reflect(&self, sink: &mut dyn ReflectSink, persistent_shape: bool) {
        if !persistent_shape || sink.size() != 2 + self.vec.len() {
            sink.resize(2 + self.vec.len());
            sink.set_name(0, "duration");
            sink.set_name(1, "size");
            for i in 0..self.vec.len() {
                sink.set_name(2 + i, &format!("vec.{i}"));
            }
        }
        sink.set_value(0, self.duration);
        sink.set_value(1, self.size as f64);
        for (i, v) in self.vec.iter().enumerate() {
            sink.set_value(2 + i, *v as f64);
        }
    }
}

struct VaryingSample {
    vec: Vec<f32>,
}

impl Reflect for VaryingSample {
    fn default_id(&self) -> &str {
        "varying"
    }
    fn reflect(&self, sink: &mut dyn ReflectSink, _persistent_shape: bool) {
        // persistent_structure=false: always re-derive names.
        sink.resize(self.vec.len());
        for (i, v) in self.vec.iter().enumerate() {
            sink.set_name(i, &format!("vec.{i}"));
            sink.set_value(i, *v as f64);
        }
    }
}

fn test_sink(emitter: RecordingEmitter, rate_hz: f64) -> Sink<RecordingEmitter> {
    Sink::new("test-sink", rate_hz, move || Ok(emitter))
}

#[test]
fn scenario_persistent_shape_happy_path() {
    let emitter = RecordingEmitter::default();
    let names = Arc::clone(&emitter.names);
    let values = Arc::clone(&emitter.values);

    let mut sink = test_sink(emitter, 200.0);
    assert!(sink.initialize());

    let source = ImuSample { duration: 1.0, size: 4, vec: [3.4, 2.2, 2.1] };
    sink.assign(&source, Parameters { persistent_structure: true });

    for _ in 0..3 {
        sink.write(&source, 0);
        thread::sleep(Duration::from_millis(50));
    }
    thread::sleep(Duration::from_millis(50));

    let names = names.lock().unwrap();
    let values = values.lock().unwrap();
    assert_eq!(names.len(), 1, "persistent shape should emit names exactly once");
    assert!(values.len() >= 1 && values.len() <= 4, "expected <=3 writes plus the initial reflection");
    let version = names[0].header.names_version;
    for v in values.iter() {
        assert_eq!(v.header.names_version, version);
    }
}

#[test]
fn scenario_shape_change_advances_names_version_every_write() {
    let emitter = RecordingEmitter::default();
    let names = Arc::clone(&emitter.names);
    let values = Arc::clone(&emitter.values);

    let mut sink = test_sink(emitter, 200.0);
    assert!(sink.initialize());

    let mut source = VaryingSample { vec: vec![] };
    sink.assign(&source, Parameters { persistent_structure: false });
    thread::sleep(Duration::from_millis(20));

    for len in [0usize, 1, 2] {
        source.vec = vec![0.0; len];
        sink.write(&source, 0);
        thread::sleep(Duration::from_millis(20));
    }
    thread::sleep(Duration::from_millis(20));

    let names = names.lock().unwrap();
    let values = values.lock().unwrap();
    // Every emitted values record should be preceded by a names record
    // carrying the same version (invariant V3).
    assert_eq!(names.len(), values.len(), "a shape change must emit a names record alongside every values record");
    let mut seen_versions = std::collections::HashSet::new();
    for (n, v) in names.iter().zip(values.iter()) {
        assert_eq!(n.header.names_version, v.header.names_version);
        seen_versions.insert(n.header.names_version);
    }
    assert_eq!(seen_versions.len(), names.len(), "every shape change must claim a fresh names_version");
}

#[test]
fn scenario_unknown_write_emits_nothing() {
    let emitter = RecordingEmitter::default();
    let values = Arc::clone(&emitter.values);

    let mut sink = test_sink(emitter, 200.0);
    assert!(sink.initialize());

    let source = ImuSample { duration: 0.0, size: 0, vec: [0.0; 3] };
    // No assign() call: write() on an unknown source must be a no-op.
    sink.write(&source, 0);
    thread::sleep(Duration::from_millis(50));

    assert!(values.lock().unwrap().is_empty());
}

#[test]
fn scenario_lossy_overwrite_respects_rate_ceiling() {
    let emitter = RecordingEmitter::default();
    let values = Arc::clone(&emitter.values);

    let rate_hz = 500.0;
    let mut sink = test_sink(emitter, rate_hz);
    assert!(sink.initialize());

    let source = Arc::new(AtomicU32::new(0));

    struct Counter(Arc<AtomicU32>);
    impl Reflect for Counter {
        fn default_id(&self) -> &str {
            "counter"
        }
        fn reflect(&self, sink: &mut dyn ReflectSink, persistent_shape: bool) {
            if !persistent_shape || sink.size() != 1 {
                sink.resize(1);
                sink.set_name(0, "count");
            }
            sink.set_value(0, self.0.load(Ordering::Relaxed) as f64);
        }
    }

    let initial = Counter(Arc::clone(&source));
    sink.assign(&initial, Parameters { persistent_structure: true });

    // A single producer hammering `write` at a much higher rate than the
    // sink drains; `Sink` is not `Clone`, so the "other thread" from the
    // spec's scenario 4 is simulated by writing as fast as possible from
    // this thread instead of splitting across two.
    let deadline = std::time::Instant::now() + Duration::from_secs(1);
    let mut n = 0u32;
    while std::time::Instant::now() < deadline {
        n += 1;
        source.store(n, Ordering::Relaxed);
        let c = Counter(Arc::clone(&source));
        sink.write(&c, 0);
    }
    thread::sleep(Duration::from_millis(20));

    let values = values.lock().unwrap();
    assert!(values.len() as f64 <= rate_hz * 1.0 + 2.0, "got {} records, expected <= ~501", values.len());
    let last = values.last().expect("at least one record should have drained");
    assert_eq!(last.values[0], source.load(Ordering::Relaxed) as f64);
}

#[test]
fn scenario_collision_suffix_across_types() {
    struct TypeA;
    struct TypeB;
    impl Reflect for TypeA {
        fn default_id(&self) -> &str {
            "foo"
        }
        fn reflect(&self, sink: &mut dyn ReflectSink, _persistent_shape: bool) {
            sink.resize(1);
            sink.set_name(0, "a");
            sink.set_value(0, 1.0);
        }
    }
    impl Reflect for TypeB {
        fn default_id(&self) -> &str {
            "foo"
        }
        fn reflect(&self, sink: &mut dyn ReflectSink, _persistent_shape: bool) {
            sink.resize(1);
            sink.set_name(0, "b");
            sink.set_value(0, 2.0);
        }
    }

    let emitter = RecordingEmitter::default();
    let mut sink = test_sink(emitter, 200.0);
    assert!(sink.initialize());

    sink.assign(&TypeA, Parameters::default());
    sink.assign(&TypeB, Parameters::default());

    // Both cells exist under the registry; DisplayId uniqueness is verified
    // at the registry level in `registry.rs`'s unit tests. Here we only
    // check that both writes succeed without panicking (no key collision).
    sink.write(&TypeA, 0);
    sink.write(&TypeB, 0);
}

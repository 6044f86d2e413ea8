//! Exercises `#[derive(Reflect)]` against scalar, array, and nested-struct
//! fields, via a bare `FlatSink` rather than a full sink/registry round trip.

use intrometry::reflect::FlatSink;
use intrometry::{Reflect, ReflectSink};

#[derive(Reflect)]
struct Accel {
    vec: [f32; 3],
    valid: bool,
}

#[derive(Reflect)]
struct ImuSample {
    duration: f64,
    size: usize,
    accel: Accel,
}

fn flatten(source: &impl Reflect) -> Vec<(String, f64)> {
    let mut sink = FlatSink::new();
    source.reflect(&mut sink, false);
    sink.into_entries()
}

#[test]
fn scalar_and_array_fields_are_named_after_the_field() {
    let accel = Accel { vec: [1.0, 2.0, 3.0], valid: true };
    let entries = flatten(&accel);
    assert_eq!(
        entries,
        vec![
            ("vec.0".to_string(), 1.0),
            ("vec.1".to_string(), 2.0),
            ("vec.2".to_string(), 3.0),
            ("valid".to_string(), 1.0),
        ]
    );
}

#[test]
fn nested_struct_fields_compose_dotted_paths() {
    let imu = ImuSample { duration: 1.5, size: 4, accel: Accel { vec: [0.1, 0.2, 0.3], valid: false } };
    let entries = flatten(&imu);
    let names: Vec<&str> = entries.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(
        names,
        vec!["duration", "size", "accel.vec.0", "accel.vec.1", "accel.vec.2", "accel.valid"]
    );
    assert_eq!(entries[0].1, 1.5);
    assert_eq!(entries[5].1, 0.0);
}

#[test]
fn default_id_is_the_snake_cased_type_name() {
    let imu = ImuSample { duration: 0.0, size: 0, accel: Accel { vec: [0.0; 3], valid: false } };
    assert_eq!(imu.default_id(), "imu_sample");
    let accel = Accel { vec: [0.0; 3], valid: false };
    assert_eq!(accel.default_id(), "accel");
}

#[test]
fn persistent_shape_skips_resize_but_still_updates_values() {
    let imu = ImuSample { duration: 2.0, size: 1, accel: Accel { vec: [9.0, 9.0, 9.0], valid: true } };
    let mut sink = FlatSink::new();
    imu.reflect(&mut sink, false);
    imu.reflect(&mut sink, true);
    let entries = sink.into_entries();
    assert_eq!(entries[0], ("duration".to_string(), 2.0));
}

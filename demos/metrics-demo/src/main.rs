//! Demonstrates a sink writing a synthetic, slowly-drifting measurement to
//! an MCAP file at a fixed rate for a fixed duration.

use std::time::Duration;

use anyhow::Result;
use intrometry::{Parameters, Reflect, Sink};
use intrometry_mcap::McapEmitter;
use structopt::StructOpt;

const APP_NAME: &str = env!("CARGO_PKG_NAME");

#[derive(Reflect)]
struct ImuSample {
    duration: f64,
    size: usize,
    accel: Accel,
}

#[derive(Reflect)]
struct Accel {
    vec: [f32; 3],
}

/// intrometry demo: write synthetic measurements to an MCAP file
#[derive(StructOpt, Debug)]
#[structopt(name = APP_NAME)]
struct Opt {
    /// Sink id; also used to derive the output filename.
    #[structopt(short, long, default_value = "metrics-demo")]
    id: String,

    /// Drain rate, in Hz.
    #[structopt(short, long, default_value = "500")]
    rate_hz: f64,

    /// How long to run before exiting, in seconds.
    #[structopt(short, long, default_value = "5")]
    duration_secs: u64,

    /// Directory the .mcap file is written into.
    #[structopt(short = "o", long, default_value = ".")]
    output_dir: String,
}

fn main() -> Result<()> {
    env_logger::init();
    let opt = Opt::from_args();

    let output_dir = opt.output_dir.clone();
    let sink_id = opt.id.clone();
    let topic_prefix = format!("intrometry/{}", intrometry::id::normalize_id(&sink_id));

    let mut sink = Sink::new(opt.id.clone(), opt.rate_hz, move || {
        McapEmitter::create(&output_dir, &sink_id, topic_prefix)
    });

    if !sink.initialize() {
        anyhow::bail!("failed to initialize intrometry sink '{}'", opt.id);
    }

    let mut sample = ImuSample { duration: 0.0, size: 0, accel: Accel { vec: [0.0; 3] } };
    sink.assign(&sample, Parameters { persistent_structure: true });

    let mut loop_helper = spin_sleep::LoopHelper::builder().build_with_target_rate(opt.rate_hz.min(1000.0));
    let deadline = std::time::Instant::now() + Duration::from_secs(opt.duration_secs);
    let mut tick = 0u64;

    while std::time::Instant::now() < deadline {
        loop_helper.loop_start();
        tick += 1;
        sample.duration = tick as f64 * 0.002;
        sample.size = tick as usize % 8;
        sample.accel.vec = [(tick as f32 * 0.1).sin(), (tick as f32 * 0.2).cos(), 0.0];
        sink.write(&sample, 0);
        loop_helper.loop_sleep();
    }

    log::info!("metrics-demo: wrote {tick} samples to '{}'", opt.output_dir);
    Ok(())
}

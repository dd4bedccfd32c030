//! Dry run of a closed-loop protocol against a scripted tracking feed.
//!
//! Run with `cargo run --example closed_loop_dry_run`.

use std::time::{Duration, Instant};

use freeswim::stim::stimuli::ClosedLoop1D;
use freeswim::stim::{
    build_sequence, Protocol, ProtocolOptions, ProtocolRunner, Stimulus, TrackingLog,
    TrackingSample, VigourEstimator,
};

#[cfg(not(feature = "tracing"))]
use log::{info, LevelFilter};

#[cfg(feature = "tracing")]
use tracing::info;

#[cfg(feature = "tracing")]
use freeswim::core::init_tracing;
#[cfg(not(feature = "tracing"))]
use freeswim::core::init_with_level;

struct ClosedLoopProtocol;

impl Protocol for ClosedLoopProtocol {
    fn name(&self) -> &str {
        "closed loop dry run"
    }

    fn stim_sequence(&self) -> Vec<Box<dyn Stimulus>> {
        vec![Box::new(ClosedLoop1D::new(2.0, 10.0, 1.0))]
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(not(feature = "tracing"))]
    init_with_level(LevelFilter::Info)?;

    #[cfg(feature = "tracing")]
    init_tracing(false);

    let tracking = TrackingLog::shared(4096);
    let estimator = VigourEstimator::new(tracking.clone(), 0.05, -30.0);

    let opts = ProtocolOptions {
        pre_pause: 0.5,
        post_pause: 0.5,
        n_repeats: 2,
    };
    let stimuli = build_sequence(&ClosedLoopProtocol, &opts);
    let mut runner = ProtocolRunner::new("closed loop dry run", stimuli, Box::new(estimator));
    info!("protocol duration: {:.1} s", runner.duration());

    // Simulate a 200 Hz tracking feed with a swim bout every other second,
    // ticking the runner at 60 Hz on a virtual clock.
    let t0 = Instant::now();
    runner.start(t0);

    let total = runner.duration();
    let mut t = 0.0_f64;
    let mut sample_t = 0.0_f64;
    while t <= total + 0.1 {
        while sample_t <= t {
            let swimming = (sample_t as u64) % 2 == 1;
            let tail = if swimming {
                (sample_t * 700.0).sin() as f32
            } else {
                0.0
            };
            tracking.lock().unwrap().push(TrackingSample {
                t: sample_t,
                x: 320.0,
                y: 240.0,
                theta: 0.0,
                tail_sum: tail,
            });
            sample_t += 0.005;
        }

        for event in runner.tick(t0 + Duration::from_secs_f64(t)) {
            info!("t={t:.2}s event: {event:?}");
        }
        t += 1.0 / 60.0;
    }

    info!(
        "{} stimulus records, {} dynamic rows",
        runner.log().len(),
        runner.dynamic_log().len()
    );
    Ok(())
}

//! Synthetic calibration round trip: render the pattern, warp it through a
//! known rig transform into a fake camera frame, calibrate, and compare.
//!
//! Run with `cargo run --example calibrate_synthetic`.

use std::{env, fs, path::PathBuf};

use freeswim::calib::CircleCalibrator;
use freeswim::core::{sample_bilinear_u8, CamProjTransform, GrayImage};
use nalgebra::Point2;
use serde::Serialize;

#[cfg(not(feature = "tracing"))]
use log::{info, LevelFilter};

#[cfg(feature = "tracing")]
use tracing::info;

#[cfg(feature = "tracing")]
use freeswim::core::init_tracing;
#[cfg(not(feature = "tracing"))]
use freeswim::core::init_with_level;

const DISPLAY: (u32, u32) = (800, 600);
const CAMERA: (usize, usize) = (640, 480);

#[derive(Debug, Serialize)]
struct ExampleReport {
    ground_truth: CamProjTransform,
    recovered: CamProjTransform,
    residual_px: f64,
    max_probe_error_px: f32,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(not(feature = "tracing"))]
    init_with_level(LevelFilter::Info)?;

    #[cfg(feature = "tracing")]
    init_tracing(false);

    run()
}

#[cfg_attr(feature = "tracing", tracing::instrument(level = "info"))]
fn run() -> Result<(), Box<dyn std::error::Error>> {
    let ground_truth = CamProjTransform::from_rows([[1.4, 0.25, 60.0], [-0.2, 1.3, 40.0]]);

    let mut calibrator = CircleCalibrator::default();
    calibrator.display_pattern(DISPLAY.0, DISPLAY.1);
    let pattern = calibrator.pattern_image().expect("display size recorded");

    let frame = camera_view_of(&pattern, &ground_truth);
    info!(
        "synthesized {}x{} camera frame of the pattern",
        frame.width, frame.height
    );

    let report = calibrator.calibrate(&frame.as_view())?;
    info!("calibration residual: {:.4} px", report.residual_px);

    let recovered = calibrator.cam_to_proj().expect("mapping");
    let max_probe_error_px = probe_error(&ground_truth, &recovered);
    info!("max probe error vs ground truth: {max_probe_error_px:.3} px");

    write_report(ExampleReport {
        ground_truth,
        recovered,
        residual_px: report.residual_px,
        max_probe_error_px,
    })
}

/// Each camera pixel sees the display point `cam_to_proj * pixel`.
fn camera_view_of(pattern: &GrayImage, cam_to_proj: &CamProjTransform) -> GrayImage {
    let src = pattern.as_view();
    let mut out = GrayImage::new(CAMERA.0, CAMERA.1);
    for y in 0..CAMERA.1 {
        for x in 0..CAMERA.0 {
            let p = Point2::new(x as f32 + 0.5, y as f32 + 0.5);
            let q = cam_to_proj.apply(p);
            out.put(x, y, sample_bilinear_u8(&src, q.x, q.y));
        }
    }
    out
}

fn probe_error(gt: &CamProjTransform, est: &CamProjTransform) -> f32 {
    [
        Point2::new(50.0_f32, 50.0),
        Point2::new(320.0_f32, 240.0),
        Point2::new(600.0_f32, 430.0),
    ]
    .iter()
    .map(|&p| nalgebra::distance(&gt.apply(p), &est.apply(p)))
    .fold(0.0, f32::max)
}

fn write_report(report: ExampleReport) -> Result<(), Box<dyn std::error::Error>> {
    let out_path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("tmpdata/calibrate_synthetic_report.json"));
    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&out_path, serde_json::to_string_pretty(&report)?)?;
    println!("wrote report JSON to {}", out_path.display());
    Ok(())
}

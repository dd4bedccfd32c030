//! High-level facade crate for the `freeswim-*` workspace.
//!
//! This crate provides:
//! - stable, convenient re-exports of the underlying layer crates
//! - (feature-gated) end-to-end calibration helpers working on
//!   `image::GrayImage` buffers or raw grayscale slices.
//!
//! ## Quickstart
//!
//! ```no_run
//! use freeswim::calib::CircleCalibrator;
//! use freeswim::calibrate;
//! use image::ImageReader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut calibrator = CircleCalibrator::default();
//! calibrator.display_pattern(1280, 720);
//! // ... operator positions the window, adjusts exposure ...
//!
//! let frame = ImageReader::open("camera_frame.png")?.decode()?.to_luma8();
//! let report = calibrate::calibrate_image(&mut calibrator, &frame)?;
//! println!("residual: {:.3} px", report.residual_px);
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `freeswim::core`: image views, the camera/projector affine transform.
//! - `freeswim::calib`: three-dot circle calibrator, dot detection,
//!   calibration persistence.
//! - `freeswim::stim`: stimulus sequencing, closed-loop stimuli,
//!   estimators.
//! - `freeswim::calibrate` (feature `image`): end-to-end helpers from
//!   `image::GrayImage`.

pub use freeswim_calib as calib;
pub use freeswim_core as core;
pub use freeswim_stim as stim;

pub use freeswim_calib::{CalibrationReport, CalibrationState, CircleCalibrator, CirclePattern};
pub use freeswim_core::CamProjTransform;
pub use freeswim_stim::{Protocol, ProtocolRunner, Stimulus};

#[cfg(feature = "image")]
pub mod calibrate;

//! Circle calibrator for a camera/projector behavioral rig.
//!
//! The projector displays three filled dots arranged as a right triangle
//! with unequal arms; the camera observes them; the calibrator matches the
//! detected dot centroids to the pattern and fits the affine map between
//! camera pixel space and projector pixel space.
//!
//! The operator stays in the loop: this crate computes the mapping and the
//! overlay data for visual inspection, it never accepts or rejects a
//! calibration on its own. Re-running [`CircleCalibrator::calibrate`]
//! replaces the previous mapping, which is the documented retry path when
//! the overlay looks wrong.

mod calibrator;
mod dots;
mod io;
mod pattern;
mod triangle;

pub use calibrator::{CalibrateError, CalibrationReport, CalibrationState, CircleCalibrator};
pub use dots::{detect_dots, otsu_threshold, DotBlob, DotDetectParams};
pub use io::{CalibIoError, CalibratorConfig};
pub use pattern::CirclePattern;
pub use triangle::order_triangle;

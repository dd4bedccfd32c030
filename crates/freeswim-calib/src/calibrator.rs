use freeswim_core::{estimate_affine, CamProjTransform, GrayImage, GrayImageView};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::dots::{detect_dots, DotDetectParams};
use crate::pattern::CirclePattern;
use crate::triangle::order_triangle;

/// Errors from the "calibrate" action. Every variant is recoverable by the
/// operator: adjust camera exposure / IR filter / window position and run
/// the actions again.
#[derive(thiserror::Error, Debug)]
pub enum CalibrateError {
    #[error("calibration pattern has not been displayed yet")]
    PatternNotDisplayed,
    #[error("expected 3 calibration dots, found {found}")]
    DotsNotFound { found: usize },
    #[error("detected dots are degenerate (collinear or too distorted)")]
    DegeneratePattern,
    #[error("camera-to-projector transform is singular")]
    SingularTransform,
}

/// Persistent calibration state. Everything needed to restore a mapping in
/// a later session, and everything the overlay inspection draws.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CalibrationState {
    /// Camera frame size the mapping was computed from.
    #[serde(default)]
    pub image_size: Option<(usize, usize)>,
    /// Display size the pattern was shown on.
    #[serde(default)]
    pub display_size: Option<(u32, u32)>,
    /// Detected dot centres in camera pixels, order `[corner, long, short]`.
    #[serde(default)]
    pub camera_points: Option<[Point2<f32>; 3]>,
    /// Pattern dot centres in projector pixels, same order.
    #[serde(default)]
    pub projector_points: Option<[Point2<f32>; 3]>,
    #[serde(default)]
    pub cam_to_proj: Option<CamProjTransform>,
    #[serde(default)]
    pub proj_to_cam: Option<CamProjTransform>,
    /// Mean reprojection distance in projector pixels.
    #[serde(default)]
    pub residual_px: Option<f64>,
}

/// What the "calibrate" action hands back for the operator's plausibility
/// check.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CalibrationReport {
    pub camera_points: [Point2<f32>; 3],
    pub projector_points: [Point2<f32>; 3],
    pub cam_to_proj: CamProjTransform,
    pub residual_px: f64,
}

/// Three-dot camera/projector calibrator.
///
/// Enabled automatically for freely-swimming experiments by the experiment
/// shell; drives the two documented actions:
///
/// 1. [`display_pattern`](Self::display_pattern) — dot centres for the
///    projector to render (or [`pattern_image`](Self::pattern_image) for a
///    pre-rasterized frame);
/// 2. [`calibrate`](Self::calibrate) — fit the affine mapping from a camera
///    frame showing the dots.
///
/// Acceptance is manual: inspect [`overlay_points`](Self::overlay_points) /
/// [`map_camera_frame`](Self::map_camera_frame) against the live view and
/// re-run the actions if the mapping looks wrong.
#[derive(Clone, Debug, Default)]
pub struct CircleCalibrator {
    pattern: CirclePattern,
    detect: DotDetectParams,
    state: CalibrationState,
}

impl CircleCalibrator {
    pub fn new(pattern: CirclePattern, detect: DotDetectParams) -> Self {
        Self {
            pattern,
            detect,
            state: CalibrationState::default(),
        }
    }

    /// Restore a calibrator around state saved by a previous session.
    pub fn with_state(pattern: CirclePattern, detect: DotDetectParams, state: CalibrationState) -> Self {
        Self {
            pattern,
            detect,
            state,
        }
    }

    pub fn pattern(&self) -> &CirclePattern {
        &self.pattern
    }

    pub fn state(&self) -> &CalibrationState {
        &self.state
    }

    pub fn cam_to_proj(&self) -> Option<CamProjTransform> {
        self.state.cam_to_proj
    }

    pub fn proj_to_cam(&self) -> Option<CamProjTransform> {
        self.state.proj_to_cam
    }

    /// The "display calibration pattern" action: record the display size and
    /// return the dot centres the projector should render.
    pub fn display_pattern(&mut self, display_w: u32, display_h: u32) -> [Point2<f32>; 3] {
        let pts = self.pattern.points(display_w, display_h);
        self.state.display_size = Some((display_w, display_h));
        self.state.projector_points = Some(pts);
        pts
    }

    /// Rasterized pattern for the recorded display size.
    pub fn pattern_image(&self) -> Option<GrayImage> {
        let (w, h) = self.state.display_size?;
        Some(self.pattern.render(w, h))
    }

    /// The "calibrate" action: detect the three dots in a camera frame and
    /// fit the camera→projector affine map.
    ///
    /// On success the previous mapping is replaced; on error the previous
    /// mapping is left untouched so a failed retry never degrades a working
    /// calibration.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, img), fields(width = img.width, height = img.height))
    )]
    pub fn calibrate(&mut self, img: &GrayImageView<'_>) -> Result<CalibrationReport, CalibrateError> {
        let projector_points = self
            .state
            .projector_points
            .ok_or(CalibrateError::PatternNotDisplayed)?;

        let blobs = detect_dots(img, &self.detect);
        if blobs.len() != 3 {
            return Err(CalibrateError::DotsNotFound { found: blobs.len() });
        }

        let camera_points = order_triangle([blobs[0].center, blobs[1].center, blobs[2].center])
            .ok_or(CalibrateError::DegeneratePattern)?;

        let cam_to_proj = estimate_affine(&camera_points, &projector_points)
            .ok_or(CalibrateError::DegeneratePattern)?;
        let proj_to_cam = cam_to_proj
            .inverse()
            .ok_or(CalibrateError::SingularTransform)?;

        let residual_px = camera_points
            .iter()
            .zip(projector_points.iter())
            .map(|(c, p)| nalgebra::distance(&cam_to_proj.apply(*c), p) as f64)
            .sum::<f64>()
            / 3.0;

        self.state.image_size = Some((img.width, img.height));
        self.state.camera_points = Some(camera_points);
        self.state.cam_to_proj = Some(cam_to_proj);
        self.state.proj_to_cam = Some(proj_to_cam);
        self.state.residual_px = Some(residual_px);

        log::info!("camera-to-projector mapping updated, residual {residual_px:.3} px");

        Ok(CalibrationReport {
            camera_points,
            projector_points,
            cam_to_proj,
            residual_px,
        })
    }

    /// Detected dot centres mapped into projector space; drawn on top of the
    /// pattern they should land on the three dots.
    pub fn overlay_points(&self) -> Option<[Point2<f32>; 3]> {
        let t = self.state.cam_to_proj?;
        let cam = self.state.camera_points?;
        Some(cam.map(|p| t.apply(p)))
    }

    /// Corners of the camera frame mapped into projector space: the quad an
    /// inspection view draws to show where the camera looks on the display.
    pub fn map_camera_frame(&self) -> Option<[Point2<f32>; 4]> {
        let t = self.state.cam_to_proj?;
        let (w, h) = self.state.image_size?;
        let w = w as f32;
        let h = h as f32;
        Some(
            [
                Point2::new(0.0, 0.0),
                Point2::new(w, 0.0),
                Point2::new(w, h),
                Point2::new(0.0, h),
            ]
            .map(|p| t.apply(p)),
        )
    }

    /// Drop any computed mapping, e.g. when the rig geometry changed.
    pub fn reset(&mut self) {
        self.state = CalibrationState::default();
    }
}

use freeswim_core::CamProjTransform;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::tracking::SharedTracking;

/// Position in projector coordinates.
///
/// `(-1, -1, 0)` is the sentinel returned while there is no calibration or
/// no valid tracking fix; closed-loop stimuli treat it as "don't steer".
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjPosition {
    pub x: f32,
    pub y: f32,
    pub theta: f32,
}

impl ProjPosition {
    pub const SENTINEL: ProjPosition = ProjPosition {
        x: -1.0,
        y: -1.0,
        theta: 0.0,
    };

    /// True for the no-fix sentinel.
    pub fn is_lost(&self) -> bool {
        self.x < 0.0
    }
}

/// Source of behavioral state for closed-loop stimuli.
///
/// One estimator is chosen per experiment type; a stimulus calls only the
/// methods it needs and falls back gracefully when the estimator does not
/// provide them.
pub trait Estimator {
    /// Swim velocity estimate at session time `t`, delayed by `lag_s`.
    fn velocity(&mut self, _t: f64, _lag_s: f64) -> Option<f64> {
        None
    }

    /// Position in projector coordinates at session time `t`.
    fn position(&mut self, _t: f64) -> Option<ProjPosition> {
        None
    }
}

/// Estimator for open-loop protocols.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullEstimator;

impl Estimator for NullEstimator {}

/// Named-column row log kept by each estimator, mirroring the shape of the
/// tracking log so estimates can be saved next to the raw data.
#[derive(Clone, Debug, Serialize)]
pub struct EstimatorLog {
    pub headers: Vec<&'static str>,
    pub rows: Vec<EstimatorRow>,
}

#[derive(Clone, Debug, Serialize)]
pub struct EstimatorRow {
    pub t: f64,
    pub values: Vec<f64>,
}

impl EstimatorLog {
    pub fn new(headers: &[&'static str]) -> Self {
        Self {
            headers: headers.to_vec(),
            rows: Vec::new(),
        }
    }

    pub fn update(&mut self, t: f64, values: &[f64]) {
        debug_assert_eq!(values.len(), self.headers.len());
        self.rows.push(EstimatorRow {
            t,
            values: values.to_vec(),
        });
    }
}

/// Swim vigour: standard deviation of the tail signal over a trailing
/// window, scaled by a (conventionally negative) gain.
pub struct VigourEstimator {
    tracking: SharedTracking,
    window_s: f64,
    base_gain: f64,
    /// Running estimate of the tracking sample interval; refined from the
    /// actual timestamps of each window.
    last_dt: f64,
    pub log: EstimatorLog,
}

impl VigourEstimator {
    pub fn new(tracking: SharedTracking, window_s: f64, base_gain: f64) -> Self {
        Self {
            tracking,
            window_s,
            base_gain,
            last_dt: 1.0 / 500.0,
            log: EstimatorLog::new(&["vigour"]),
        }
    }
}

impl Estimator for VigourEstimator {
    fn velocity(&mut self, _t: f64, lag_s: f64) -> Option<f64> {
        let n = ((self.window_s / self.last_dt).round() as usize).max(2);
        let n_lag = ((lag_s / self.last_dt).round() as i64).max(0) as usize;

        let rows = {
            let log = self.tracking.lock().expect("tracking log poisoned");
            log.last_n(n + n_lag)
        };
        if rows.len() < n {
            return None;
        }
        // Drop the lag tail: use the oldest n rows of the fetched slice.
        let window = &rows[..n];

        let new_dt = (window[n - 1].t - window[0].t) / n as f64;
        if new_dt > 0.0 {
            self.last_dt = new_dt;
        }

        let mean = window.iter().map(|s| s.tail_sum as f64).sum::<f64>() / n as f64;
        let var = window
            .iter()
            .map(|s| {
                let d = s.tail_sum as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / n as f64;
        let vigour = var.sqrt();

        self.log.update(window[n - 1].t, &[vigour]);
        Some(vigour * self.base_gain)
    }
}

/// Latest tracked position mapped into projector coordinates through the
/// calibrated camera-to-projector transform.
pub struct PositionEstimator {
    tracking: SharedTracking,
    cam_to_proj: Option<CamProjTransform>,
    pub log: EstimatorLog,
}

impl PositionEstimator {
    pub fn new(tracking: SharedTracking, cam_to_proj: Option<CamProjTransform>) -> Self {
        Self {
            tracking,
            cam_to_proj,
            log: EstimatorLog::new(&["x", "y", "theta"]),
        }
    }

    /// Swap in a fresh transform after a recalibration.
    pub fn set_transform(&mut self, cam_to_proj: Option<CamProjTransform>) {
        self.cam_to_proj = cam_to_proj;
    }
}

impl Estimator for PositionEstimator {
    fn position(&mut self, _t: f64) -> Option<ProjPosition> {
        let sample = {
            let log = self.tracking.lock().expect("tracking log poisoned");
            log.last()
        }?;

        let Some(transform) = self.cam_to_proj else {
            self.log.update(sample.t, &[-1.0, -1.0, 0.0]);
            return Some(ProjPosition::SENTINEL);
        };
        if !sample.x.is_finite() || !sample.y.is_finite() {
            self.log.update(sample.t, &[-1.0, -1.0, 0.0]);
            return Some(ProjPosition::SENTINEL);
        }

        let p = transform.apply(Point2::new(sample.x, sample.y));
        let theta = transform.rotate_direction(sample.theta as f64) as f32;

        self.log
            .update(sample.t, &[p.x as f64, p.y as f64, theta as f64]);
        Some(ProjPosition {
            x: p.x,
            y: p.y,
            theta,
        })
    }
}

/// One scripted swim bout for dry runs without a tracking pipeline.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Bout {
    /// Session time at which the bout fires.
    pub t: f64,
    /// Displacement in the animal's own frame at bout time.
    pub dx: f32,
    pub dy: f32,
    /// Heading change.
    pub theta: f32,
}

/// Plays back a scripted bout list; each bout displaces the simulated
/// animal in its current heading frame.
pub struct SimulatedEstimator {
    bouts: Vec<Bout>,
    i_bout: usize,
    coords: Point2<f32>,
    past_theta: f32,
}

impl SimulatedEstimator {
    pub fn new(mut bouts: Vec<Bout>) -> Self {
        bouts.sort_by(|a, b| a.t.total_cmp(&b.t));
        Self {
            bouts,
            i_bout: 0,
            coords: Point2::new(0.0, 0.0),
            past_theta: 0.0,
        }
    }

    pub fn reset(&mut self) {
        self.i_bout = 0;
        self.coords = Point2::new(0.0, 0.0);
        self.past_theta = 0.0;
    }
}

impl Estimator for SimulatedEstimator {
    fn position(&mut self, t: f64) -> Option<ProjPosition> {
        while self.i_bout < self.bouts.len() && self.bouts[self.i_bout].t <= t {
            let bout = self.bouts[self.i_bout];
            let (s, c) = self.past_theta.sin_cos();
            self.coords.x += c * bout.dx - s * bout.dy;
            self.coords.y += s * bout.dx + c * bout.dy;
            self.past_theta += bout.theta;
            self.i_bout += 1;
        }
        Some(ProjPosition {
            x: self.coords.x,
            y: self.coords.y,
            theta: self.past_theta,
        })
    }
}

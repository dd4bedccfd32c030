use serde::{Deserialize, Serialize};

use crate::stimulus::{Stimulus, StimulusCtx};

/// Sampled motion trajectory: positions at increasing times, linearly
/// interpolated in between and clamped at both ends.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Motion {
    pub t: Vec<f64>,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

/// Clamped linear interpolation of `(ts, vs)` at `t`.
pub fn interp(t: f64, ts: &[f64], vs: &[f64]) -> f64 {
    debug_assert_eq!(ts.len(), vs.len());
    if ts.is_empty() {
        return 0.0;
    }
    if t <= ts[0] {
        return vs[0];
    }
    if t >= ts[ts.len() - 1] {
        return vs[vs.len() - 1];
    }
    let i = ts.partition_point(|&x| x <= t);
    let (t0, t1) = (ts[i - 1], ts[i]);
    let (v0, v1) = (vs[i - 1], vs[i]);
    if t1 <= t0 {
        return v0;
    }
    v0 + (v1 - v0) * (t - t0) / (t1 - t0)
}

#[derive(Clone, Debug)]
enum Drive {
    /// Pixels per second.
    Constant { vx: f64, vy: f64 },
    Waypoints(Motion),
}

/// Seamlessly tileable background scrolled across the display.
///
/// The stimulus only advances `(x, y, theta)`; the display layer applies
/// [`display_transform`](Self::display_transform) to the texture with
/// wrap-around sampling.
#[derive(Clone, Debug)]
pub struct MovingBackground {
    duration: f64,
    pub x: f64,
    pub y: f64,
    pub theta: f64,
    drive: Drive,
}

impl MovingBackground {
    /// Background drifting at a constant velocity.
    pub fn constant(duration: f64, vx: f64, vy: f64) -> Self {
        Self {
            duration,
            x: 0.0,
            y: 0.0,
            theta: 0.0,
            drive: Drive::Constant { vx, vy },
        }
    }

    /// Background following a sampled trajectory.
    pub fn waypoints(duration: f64, motion: Motion) -> Self {
        Self {
            duration,
            x: 0.0,
            y: 0.0,
            theta: 0.0,
            drive: Drive::Waypoints(motion),
        }
    }

    pub fn with_heading(mut self, theta: f64) -> Self {
        self.theta = theta;
        self
    }

    /// 2x3 affine the display applies to the background texture.
    pub fn display_transform(&self) -> [[f64; 3]; 2] {
        if self.theta == 0.0 {
            [[1.0, 0.0, self.x], [0.0, 1.0, self.y]]
        } else {
            let (s, c) = self.theta.sin_cos();
            [[c, -s, self.x], [s, c, self.y]]
        }
    }
}

impl Stimulus for MovingBackground {
    fn name(&self) -> &str {
        "moving background"
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn update(&mut self, ctx: &mut StimulusCtx<'_>) {
        match &self.drive {
            Drive::Constant { vx, vy } => {
                self.x += vx * ctx.dt;
                self.y += vy * ctx.dt;
            }
            Drive::Waypoints(motion) => {
                self.x = interp(ctx.elapsed, &motion.t, &motion.x);
                self.y = interp(ctx.elapsed, &motion.t, &motion.y);
            }
        }
    }

    fn dynamic_state(&self) -> Option<Vec<(&'static str, f64)>> {
        Some(vec![("x", self.x), ("y", self.y), ("theta", self.theta)])
    }
}

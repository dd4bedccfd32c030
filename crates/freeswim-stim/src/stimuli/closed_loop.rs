use crate::stimulus::{Stimulus, StimulusCtx};

/// Runaway guard: grating velocities above this are treated as estimator
/// glitches and zeroed.
const MAX_GRATING_VEL: f64 = 50.0;

/// Vigour-gated closed-loop grating.
///
/// While the animal swims, its estimated velocity counteracts the base
/// drift scaled by `gain`; a gain of 1 approximates the freely-swimming
/// visual feedback. The vigour convention is negative-when-swimming, so
/// `swimming_threshold` is negative as well.
#[derive(Clone, Debug)]
pub struct ClosedLoop1D {
    duration: f64,
    pub base_vel: f64,
    pub gain: f64,
    /// Extra feedback delay in seconds.
    pub lag: f64,
    /// When true, feedback stops the moment the animal stops swimming,
    /// independent of lag.
    pub shunting: bool,
    pub swimming_threshold: f64,
    /// Fixed feedback velocity while swimming, instead of the vigour-scaled
    /// one.
    pub fixed_vel: Option<f64>,

    pub vel: f64,
    pub fish_velocity: f64,
    fish_swimming: bool,
    shunted: bool,
    bout_start: Option<f64>,

    /// Accumulated grating position.
    pub x: f64,
}

impl ClosedLoop1D {
    pub fn new(duration: f64, base_vel: f64, gain: f64) -> Self {
        Self {
            duration,
            base_vel,
            gain,
            lag: 0.0,
            shunting: false,
            swimming_threshold: 0.2 * -30.0,
            fixed_vel: None,
            vel: base_vel,
            fish_velocity: 0.0,
            fish_swimming: false,
            shunted: false,
            bout_start: None,
            x: 0.0,
        }
    }

    pub fn with_lag(mut self, lag: f64) -> Self {
        self.lag = lag;
        self
    }

    pub fn with_shunting(mut self, shunting: bool) -> Self {
        self.shunting = shunting;
        self
    }

    pub fn with_fixed_vel(mut self, fixed_vel: f64) -> Self {
        self.fixed_vel = Some(fixed_vel);
        self
    }

    pub fn is_swimming(&self) -> bool {
        self.fish_swimming
    }

    /// Stimulus-relative time at which the current bout began.
    pub fn bout_start(&self) -> Option<f64> {
        self.bout_start
    }
}

impl Stimulus for ClosedLoop1D {
    fn name(&self) -> &str {
        "closed loop 1D"
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn update(&mut self, ctx: &mut StimulusCtx<'_>) {
        self.fish_velocity = ctx.estimator.velocity(ctx.t, self.lag).unwrap_or(0.0);

        if self.base_vel == 0.0 {
            self.shunted = false;
            self.fish_swimming = false;
        }

        if self.shunting && self.fish_swimming && self.fish_velocity > self.swimming_threshold {
            self.shunted = true;
        }

        // Vigour is negative while swimming: below threshold means a bout.
        if self.fish_velocity < self.swimming_threshold {
            if !self.fish_swimming {
                self.bout_start = Some(ctx.elapsed);
            }
            self.fish_swimming = true;
        } else {
            self.fish_swimming = false;
            self.bout_start = None;
        }

        self.vel = match self.fixed_vel {
            None => {
                let feedback = if self.fish_swimming {
                    self.fish_velocity * self.gain
                } else {
                    0.0
                };
                if self.shunted {
                    0.0
                } else {
                    self.base_vel - feedback
                }
            }
            Some(fixed) => {
                if self.fish_swimming && self.base_vel != 0.0 {
                    fixed
                } else {
                    self.base_vel
                }
            }
        };

        if !self.vel.is_finite() || self.vel > MAX_GRATING_VEL {
            self.vel = 0.0;
        }

        self.x += ctx.dt * self.vel;
    }

    fn dynamic_state(&self) -> Option<Vec<(&'static str, f64)>> {
        Some(vec![
            ("vel", self.vel),
            ("fish_velocity", self.fish_velocity),
            ("gain", self.gain),
        ])
    }
}

use crate::estimators::ProjPosition;
use crate::stimulus::{Color, Stimulus, StimulusCtx};

/// Dot pinned to the estimated animal position in projector coordinates.
///
/// Keeps its last position while the fix is lost, so a tracking dropout
/// does not teleport the dot.
#[derive(Clone, Debug)]
pub struct TrackingDot {
    duration: f64,
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub color: Color,
}

impl TrackingDot {
    pub fn new(duration: f64, radius: f64, color: Color) -> Self {
        Self {
            duration,
            x: 0.0,
            y: 0.0,
            radius,
            color,
        }
    }
}

impl Stimulus for TrackingDot {
    fn name(&self) -> &str {
        "tracking dot"
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn update(&mut self, ctx: &mut StimulusCtx<'_>) {
        if let Some(pos) = ctx.estimator.position(ctx.t) {
            if !pos.is_lost() && pos.theta.is_finite() {
                self.x = pos.x as f64;
                self.y = pos.y as f64;
            }
        }
    }

    fn dynamic_state(&self) -> Option<Vec<(&'static str, f64)>> {
        Some(vec![("x", self.x), ("y", self.y)])
    }
}

/// Wraps a stimulus and swaps in a centering stimulus whenever the animal
/// strays out of the working region around the display centre.
pub struct CenteringWrapper {
    inner: Box<dyn Stimulus>,
    centering: Box<dyn Stimulus>,
    /// Distance from the display centre beyond which centering kicks in.
    margin_px: f64,
    display_center: (f64, f64),
    centering_active: bool,
}

impl CenteringWrapper {
    pub fn new(
        inner: Box<dyn Stimulus>,
        centering: Box<dyn Stimulus>,
        margin_px: f64,
        display_size: (u32, u32),
    ) -> Self {
        Self {
            inner,
            centering,
            margin_px,
            display_center: (display_size.0 as f64 / 2.0, display_size.1 as f64 / 2.0),
            centering_active: false,
        }
    }

    pub fn centering_active(&self) -> bool {
        self.centering_active
    }

    fn out_of_bounds(&self, pos: ProjPosition) -> bool {
        if pos.is_lost() {
            // No fix: centre until the animal is found again.
            return true;
        }
        let dx = pos.x as f64 - self.display_center.0;
        let dy = pos.y as f64 - self.display_center.1;
        dx * dx + dy * dy > self.margin_px * self.margin_px
    }
}

impl Stimulus for CenteringWrapper {
    fn name(&self) -> &str {
        "centering wrapper"
    }

    fn duration(&self) -> f64 {
        self.inner.duration()
    }

    fn start(&mut self) {
        self.inner.start();
        self.centering.start();
    }

    fn update(&mut self, ctx: &mut StimulusCtx<'_>) {
        if let Some(pos) = ctx.estimator.position(ctx.t) {
            self.centering_active = self.out_of_bounds(pos);
        }
        let active = if self.centering_active {
            &mut self.centering
        } else {
            &mut self.inner
        };
        active.update(ctx);
    }

    fn dynamic_state(&self) -> Option<Vec<(&'static str, f64)>> {
        let active = if self.centering_active {
            &self.centering
        } else {
            &self.inner
        };
        let mut state = vec![(
            "centering_active",
            if self.centering_active { 1.0 } else { 0.0 },
        )];
        if let Some(inner_state) = active.dynamic_state() {
            state.extend(inner_state);
        }
        Some(state)
    }
}

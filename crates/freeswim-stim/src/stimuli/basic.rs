use crate::stimulus::{Color, Stimulus};

/// Full-field color for a fixed duration.
#[derive(Clone, Debug)]
pub struct Flash {
    pub color: Color,
    duration: f64,
}

impl Flash {
    pub fn new(duration: f64, color: Color) -> Self {
        Self { color, duration }
    }
}

impl Stimulus for Flash {
    fn name(&self) -> &str {
        "flash"
    }

    fn duration(&self) -> f64 {
        self.duration
    }
}

/// Black screen: a flash with color off.
#[derive(Clone, Debug)]
pub struct Pause {
    inner: Flash,
}

impl Pause {
    pub fn new(duration: f64) -> Self {
        Self {
            inner: Flash::new(duration, [0, 0, 0]),
        }
    }

    pub fn color(&self) -> Color {
        self.inner.color
    }
}

impl Stimulus for Pause {
    fn name(&self) -> &str {
        "pause"
    }

    fn duration(&self) -> f64 {
        self.inner.duration()
    }
}

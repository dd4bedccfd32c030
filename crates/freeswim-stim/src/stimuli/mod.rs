//! Standard stimuli: full-field colors, scrolling backgrounds, and the
//! closed-loop family driven by estimators.

mod background;
mod basic;
mod closed_loop;
mod follow;

pub use background::{interp, Motion, MovingBackground};
pub use basic::{Flash, Pause};
pub use closed_loop::ClosedLoop1D;
pub use follow::{CenteringWrapper, TrackingDot};

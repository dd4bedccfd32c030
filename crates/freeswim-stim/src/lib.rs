//! Stimulation protocol engine for a projector-based behavioral rig.
//!
//! A [`Protocol`] describes a parameterized sequence of [`Stimulus`]
//! objects; the [`ProtocolRunner`] steps through the expanded sequence
//! against a caller-supplied clock, keeping per-stimulus timing free of
//! drift and logging state of dynamically-changing stimuli every tick.
//!
//! Closed-loop stimuli read from an [`Estimator`], which in turn consumes
//! tracking rows from a shared [`TrackingLog`] and, for position, the
//! camera-to-projector transform produced by the circle calibrator.
//!
//! Rendering is out of scope: stimuli expose their drawable state (colors,
//! scroll transforms, dot positions) and a display layer turns that into
//! pixels.

mod estimators;
mod protocol;
mod runner;
mod stimulus;
mod tracking;

pub mod stimuli;

pub use estimators::{
    Bout, Estimator, EstimatorLog, EstimatorRow, NullEstimator, PositionEstimator, ProjPosition,
    SimulatedEstimator, VigourEstimator,
};
pub use protocol::{build_sequence, Protocol, ProtocolOptions};
pub use runner::{DynamicRecord, ProtocolEvent, ProtocolRunner, StimulusRecord};
pub use stimulus::{Color, Stimulus, StimulusCtx};
pub use tracking::{SharedTracking, TrackingLog, TrackingSample};

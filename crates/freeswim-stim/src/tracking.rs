use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

/// One row produced by the tracking pipeline.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct TrackingSample {
    /// Seconds since session start.
    pub t: f64,
    /// Position in camera pixels; NaN while the animal is not tracked.
    pub x: f32,
    pub y: f32,
    /// Heading in radians, camera space.
    pub theta: f32,
    /// Cumulative tail curvature, the vigour signal.
    pub tail_sum: f32,
}

/// Bounded in-memory accumulator of tracking rows.
///
/// The tracking thread pushes, estimators read trailing windows. Kept
/// behind a mutex ([`SharedTracking`]) because producer and consumer live
/// on different threads in a running rig.
#[derive(Debug)]
pub struct TrackingLog {
    capacity: usize,
    rows: VecDeque<TrackingSample>,
}

/// Handle shared between the tracking producer and the estimators.
pub type SharedTracking = Arc<Mutex<TrackingLog>>;

impl TrackingLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            rows: VecDeque::new(),
        }
    }

    pub fn shared(capacity: usize) -> SharedTracking {
        Arc::new(Mutex::new(Self::new(capacity)))
    }

    pub fn push(&mut self, sample: TrackingSample) {
        if self.rows.len() == self.capacity {
            self.rows.pop_front();
        }
        self.rows.push_back(sample);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Last `n` rows in chronological order (fewer if the log is shorter).
    pub fn last_n(&self, n: usize) -> Vec<TrackingSample> {
        let skip = self.rows.len().saturating_sub(n);
        self.rows.iter().skip(skip).copied().collect()
    }

    pub fn last(&self) -> Option<TrackingSample> {
        self.rows.back().copied()
    }
}

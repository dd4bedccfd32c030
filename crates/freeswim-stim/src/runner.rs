use std::time::Instant;

use serde::Serialize;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::estimators::Estimator;
use crate::stimulus::{Stimulus, StimulusCtx};

/// State changes reported by [`ProtocolRunner::tick`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProtocolEvent {
    Started,
    /// The stimulus at this index just finished.
    StimulusChanged(usize),
    Finished,
}

/// Per-stimulus entry of the protocol log, on the nominal timeline.
#[derive(Clone, Debug, Serialize)]
pub struct StimulusRecord {
    pub name: String,
    pub t_start: f64,
    pub t_stop: f64,
}

/// One sampled row of a dynamic stimulus.
#[derive(Clone, Debug, Serialize)]
pub struct DynamicRecord {
    pub t: f64,
    pub stimulus: String,
    pub values: Vec<(&'static str, f64)>,
}

/// Steps through a stimulus sequence against a caller-supplied clock.
///
/// Stimulus boundaries advance on the *nominal* timeline (accumulated
/// declared durations), so late ticks never shift later stimuli: a tick
/// that arrives after several boundaries crosses all of them at once.
pub struct ProtocolRunner {
    protocol_name: String,
    stimuli: Vec<Box<dyn Stimulus>>,
    estimator: Box<dyn Estimator>,

    i_current: usize,
    running: bool,
    completed: bool,
    t_start: Option<Instant>,
    last_t: f64,
    /// Nominal end time of all finished stimuli.
    past_end: f64,

    log: Vec<StimulusRecord>,
    dynamic_log: Vec<DynamicRecord>,
}

impl ProtocolRunner {
    pub fn new(
        protocol_name: impl Into<String>,
        stimuli: Vec<Box<dyn Stimulus>>,
        estimator: Box<dyn Estimator>,
    ) -> Self {
        Self {
            protocol_name: protocol_name.into(),
            stimuli,
            estimator,
            i_current: 0,
            running: false,
            completed: false,
            t_start: None,
            last_t: 0.0,
            past_end: 0.0,
            log: Vec::new(),
            dynamic_log: Vec::new(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn current_index(&self) -> usize {
        self.i_current
    }

    pub fn current_stimulus(&self) -> Option<&dyn Stimulus> {
        self.stimuli.get(self.i_current).map(|s| s.as_ref())
    }

    /// Total nominal duration in seconds.
    pub fn duration(&self) -> f64 {
        self.stimuli.iter().map(|s| s.duration()).sum()
    }

    pub fn log(&self) -> &[StimulusRecord] {
        &self.log
    }

    pub fn dynamic_log(&self) -> &[DynamicRecord] {
        &self.dynamic_log
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, now), fields(protocol = %self.protocol_name))
    )]
    pub fn start(&mut self, now: Instant) -> Vec<ProtocolEvent> {
        self.reset();
        self.t_start = Some(now);
        self.running = true;

        log::info!("{} protocol started", self.protocol_name);
        let mut events = vec![ProtocolEvent::Started];

        match self.stimuli.first_mut() {
            Some(first) => first.start(),
            None => {
                self.running = false;
                self.completed = true;
                log::info!("{} protocol finished (empty)", self.protocol_name);
                events.push(ProtocolEvent::Finished);
            }
        }
        events
    }

    /// Advance to `now`: cross any nominal stimulus boundaries that have
    /// passed, then update the current stimulus.
    pub fn tick(&mut self, now: Instant) -> Vec<ProtocolEvent> {
        if !self.running {
            return Vec::new();
        }
        let Some(t_start) = self.t_start else {
            return Vec::new();
        };

        let t = now.duration_since(t_start).as_secs_f64();
        let dt = (t - self.last_t).max(0.0);
        self.last_t = t;

        let mut events = Vec::new();

        while t - self.past_end > self.stimuli[self.i_current].duration() {
            let duration = self.stimuli[self.i_current].duration();
            events.push(ProtocolEvent::StimulusChanged(self.i_current));
            self.log.push(StimulusRecord {
                name: self.stimuli[self.i_current].name().to_string(),
                t_start: self.past_end,
                t_stop: self.past_end + duration,
            });

            if self.i_current + 1 >= self.stimuli.len() {
                self.running = false;
                self.completed = true;
                log::info!("{} protocol finished", self.protocol_name);
                events.push(ProtocolEvent::Finished);
                return events;
            }

            self.past_end += duration;
            self.i_current += 1;
            self.stimuli[self.i_current].start();
        }

        let elapsed = t - self.past_end;
        let stim = &mut self.stimuli[self.i_current];
        let mut ctx = StimulusCtx {
            t,
            elapsed,
            dt,
            estimator: self.estimator.as_mut(),
        };
        stim.update(&mut ctx);

        if let Some(values) = stim.dynamic_state() {
            self.dynamic_log.push(DynamicRecord {
                t,
                stimulus: stim.name().to_string(),
                values,
            });
        }

        events
    }

    /// Interrupt a running protocol, logging the current stimulus up to the
    /// interruption time.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, now), fields(protocol = %self.protocol_name))
    )]
    pub fn stop(&mut self, now: Instant) {
        if !self.running {
            return;
        }
        self.running = false;

        let t = self
            .t_start
            .map(|s| now.duration_since(s).as_secs_f64())
            .unwrap_or(0.0);
        if let Some(stim) = self.stimuli.get(self.i_current) {
            self.log.push(StimulusRecord {
                name: stim.name().to_string(),
                t_start: self.past_end,
                t_stop: t,
            });
        }
        log::info!("{} protocol interrupted at {t:.3} s", self.protocol_name);
    }

    /// Rewind to the first stimulus and clear both logs. Called implicitly
    /// by [`start`](Self::start).
    pub fn reset(&mut self) {
        self.i_current = 0;
        self.running = false;
        self.completed = false;
        self.t_start = None;
        self.last_t = 0.0;
        self.past_end = 0.0;
        self.log.clear();
        self.dynamic_log.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimators::NullEstimator;
    use crate::stimuli::{Flash, MovingBackground, Pause};
    use std::time::Duration;

    fn at(t0: Instant, secs: f64) -> Instant {
        t0 + Duration::from_secs_f64(secs)
    }

    fn runner(stimuli: Vec<Box<dyn Stimulus>>) -> ProtocolRunner {
        ProtocolRunner::new("test", stimuli, Box::new(NullEstimator))
    }

    #[test]
    fn walks_the_sequence_on_the_nominal_timeline() {
        let mut r = runner(vec![
            Box::new(Pause::new(1.0)),
            Box::new(Flash::new(0.5, [255, 255, 255])),
        ]);
        assert_eq!(r.duration(), 1.5);

        let t0 = Instant::now();
        assert_eq!(r.start(t0), vec![ProtocolEvent::Started]);
        assert!(r.is_running());

        assert!(r.tick(at(t0, 0.4)).is_empty());
        assert_eq!(r.current_index(), 0);

        let events = r.tick(at(t0, 1.2));
        assert_eq!(events, vec![ProtocolEvent::StimulusChanged(0)]);
        assert_eq!(r.current_index(), 1);

        let events = r.tick(at(t0, 1.6));
        assert_eq!(
            events,
            vec![ProtocolEvent::StimulusChanged(1), ProtocolEvent::Finished]
        );
        assert!(r.is_completed());
        assert!(!r.is_running());

        // Log records use nominal boundaries.
        assert_eq!(r.log().len(), 2);
        assert_eq!(r.log()[0].t_start, 0.0);
        assert_eq!(r.log()[0].t_stop, 1.0);
        assert_eq!(r.log()[1].t_start, 1.0);
        assert_eq!(r.log()[1].t_stop, 1.5);
    }

    #[test]
    fn a_late_tick_crosses_several_boundaries() {
        let mut r = runner(vec![
            Box::new(Pause::new(0.2)),
            Box::new(Pause::new(0.2)),
            Box::new(Pause::new(5.0)),
        ]);
        let t0 = Instant::now();
        r.start(t0);

        let events = r.tick(at(t0, 1.0));
        assert_eq!(
            events,
            vec![
                ProtocolEvent::StimulusChanged(0),
                ProtocolEvent::StimulusChanged(1)
            ]
        );
        assert_eq!(r.current_index(), 2);
    }

    #[test]
    fn empty_protocol_finishes_immediately() {
        let mut r = runner(Vec::new());
        let events = r.start(Instant::now());
        assert_eq!(events, vec![ProtocolEvent::Started, ProtocolEvent::Finished]);
        assert!(r.is_completed());
    }

    #[test]
    fn stop_records_the_interrupted_stimulus() {
        let mut r = runner(vec![Box::new(Pause::new(10.0))]);
        let t0 = Instant::now();
        r.start(t0);
        r.tick(at(t0, 1.0));
        r.stop(at(t0, 2.5));

        assert!(!r.is_running());
        assert!(!r.is_completed());
        assert_eq!(r.log().len(), 1);
        assert_eq!(r.log()[0].t_start, 0.0);
        assert!((r.log()[0].t_stop - 2.5).abs() < 1e-6);
    }

    #[test]
    fn dynamic_stimuli_are_sampled_every_tick() {
        let mut r = runner(vec![Box::new(MovingBackground::constant(5.0, 10.0, 0.0))]);
        let t0 = Instant::now();
        r.start(t0);
        r.tick(at(t0, 0.1));
        r.tick(at(t0, 0.2));

        let rows = r.dynamic_log();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].stimulus, "moving background");
        let x1 = rows[1].values.iter().find(|(k, _)| *k == "x").expect("x").1;
        assert!((x1 - 2.0).abs() < 1e-6);

        // Static stimuli do not produce rows.
        let mut still = runner(vec![Box::new(Pause::new(1.0))]);
        still.start(t0);
        still.tick(at(t0, 0.1));
        assert!(still.dynamic_log().is_empty());

        // The protocol log serializes for the session archive.
        let json = serde_json::to_string(&r.dynamic_log()).expect("json");
        assert!(json.contains("moving background"));
    }

    #[test]
    fn restart_clears_previous_logs() {
        let mut r = runner(vec![Box::new(Pause::new(0.1)), Box::new(Pause::new(0.1))]);
        let t0 = Instant::now();
        r.start(t0);
        r.tick(at(t0, 0.35));
        assert!(r.is_completed());
        assert_eq!(r.log().len(), 2);

        let t1 = at(t0, 10.0);
        r.start(t1);
        assert!(r.log().is_empty());
        assert!(r.is_running());
        assert_eq!(r.current_index(), 0);
    }
}

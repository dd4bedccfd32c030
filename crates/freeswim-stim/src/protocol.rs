use serde::{Deserialize, Serialize};

use crate::stimuli::Pause;
use crate::stimulus::Stimulus;

/// A parameterized recipe for a stimulus sequence.
///
/// Protocols stay light: they only generate stimuli. Timing, repeats, and
/// the bracketing pauses are handled by [`build_sequence`] and the
/// [`ProtocolRunner`](crate::ProtocolRunner).
pub trait Protocol {
    fn name(&self) -> &str;

    /// One repetition of the protocol's stimuli.
    fn stim_sequence(&self) -> Vec<Box<dyn Stimulus>>;
}

/// Options shared by every protocol.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ProtocolOptions {
    /// Black screen before the first repetition, seconds.
    pub pre_pause: f64,
    /// Black screen after the last repetition, seconds.
    pub post_pause: f64,
    pub n_repeats: usize,
}

impl Default for ProtocolOptions {
    fn default() -> Self {
        Self {
            pre_pause: 0.0,
            post_pause: 0.0,
            n_repeats: 1,
        }
    }
}

/// Expand a protocol into the full runnable sequence: optional pre-pause,
/// `n_repeats` repetitions (at least one), optional post-pause.
pub fn build_sequence(protocol: &dyn Protocol, opts: &ProtocolOptions) -> Vec<Box<dyn Stimulus>> {
    let mut stimuli: Vec<Box<dyn Stimulus>> = Vec::new();

    if opts.pre_pause > 0.0 {
        stimuli.push(Box::new(Pause::new(opts.pre_pause)));
    }

    for _ in 0..opts.n_repeats.max(1) {
        stimuli.extend(protocol.stim_sequence());
    }

    if opts.post_pause > 0.0 {
        stimuli.push(Box::new(Pause::new(opts.post_pause)));
    }

    stimuli
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stimuli::Flash;

    struct TwoFlashes;

    impl Protocol for TwoFlashes {
        fn name(&self) -> &str {
            "two flashes"
        }

        fn stim_sequence(&self) -> Vec<Box<dyn Stimulus>> {
            vec![
                Box::new(Flash::new(1.0, [255, 255, 255])),
                Box::new(Flash::new(0.5, [255, 0, 0])),
            ]
        }
    }

    #[test]
    fn repeats_and_pauses_expand() {
        let opts = ProtocolOptions {
            pre_pause: 2.0,
            post_pause: 3.0,
            n_repeats: 3,
        };
        let seq = build_sequence(&TwoFlashes, &opts);

        assert_eq!(seq.len(), 2 + 3 * 2);
        assert_eq!(seq[0].name(), "pause");
        assert_eq!(seq[0].duration(), 2.0);
        assert_eq!(seq[1].name(), "flash");
        assert_eq!(seq.last().expect("post").duration(), 3.0);
    }

    #[test]
    fn zero_repeats_still_runs_once() {
        let opts = ProtocolOptions {
            n_repeats: 0,
            ..ProtocolOptions::default()
        };
        let seq = build_sequence(&TwoFlashes, &opts);
        assert_eq!(seq.len(), 2);
        assert_eq!(seq[0].name(), "flash");
    }
}

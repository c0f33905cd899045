/// Maximum number of segments an [`Envelope`] can hold.
pub const MAX_SEGMENTS: usize = 5;

/// Curvature applied to every segment of the voice envelopes.
/// Negative values rise quickly and settle slowly.
pub const ENVELOPE_CURVE: f32 = -4.0;

/// Segment indices of the five-segment voice envelope.
pub const DELAY: usize = 0;
pub const ATTACK: usize = 1;
pub const DECAY: usize = 2;
pub const SUSTAIN: usize = 3;
pub const RELEASE: usize = 4;

/// A multi-segment envelope with curved segments and an optional sustain hold.
///
/// Segment `i` runs from `levels[i]` to `levels[i + 1]` over `lengths[i]` seconds.
/// When the envelope reaches the sustain segment it holds `levels[sustain]` until
/// [`Envelope::release`] is called, which jumps to the final segment starting from
/// the current output value.
#[derive(Clone, Copy, Debug)]
pub struct Envelope {
    /// Duration of a sample in seconds.
    inv_sample_rate: f32,
    /// Segment lengths in seconds.
    lengths: [f32; MAX_SEGMENTS],
    /// Breakpoint levels; one more than the number of segments.
    levels: [f32; MAX_SEGMENTS + 1],
    /// Number of segments in use.
    segments: usize,
    /// Segment at which the envelope holds until released.
    sustain: Option<usize>,
    curve: f32,
    state: EnvelopeState,
    /// The current output value.
    value: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum EnvelopeState {
    Running {
        /// The index of the current segment.
        segment: usize,
        /// The level the current segment started at.
        start: f32,
        /// The progress through the current segment between 0 and 1.
        t: f32,
        released: bool,
    },
    Done,
}

impl Envelope {
    /// The delay/attack/decay/sustain/release envelope used by every partial.
    pub fn dadsr(sample_rate: f32) -> Self {
        let mut env = Self::new(sample_rate, 5, Some(SUSTAIN), ENVELOPE_CURVE);
        env.levels = [0.0, 0.0, 1.0, 1.0, 1.0, 0.0];
        env.lengths = [0.0, 0.01, 0.1, f32::INFINITY, 0.5];
        env
    }

    /// Attack, hold, release; used to fade amplitude modulation in and out.
    pub fn attack_release(sample_rate: f32) -> Self {
        let mut env = Self::new(sample_rate, 3, Some(1), ENVELOPE_CURVE);
        env.levels[..4].copy_from_slice(&[0.0, 1.0, 1.0, 0.0]);
        env.lengths[..3].copy_from_slice(&[0.1, f32::INFINITY, 0.5]);
        env
    }

    /// A two segment attack/decay shape without sustain.
    pub fn attack_decay(sample_rate: f32) -> Self {
        let mut env = Self::new(sample_rate, 2, None, ENVELOPE_CURVE);
        env.levels[..3].copy_from_slice(&[0.0, 1.0, 0.0]);
        env.lengths[..2].copy_from_slice(&[0.005, 0.5]);
        env
    }

    /// Creates an envelope that starts out finished.
    pub fn new(sample_rate: f32, segments: usize, sustain: Option<usize>, curve: f32) -> Self {
        let segments = segments.clamp(1, MAX_SEGMENTS);
        Self {
            inv_sample_rate: sample_rate.recip(),
            lengths: [0.0; MAX_SEGMENTS],
            levels: [0.0; MAX_SEGMENTS + 1],
            segments,
            sustain: sustain.filter(|&s| s < segments),
            curve,
            state: EnvelopeState::Done,
            value: 0.0,
        }
    }

    /// Sets the length of a segment in seconds. Negative lengths are treated as zero.
    pub fn set_length(&mut self, segment: usize, seconds: f32) {
        if segment < self.segments {
            self.lengths[segment] = seconds.max(0.0);
        }
    }

    /// Sets the breakpoint level at index `point` (`0..=segments`).
    pub fn set_level(&mut self, point: usize, level: f32) {
        if point <= self.segments {
            self.levels[point] = level;
        }
    }

    /// Sets the sustain level of a [`Envelope::dadsr`] envelope.
    pub fn set_sustain_level(&mut self, level: f32) {
        self.set_level(SUSTAIN, level);
        self.set_level(RELEASE, level);
    }

    pub fn length(&self, segment: usize) -> f32 {
        self.lengths[segment]
    }

    /// Restarts the envelope from its first segment.
    pub fn reset(&mut self) {
        self.state = EnvelopeState::Running {
            segment: 0,
            start: self.levels[0],
            t: 0.0,
            released: false,
        };
        self.value = self.levels[0];
    }

    /// Moves into the final segment, starting from the current output value.
    pub fn release(&mut self) {
        if let EnvelopeState::Running { .. } = self.state {
            self.state = EnvelopeState::Running {
                segment: self.segments - 1,
                start: self.value,
                t: 0.0,
                released: true,
            };
        }
    }

    pub fn done(&self) -> bool {
        self.state == EnvelopeState::Done
    }

    /// Whether the envelope is holding at its sustain point.
    pub fn sustaining(&self) -> bool {
        matches!(
            self.state,
            EnvelopeState::Running { segment, released: false, .. } if Some(segment) == self.sustain
        )
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    /// Produces the next output sample.
    pub fn process(&mut self) -> f32 {
        loop {
            let EnvelopeState::Running {
                segment,
                start,
                t,
                released,
            } = self.state
            else {
                self.value = self.levels[self.segments];
                return self.value;
            };

            if !released && Some(segment) == self.sustain {
                self.value = self.levels[segment];
                return self.value;
            }

            let samples = self.lengths[segment] / self.inv_sample_rate;
            if t >= 1.0 || !(samples >= 1.0) {
                self.advance(segment, released);
                continue;
            }

            let end = self.levels[segment + 1];
            self.value = shape(start, end, t, self.curve);
            self.state = EnvelopeState::Running {
                segment,
                start,
                t: t + samples.recip(),
                released,
            };
            return self.value;
        }
    }

    fn advance(&mut self, segment: usize, released: bool) {
        let next = segment + 1;
        self.state = if next >= self.segments {
            EnvelopeState::Done
        } else {
            EnvelopeState::Running {
                segment: next,
                start: self.levels[next],
                t: 0.0,
                released,
            }
        };
    }
}

/// Interpolates from `start` to `end` with exponential curvature `curve`.
fn shape(start: f32, end: f32, t: f32, curve: f32) -> f32 {
    if curve.abs() < 1e-3 {
        start + (end - start) * t
    } else {
        let k = (1.0 - (curve * t).exp()) / (1.0 - curve.exp());
        start + (end - start) * k
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const SR: f32 = 1000.0;

    fn voice_envelope(sustain: f32, release: f32) -> Envelope {
        let mut env = Envelope::dadsr(SR);
        env.set_length(DELAY, 0.0);
        env.set_length(ATTACK, 0.01);
        env.set_length(DECAY, 0.02);
        env.set_sustain_level(sustain);
        env.set_length(RELEASE, release);
        env.reset();
        env
    }

    #[test]
    fn test_new_envelope_is_done() {
        let env = Envelope::dadsr(SR);
        assert!(env.done());
    }

    #[test]
    fn test_holds_sustain_until_released() {
        let mut env = voice_envelope(0.5, 0.1);
        for _ in 0..100 {
            env.process();
        }
        for _ in 0..10_000 {
            assert_eq!(env.process(), 0.5);
        }
        assert!(env.sustaining());
        assert!(!env.done());

        env.release();
        let mut prev = 0.5;
        let mut steps = 0;
        while !env.done() {
            let value = env.process();
            if value > 0.0 {
                assert!(value < prev || steps == 0, "release must decrease");
            }
            prev = value;
            steps += 1;
            assert!(steps <= 102, "release must finish within its length");
        }
        assert_eq!(env.process(), 0.0);
    }

    #[test]
    fn test_delay_outputs_silence() {
        let mut env = voice_envelope(1.0, 0.1);
        env.set_length(DELAY, 0.05);
        env.reset();
        for _ in 0..50 {
            assert_eq!(env.process(), 0.0);
        }
        for _ in 0..5 {
            env.process();
        }
        assert!(env.value() > 0.0);
    }

    #[test]
    fn test_release_during_attack_keeps_phase() {
        let mut env = voice_envelope(0.8, 0.1);
        for _ in 0..5 {
            env.process();
        }
        let before = env.value();
        assert!(before > 0.0 && before < 1.0);
        env.release();
        let after = env.process();
        assert!((after - before).abs() < 1e-6, "release starts from the current value");
    }

    #[test]
    fn test_attack_decay_finishes_without_release() {
        let mut env = Envelope::attack_decay(SR);
        env.set_length(0, 0.01);
        env.set_length(1, 0.01);
        env.reset();
        for _ in 0..25 {
            env.process();
        }
        assert!(env.done());
    }

    #[test]
    fn test_linear_shape() {
        assert_eq!(shape(0.0, 1.0, 0.5, 0.0), 0.5);
        assert!(shape(0.0, 1.0, 0.5, -4.0) > 0.5);
    }
}

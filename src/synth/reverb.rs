/// A fixed-length circular delay line.
#[derive(Clone, Debug)]
pub struct DelayLine {
    buf: Box<[f32]>,
    idx: usize,
}

impl DelayLine {
    pub fn new(length: usize) -> Self {
        Self {
            buf: vec![0.0; length.max(1)].into_boxed_slice(),
            idx: 0,
        }
    }

    /// Returns the sample written `len()` samples ago.
    #[inline]
    pub fn read(&self) -> f32 {
        self.buf[self.idx]
    }

    /// Overwrites the oldest sample and advances the head.
    #[inline]
    pub fn write(&mut self, sample: f32) {
        self.buf[self.idx] = sample;
        self.idx = (self.idx + 1) % self.buf.len();
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn clear(&mut self) {
        self.buf.fill(0.0);
    }
}

/// Feedback comb filter with a damped feedback path.
#[derive(Clone, Debug)]
struct Comb {
    line: DelayLine,
    feedback: f32,
    damp: f32,
    store: f32,
}

impl Comb {
    #[inline]
    fn process(&mut self, s_in: f32) -> f32 {
        let s_out = self.line.read();
        self.store = s_out * (1.0 - self.damp) + self.store * self.damp;
        self.line.write(s_in + self.store * self.feedback);
        s_out
    }
}

#[derive(Clone, Debug)]
struct Allpass {
    line: DelayLine,
}

impl Allpass {
    #[inline]
    fn process(&mut self, s_in: f32) -> f32 {
        let delayed = self.line.read();
        let s_out = delayed - s_in;
        self.line.write(s_in + 0.5 * delayed);
        s_out
    }
}

/// Comb tunings in samples at 44.1 kHz.
const COMB_TUNINGS: [usize; 4] = [1116, 1277, 1422, 1557];
const ALLPASS_TUNINGS: [usize; 2] = [556, 441];

/// A small mono Schroeder reverb: parallel combs into series all-passes.
#[derive(Clone, Debug)]
pub struct Reverb {
    combs: Vec<Comb>,
    allpasses: Vec<Allpass>,
    mix: f32,
}

impl Reverb {
    pub fn new(sample_rate: f32) -> Self {
        let scale = sample_rate / 44_100.0;
        let scaled = |n: usize| ((n as f32) * scale).round() as usize;
        Self {
            combs: COMB_TUNINGS
                .iter()
                .map(|&n| Comb {
                    line: DelayLine::new(scaled(n)),
                    feedback: 0.84,
                    damp: 0.2,
                    store: 0.0,
                })
                .collect(),
            allpasses: ALLPASS_TUNINGS
                .iter()
                .map(|&n| Allpass {
                    line: DelayLine::new(scaled(n)),
                })
                .collect(),
            mix: 0.3,
        }
    }

    /// Sets the wet/dry balance between 0 (dry) and 1 (wet).
    pub fn set_mix(&mut self, mix: f32) {
        self.mix = mix.clamp(0.0, 1.0);
    }

    pub fn clear(&mut self) {
        for comb in &mut self.combs {
            comb.line.clear();
            comb.store = 0.0;
        }
        for allpass in &mut self.allpasses {
            allpass.line.clear();
        }
    }

    #[inline]
    pub fn process(&mut self, s_in: f32) -> f32 {
        let input = 0.015 * s_in;
        let mut wet: f32 = self.combs.iter_mut().map(|comb| comb.process(input)).sum();
        for allpass in &mut self.allpasses {
            wet = allpass.process(wet);
        }
        s_in * (1.0 - self.mix) + wet * self.mix * 4.0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_delay_line_delays_by_length() {
        let mut line = DelayLine::new(3);
        let mut out = vec![];
        for s in [1.0, 2.0, 3.0, 4.0, 5.0] {
            out.push(line.read());
            line.write(s);
        }
        assert_eq!(out, vec![0.0, 0.0, 0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_reverb_tail_decays() {
        let mut reverb = Reverb::new(8000.0);
        reverb.set_mix(1.0);
        reverb.process(1.0);
        let mut tail = 0.0f32;
        for _ in 0..2000 {
            tail = tail.max(reverb.process(0.0).abs());
        }
        assert!(tail > 0.0, "impulse should ring");
        for _ in 0..80_000 {
            reverb.process(0.0);
        }
        assert!(reverb.process(0.0).abs() < 1e-4);
    }
}

use std::f32::consts::PI;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Waveform {
    Sine,
    Sawtooth,
}

/// A phase accumulator producing a sine or sawtooth wave.
#[derive(Clone, Copy, Debug)]
pub struct Oscillator {
    inv_sample_rate: f32,
    wave: Waveform,
    frequency: f32,
    phase: f32,
}

impl Oscillator {
    pub fn new(wave: Waveform, sample_rate: f32) -> Self {
        Self {
            inv_sample_rate: sample_rate.recip(),
            wave,
            frequency: 0.0,
            phase: 0.0,
        }
    }

    pub fn set_frequency(&mut self, frequency: f32) {
        self.frequency = frequency;
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    /// Produces the next sample and advances the phase.
    #[inline]
    pub fn process(&mut self) -> f32 {
        let sample = match self.wave {
            Waveform::Sine => sine(self.phase),
            Waveform::Sawtooth => sawtooth(self.phase),
        };
        self.phase += self.frequency * self.inv_sample_rate;
        self.phase -= self.phase.floor();
        sample
    }
}

/// A sine whose phase is itself modulated by a second, slower sine.
///
/// Used as a slowly wandering control signal in `[-1, 1]`.
#[derive(Clone, Copy, Debug)]
pub struct SineInSine {
    carrier: Oscillator,
    modulator: Oscillator,
    depth: f32,
}

impl SineInSine {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            carrier: Oscillator::new(Waveform::Sine, sample_rate),
            modulator: Oscillator::new(Waveform::Sine, sample_rate),
            depth: 0.0,
        }
    }

    pub fn set(&mut self, carrier_hz: f32, modulator_hz: f32, depth: f32) {
        self.carrier.set_frequency(carrier_hz);
        self.modulator.set_frequency(modulator_hz);
        self.depth = depth;
    }

    #[inline]
    pub fn process(&mut self) -> f32 {
        let offset = self.depth * self.modulator.process();
        let phase = self.carrier.phase + offset;
        self.carrier.process();
        (2.0 * PI * phase).sin()
    }
}

fn sine(phase: f32) -> f32 {
    (2.0 * PI * phase).sin()
}

fn sawtooth(phase: f32) -> f32 {
    2.0 * phase - 1.0
}

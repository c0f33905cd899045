use super::envelope::{Envelope, ATTACK, DECAY, DELAY, RELEASE};
use super::filter::DcBlocker;
use super::oscillator::{Oscillator, SineInSine, Waveform};
use super::reverb::Reverb;
use super::{Instrument, SynthCommand};
use crate::audio::buffer::ChannelBuffer;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Named bounds for [`ChaosSynth::randomize`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChaosPreset {
    Noisy,
    Clean,
}

impl ChaosPreset {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "noisy" => Some(ChaosPreset::Noisy),
            "clean" => Some(ChaosPreset::Clean),
            _ => None,
        }
    }

    fn ranges(self) -> ChaosRanges {
        match self {
            ChaosPreset::Noisy => ChaosRanges {
                detune: 0.005..=0.05,
                mod_rate: 0.05..=0.8,
                mod_depth: 0.5..=3.0,
                noise_density: 0.0005..=0.005,
                noise_level: 0.2..=0.6,
                reverb_mix: 0.2..=0.6,
            },
            ChaosPreset::Clean => ChaosRanges {
                detune: 0.0005..=0.005,
                mod_rate: 0.01..=0.1,
                mod_depth: 0.0..=0.5,
                noise_density: 0.0..=0.0002,
                noise_level: 0.0..=0.1,
                reverb_mix: 0.1..=0.3,
            },
        }
    }
}

struct ChaosRanges {
    detune: RangeInclusive<f32>,
    mod_rate: RangeInclusive<f32>,
    mod_depth: RangeInclusive<f32>,
    noise_density: RangeInclusive<f32>,
    noise_level: RangeInclusive<f32>,
    reverb_mix: RangeInclusive<f32>,
}

impl ChaosRanges {
    fn contains(&self, params: &ChaosParams) -> bool {
        self.detune.contains(&params.detune)
            && self.mod_rate.contains(&params.mod_rate)
            && self.mod_depth.contains(&params.mod_depth)
            && self.noise_density.contains(&params.noise_density)
            && self.noise_level.contains(&params.noise_level)
            && self.reverb_mix.contains(&params.reverb_mix)
    }
}

/// The drone's timbre settings.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChaosParams {
    /// Detuning of the second sawtooth as a fraction of the fundamental.
    pub detune: f32,
    /// Rate of the crossfade modulators in Hz.
    pub mod_rate: f32,
    /// Depth of the inner sine of each modulator.
    pub mod_depth: f32,
    /// Probability per sample that a noise burst starts.
    pub noise_density: f32,
    pub noise_level: f32,
    pub reverb_mix: f32,
}

impl Default for ChaosParams {
    fn default() -> Self {
        Self {
            detune: 0.002,
            mod_rate: 0.05,
            mod_depth: 0.3,
            noise_density: 0.0001,
            noise_level: 0.05,
            reverb_mix: 0.2,
        }
    }
}

/// Noise that switches on in random bursts, holding each random value for a few samples.
#[derive(Clone, Debug)]
struct NoiseBursts {
    remaining: u32,
    hold: u32,
    countdown: u32,
    value: f32,
}

impl NoiseBursts {
    const HOLD_SAMPLES: u32 = 8;

    #[inline]
    fn process(&mut self, density: f32, rng: &mut SmallRng) -> f32 {
        if self.remaining == 0 {
            if density <= 0.0 || rng.gen::<f32>() >= density {
                return 0.0;
            }
            self.remaining = rng.gen_range(200..4000);
            self.countdown = 0;
        }
        self.remaining -= 1;
        if self.countdown == 0 {
            self.value = rng.gen_range(-1.0..1.0);
            self.countdown = self.hold;
        }
        self.countdown -= 1;
        self.value
    }
}

/// A single always-on drone: two detuned sawtooths crossfaded by slow
/// sine-in-sine modulators, noise bursts, reverb and an outer gate.
pub struct ChaosSynth {
    level: f32,
    fundamental: f32,
    saw_a: Oscillator,
    saw_b: Oscillator,
    fade_a: SineInSine,
    fade_b: SineInSine,
    noise: NoiseBursts,
    reverb: Reverb,
    dc: DcBlocker,
    gate: Envelope,
    channels: Vec<usize>,
    params: ChaosParams,
    rng: SmallRng,
}

impl ChaosSynth {
    pub fn new(sample_rate: f32, channels: Vec<usize>, seed: u64) -> Self {
        let mut gate = Envelope::dadsr(sample_rate);
        gate.set_length(DELAY, 0.0);
        gate.set_length(ATTACK, 2.0);
        gate.set_length(DECAY, 0.0);
        gate.set_sustain_level(1.0);
        gate.set_length(RELEASE, 4.0);

        let mut synth = Self {
            level: 0.5,
            fundamental: 55.0,
            saw_a: Oscillator::new(Waveform::Sawtooth, sample_rate),
            saw_b: Oscillator::new(Waveform::Sawtooth, sample_rate),
            fade_a: SineInSine::new(sample_rate),
            fade_b: SineInSine::new(sample_rate),
            noise: NoiseBursts {
                remaining: 0,
                hold: NoiseBursts::HOLD_SAMPLES,
                countdown: 0,
                value: 0.0,
            },
            reverb: Reverb::new(sample_rate),
            dc: DcBlocker::new(),
            gate,
            channels,
            params: ChaosParams::default(),
            rng: SmallRng::seed_from_u64(seed),
        };
        synth.set_params(ChaosParams::default());
        synth
    }

    pub fn params(&self) -> ChaosParams {
        self.params
    }

    pub fn set_params(&mut self, params: ChaosParams) {
        self.params = params;
        self.retune();
        // Detuned rates keep the two crossfades from locking together
        self.fade_a.set(params.mod_rate, params.mod_rate * 0.37, params.mod_depth);
        self.fade_b.set(params.mod_rate * 1.31, params.mod_rate * 0.23, params.mod_depth);
        self.reverb.set_mix(params.reverb_mix);
    }

    /// Draws new timbre settings uniformly from the bounds of `preset`.
    pub fn randomize(&mut self, preset: ChaosPreset) {
        let r = preset.ranges();
        let params = ChaosParams {
            detune: self.rng.gen_range(r.detune),
            mod_rate: self.rng.gen_range(r.mod_rate),
            mod_depth: self.rng.gen_range(r.mod_depth),
            noise_density: self.rng.gen_range(r.noise_density),
            noise_level: self.rng.gen_range(r.noise_level),
            reverb_mix: self.rng.gen_range(r.reverb_mix),
        };
        self.set_params(params);
    }

    /// Restarts the outer gate.
    pub fn trigger(&mut self, level: f32, fundamental: f32) {
        self.level = level;
        self.fundamental = fundamental;
        self.retune();
        self.gate.reset();
    }

    pub fn release(&mut self) {
        self.gate.release();
    }

    pub fn done(&self) -> bool {
        self.gate.done()
    }

    fn retune(&mut self) {
        self.saw_a.set_frequency(self.fundamental);
        self.saw_b.set_frequency(self.fundamental * (1.0 + self.params.detune));
    }

    #[inline]
    fn next_sample(&mut self) -> f32 {
        let mix_a = 0.5 + 0.5 * self.fade_a.process();
        let mix_b = 0.5 + 0.5 * self.fade_b.process();
        let saws = mix_a * self.saw_a.process() + mix_b * self.saw_b.process();
        let noise = self.params.noise_level * self.noise.process(self.params.noise_density, &mut self.rng);
        let wet = self.reverb.process(0.5 * saws + noise);
        self.dc.process(wet) * self.gate.process() * self.level
    }
}

impl Instrument for ChaosSynth {
    fn handle(&mut self, command: SynthCommand) -> bool {
        match command {
            SynthCommand::Trigger(params) => self.trigger(params.level, params.fundamental),
            SynthCommand::Release(_) | SynthCommand::ReleaseAll => self.release(),
            SynthCommand::Randomize(preset) => self.randomize(preset),
        }
        true
    }

    fn generate_audio(&mut self, audio_out: &mut ChannelBuffer) {
        if self.done() {
            return;
        }
        for frame in 0..audio_out.frames() {
            let sample = self.next_sample();
            for &channel in &self.channels {
                audio_out.add(channel, frame, sample);
            }
        }
    }

    fn active_voices(&self) -> usize {
        usize::from(!self.done())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const SR: f32 = 8000.0;

    #[test]
    fn test_randomize_respects_preset_bounds() {
        let mut synth = ChaosSynth::new(SR, vec![0, 1], 11);
        for preset in [ChaosPreset::Noisy, ChaosPreset::Clean] {
            for _ in 0..200 {
                synth.randomize(preset);
                assert!(preset.ranges().contains(&synth.params()), "{preset:?} out of range");
            }
        }
    }

    #[test]
    fn test_noisy_is_noisier_than_clean() {
        let mut synth = ChaosSynth::new(SR, vec![0], 5);
        synth.randomize(ChaosPreset::Noisy);
        let noisy = synth.params().noise_density;
        synth.randomize(ChaosPreset::Clean);
        assert!(synth.params().noise_density < noisy);
    }

    #[test]
    fn test_preset_names() {
        assert_eq!(ChaosPreset::from_name("Noisy"), Some(ChaosPreset::Noisy));
        assert_eq!(ChaosPreset::from_name("clean"), Some(ChaosPreset::Clean));
        assert_eq!(ChaosPreset::from_name("loud"), None);
    }

    #[test]
    fn test_gate_lifecycle() {
        let mut synth = ChaosSynth::new(SR, vec![0, 1], 1);
        assert!(synth.done());
        assert_eq!(synth.active_voices(), 0);

        let mut buffer = ChannelBuffer::new(2, 256);
        synth.generate_audio(&mut buffer);
        assert_eq!(buffer.peak(), 0.0, "a closed gate makes no sound");

        synth.trigger(0.8, 110.0);
        for _ in 0..200 {
            synth.generate_audio(&mut buffer);
        }
        assert!(buffer.peak() > 0.0);
        assert_eq!(buffer.channel(0), buffer.channel(1));

        synth.release();
        let mut blocks = 0;
        while !synth.done() {
            buffer.clear();
            synth.generate_audio(&mut buffer);
            blocks += 1;
            assert!(blocks < 1000);
        }
    }
}

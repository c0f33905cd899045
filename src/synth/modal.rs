use super::envelope::Envelope;
use super::filter::Biquad;
use super::routing::compute_output_map;
use super::{Voice, VoiceParameters};
use crate::audio::buffer::ChannelBuffer;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Peak level below which a released modal voice counts as silent.
pub const SILENCE_THRESHOLD: f32 = 1e-4;

/// Longest time the excitation may take to fade once a note is released, in seconds.
const RELEASE_TIME: f32 = 0.05;

/// Integrated white noise with a leak, giving a -6 dB/octave spectrum.
#[derive(Clone, Debug)]
struct BrownNoise {
    state: f32,
    rng: SmallRng,
}

impl BrownNoise {
    #[inline]
    fn process(&mut self) -> f32 {
        let white: f32 = self.rng.gen_range(-1.0..1.0);
        self.state = (self.state + 0.02 * white) / 1.02;
        3.5 * self.state
    }
}

#[derive(Clone, Copy, Debug)]
struct Mode {
    filter: Biquad,
    amplitude: f32,
}

/// A struck-resonator voice: one noise burst rings a bank of band-pass modes.
///
/// Unlike [`super::AddVoice`] the voice ends when its output falls silent, not
/// when an envelope finishes, since the resonators keep ringing after excitation.
#[derive(Clone, Debug)]
pub struct ModalVoice {
    sample_rate: f32,
    id: i32,
    level: f32,
    modes: Box<[Mode]>,
    output_map: Box<[usize]>,
    excitation: Envelope,
    noise: BrownNoise,
    /// Whether the last processed block peaked below [`SILENCE_THRESHOLD`].
    silent: bool,
}

impl ModalVoice {
    pub fn new(modes: usize, sample_rate: f32, seed: u64) -> Self {
        let mode = Mode {
            filter: Biquad::new_identity(),
            amplitude: 0.0,
        };
        Self {
            sample_rate,
            id: 0,
            level: 0.0,
            modes: vec![mode; modes].into_boxed_slice(),
            output_map: vec![0; modes].into_boxed_slice(),
            excitation: Envelope::attack_decay(sample_rate),
            noise: BrownNoise {
                state: 0.0,
                rng: SmallRng::seed_from_u64(seed),
            },
            silent: true,
        }
    }

    pub fn output_map(&self) -> &[usize] {
        &self.output_map
    }
}

impl Voice for ModalVoice {
    fn id(&self) -> i32 {
        self.id
    }

    fn trigger(&mut self, params: &VoiceParameters) {
        self.id = params.id;
        self.level = params.level;

        compute_output_map(params.arc_start, params.arc_span, &params.channels, &mut self.output_map);

        for (mode, p) in self.modes.iter_mut().zip(&params.partials) {
            let frequency = params.fundamental * p.freq_factor;
            mode.filter.set_bandpass(frequency, p.width * frequency, self.sample_rate);
            mode.filter.reset();
            mode.amplitude = p.amplitude;
        }

        self.excitation.set_length(0, params.excitation.attack);
        self.excitation.set_length(1, params.excitation.decay);
        self.excitation.reset();
        self.silent = false;
    }

    fn release(&mut self) {
        let decay = self.excitation.length(1).min(RELEASE_TIME);
        self.excitation.set_length(1, decay);
        self.excitation.release();
    }

    fn done(&self) -> bool {
        self.silent && self.excitation.done()
    }

    fn process(&mut self, audio_out: &mut ChannelBuffer) {
        let mut peak: f32 = 0.0;
        for frame in 0..audio_out.frames() {
            let excite = self.noise.process() * self.excitation.process();
            for (mode, &channel) in self.modes.iter_mut().zip(self.output_map.iter()) {
                let sample = mode.filter.process(excite) * mode.amplitude * self.level;
                peak = peak.max(sample.abs());
                audio_out.add(channel, frame, sample);
            }
        }
        self.silent = peak < SILENCE_THRESHOLD;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::synth::PartialParams;

    const SR: f32 = 8000.0;

    fn params() -> VoiceParameters {
        VoiceParameters {
            id: 48,
            fundamental: 200.0,
            partials: (0..3)
                .map(|i| PartialParams {
                    freq_factor: [1.0, 2.76, 5.4][i],
                    amplitude: 1.0,
                    width: 0.02,
                    ..Default::default()
                })
                .collect(),
            channels: vec![0, 1],
            ..Default::default()
        }
    }

    #[test]
    fn test_rings_then_falls_silent() {
        let mut voice = ModalVoice::new(3, SR, 3);
        assert!(voice.done());
        voice.trigger(&params());
        assert!(!voice.done());

        let mut buffer = ChannelBuffer::new(2, 64);
        voice.process(&mut buffer);
        voice.process(&mut buffer);
        assert!(buffer.peak() > 0.0);
        assert!(!voice.done());

        let mut blocks = 0;
        while !voice.done() {
            buffer.clear();
            voice.process(&mut buffer);
            blocks += 1;
            assert!(blocks < 2000, "voice never fell silent");
        }
        assert!(buffer.peak() < 3.0 * SILENCE_THRESHOLD);
    }

    #[test]
    fn test_release_cuts_excitation() {
        let mut voice = ModalVoice::new(3, SR, 3);
        let mut p = params();
        p.excitation.decay = 100.0;
        voice.trigger(&p);
        let mut buffer = ChannelBuffer::new(2, 64);
        for _ in 0..10 {
            voice.process(&mut buffer);
        }
        assert!(!voice.done());

        voice.release();
        let mut blocks = 0;
        while !voice.done() {
            buffer.clear();
            voice.process(&mut buffer);
            blocks += 1;
            assert!(blocks < 5000, "released voice never fell silent");
        }
    }
}

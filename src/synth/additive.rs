use super::envelope::{Envelope, ATTACK, DECAY, DELAY, RELEASE};
use super::oscillator::{Oscillator, Waveform};
use super::routing::compute_output_map;
use super::{Voice, VoiceParameters};
use crate::audio::buffer::ChannelBuffer;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// One sine partial with its own envelope and amplitude modulation.
#[derive(Clone, Debug)]
struct Partial {
    osc: Oscillator,
    env: Envelope,
    amplitude: f32,
    freq_factor: f32,
    am_osc: Oscillator,
    am_env: Envelope,
    am_depth: f32,
}

impl Partial {
    fn new(sample_rate: f32) -> Self {
        Self {
            osc: Oscillator::new(Waveform::Sine, sample_rate),
            env: Envelope::dadsr(sample_rate),
            amplitude: 0.0,
            freq_factor: 1.0,
            am_osc: Oscillator::new(Waveform::Sine, sample_rate),
            am_env: Envelope::attack_release(sample_rate),
            am_depth: 0.0,
        }
    }
}

/// An additive synthesis voice: a fixed number of enveloped sine partials,
/// each routed to one output channel.
#[derive(Clone, Debug)]
pub struct AddVoice {
    id: i32,
    level: f32,
    partials: Box<[Partial]>,
    output_map: Box<[usize]>,
    rng: SmallRng,
}

impl AddVoice {
    pub fn new(partials: usize, sample_rate: f32, seed: u64) -> Self {
        Self {
            id: 0,
            level: 0.0,
            partials: vec![Partial::new(sample_rate); partials].into_boxed_slice(),
            output_map: vec![0; partials].into_boxed_slice(),
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn num_partials(&self) -> usize {
        self.partials.len()
    }

    /// The output channel each partial is routed to.
    pub fn output_map(&self) -> &[usize] {
        &self.output_map
    }

    /// The onset delay applied to each partial by the last trigger, in seconds.
    pub fn partial_delay(&self, partial: usize) -> f32 {
        self.partials[partial].env.length(DELAY)
    }

    /// Number of partials whose envelope has finished.
    pub fn partials_done(&self) -> usize {
        self.partials.iter().filter(|p| p.env.done()).count()
    }

    pub fn frequency(&self, partial: usize) -> f32 {
        self.partials[partial].osc.frequency()
    }

    fn onset_delay(&mut self, cumulative: f32, random_dev: f32, index: usize) -> f32 {
        let count = self.partials.len();
        let jitter = if random_dev > 0.0 {
            self.rng.gen_range(-random_dev..=random_dev)
        } else {
            0.0
        };
        let steps = if cumulative >= 0.0 {
            index
        } else {
            count - index - 1
        };
        (cumulative.abs() * steps as f32 + jitter).max(0.0)
    }
}

impl Voice for AddVoice {
    fn id(&self) -> i32 {
        self.id
    }

    fn trigger(&mut self, params: &VoiceParameters) {
        self.id = params.id;
        self.level = params.level;
        for (partial, p) in self.partials.iter_mut().zip(&params.partials) {
            partial.freq_factor = p.freq_factor;
        }

        compute_output_map(params.arc_start, params.arc_span, &params.channels, &mut self.output_map);

        for partial in self.partials.iter_mut() {
            partial.osc.set_frequency(params.fundamental * partial.freq_factor);
        }

        for index in 0..self.partials.len() {
            let delay = self.onset_delay(params.cumulative_delay, params.random_dev, index);
            self.partials[index].env.set_length(DELAY, delay);
        }

        for (partial, p) in self.partials.iter_mut().zip(&params.partials) {
            partial.amplitude = p.amplitude;
        }

        for (partial, p) in self.partials.iter_mut().zip(&params.partials) {
            partial.env.set_length(ATTACK, p.attack);
            partial.env.set_length(DECAY, p.decay);
            partial.env.set_sustain_level(p.sustain);
            partial.env.set_length(RELEASE, p.release);

            partial.am_env.set_length(0, params.am_attack);
            partial.am_env.set_length(2, params.am_release);
            partial.am_osc.set_frequency(p.am_freq);
            partial.am_depth = p.am_depth;

            partial.osc.reset();
            partial.am_osc.reset();
            partial.env.reset();
            partial.am_env.reset();
        }
    }

    fn release(&mut self) {
        for partial in self.partials.iter_mut() {
            partial.env.release();
            partial.am_env.release();
        }
    }

    fn done(&self) -> bool {
        self.partials.iter().all(|p| p.env.done())
    }

    fn process(&mut self, audio_out: &mut ChannelBuffer) {
        for frame in 0..audio_out.frames() {
            for (partial, &channel) in self.partials.iter_mut().zip(self.output_map.iter()) {
                let am = 1.0 + partial.am_osc.process() * partial.am_env.process() * partial.am_depth;
                let sample = partial.osc.process() * partial.env.process() * partial.amplitude * self.level * am;
                audio_out.add(channel, frame, sample);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::synth::PartialParams;

    const SR: f32 = 1000.0;

    fn params(partials: usize) -> VoiceParameters {
        VoiceParameters {
            id: 60,
            level: 1.0,
            fundamental: 100.0,
            partials: (0..partials)
                .map(|i| PartialParams {
                    attack: 0.01,
                    decay: 0.01,
                    sustain: 0.5,
                    release: 0.05,
                    freq_factor: (i + 1) as f32,
                    amplitude: 0.25,
                    ..Default::default()
                })
                .collect(),
            channels: vec![0, 1, 2, 3],
            ..Default::default()
        }
    }

    fn run(voice: &mut AddVoice, blocks: usize) -> ChannelBuffer {
        let mut buffer = ChannelBuffer::new(4, 64);
        for _ in 0..blocks {
            buffer.clear();
            voice.process(&mut buffer);
        }
        buffer
    }

    #[test]
    fn test_trigger_sets_frequencies_and_routing() {
        let mut voice = AddVoice::new(4, SR, 1);
        assert!(voice.done());
        voice.trigger(&params(4));
        assert!(!voice.done());
        assert_eq!(voice.id(), 60);
        assert_eq!(voice.frequency(2), 300.0);
        assert_eq!(voice.output_map(), &[0, 1, 2, 3]);
    }

    #[test]
    fn test_cumulative_delay_direction() {
        let mut voice = AddVoice::new(4, SR, 1);
        let mut p = params(4);
        p.cumulative_delay = 0.1;
        voice.trigger(&p);
        for (i, expected) in [0.0, 0.1, 0.2, 0.3].into_iter().enumerate() {
            assert!((voice.partial_delay(i) - expected).abs() < 1e-6);
        }

        p.cumulative_delay = -0.1;
        voice.trigger(&p);
        let delays: Vec<f32> = (0..4).map(|i| voice.partial_delay(i)).collect();
        assert!((delays[0] - 0.3).abs() < 1e-6);
        assert_eq!(delays[3], 0.0);
    }

    #[test]
    fn test_random_deviation_is_bounded_and_clamped() {
        let mut voice = AddVoice::new(8, SR, 7);
        let mut p = params(8);
        p.random_dev = 0.05;
        for _ in 0..20 {
            voice.trigger(&p);
            for i in 0..8 {
                let delay = voice.partial_delay(i);
                assert!((0.0..=0.05).contains(&delay));
            }
        }
    }

    #[test]
    fn test_output_accumulates_on_shared_channel() {
        let mut voice = AddVoice::new(2, SR, 1);
        let mut p = params(2);
        p.channels = vec![1];
        voice.trigger(&p);
        let buffer = run(&mut voice, 2);
        assert_eq!(voice.output_map(), &[1, 1]);
        assert!(buffer.channel(1).iter().any(|s| *s != 0.0));
        assert!(buffer.channel(0).iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_done_requires_every_partial() {
        let mut voice = AddVoice::new(2, SR, 1);
        let mut p = params(2);
        p.partials[0].release = 0.01;
        p.partials[1].release = 1.0;
        voice.trigger(&p);
        run(&mut voice, 2);
        voice.release();
        run(&mut voice, 1);
        assert_eq!(voice.partials_done(), 1);
        assert!(!voice.done(), "one partial is still releasing");
        run(&mut voice, 20);
        assert!(voice.done());
    }

    #[test]
    fn test_amp_mod_does_not_keep_voice_alive() {
        let mut voice = AddVoice::new(1, SR, 1);
        let mut p = params(1);
        p.am_release = 10.0;
        p.partials[0].am_freq = 5.0;
        p.partials[0].am_depth = 0.5;
        voice.trigger(&p);
        run(&mut voice, 1);
        voice.release();
        run(&mut voice, 2);
        assert!(voice.done());
    }
}

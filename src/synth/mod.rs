pub use self::additive::AddVoice;
pub use self::chaos::{ChaosParams, ChaosPreset, ChaosSynth};
pub use self::modal::ModalVoice;
pub use self::params::{Excitation, ParameterError, PartialParams, VoiceParameters};
pub use self::pool::VoicePool;
pub use self::preset::{PresetError, PresetKey, PresetMorph, PresetStore, SynthPreset};
pub use self::routing::compute_output_map;
use crate::audio::buffer::ChannelBuffer;
use basedrop::Owned;
use serde::{Deserialize, Serialize};

mod additive;
mod chaos;
pub mod envelope;
pub mod filter;
mod modal;
pub mod oscillator;
mod params;
mod pool;
mod preset;
pub mod reverb;
mod routing;

/// One polyphonic voice of a synthesiser, addressed by an id.
pub trait Voice: Send {
    /// The id of the note this voice was last triggered with.
    fn id(&self) -> i32;

    /// Starts a note, resetting all internal state from the parameter snapshot.
    fn trigger(&mut self, params: &VoiceParameters);

    /// Lets the note ring out.
    fn release(&mut self);

    /// Whether the voice has fallen silent and may be reused.
    fn done(&self) -> bool;

    /// Synthesises one block, adding into `audio_out`.
    fn process(&mut self, audio_out: &mut ChannelBuffer);
}

/// Messages sent from the control thread to the audio thread.
pub enum SynthCommand {
    Trigger(Owned<VoiceParameters>),
    Release(i32),
    ReleaseAll,
    Randomize(ChaosPreset),
}

impl std::fmt::Debug for SynthCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SynthCommand::Trigger(params) => write!(f, "Trigger({})", params.id),
            SynthCommand::Release(id) => write!(f, "Release({id})"),
            SynthCommand::ReleaseAll => write!(f, "ReleaseAll"),
            SynthCommand::Randomize(preset) => write!(f, "Randomize({preset:?})"),
        }
    }
}

/// Something that runs on the audio thread and turns commands into sound.
pub trait Instrument: Send {
    /// Applies a command. Returns `false` when a trigger was dropped for lack of a free voice.
    fn handle(&mut self, command: SynthCommand) -> bool;

    /// Adds one block of audio into `audio_out`.
    fn generate_audio(&mut self, audio_out: &mut ChannelBuffer);

    /// Number of voices currently producing sound.
    fn active_voices(&self) -> usize;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SynthKind {
    #[default]
    Additive,
    Modal,
    Chaos,
}

impl SynthKind {
    /// Builds the instrument for this kind of synthesiser.
    pub fn build(
        self,
        voices: usize,
        partials: usize,
        sample_rate: f32,
        channels: Vec<usize>,
        seed: u64,
    ) -> Box<dyn Instrument> {
        match self {
            SynthKind::Additive => Box::new(VoicePool::new(
                (0..voices).map(|i| AddVoice::new(partials, sample_rate, seed.wrapping_add(i as u64))),
            )),
            SynthKind::Modal => Box::new(VoicePool::new(
                (0..voices).map(|i| ModalVoice::new(partials, sample_rate, seed.wrapping_add(i as u64))),
            )),
            SynthKind::Chaos => Box::new(ChaosSynth::new(sample_rate, channels, seed)),
        }
    }
}

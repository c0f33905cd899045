use super::{Instrument, SynthCommand, Voice, VoiceParameters};
use crate::audio::buffer::ChannelBuffer;

/// A fixed set of voices. Notes go to the first free voice; when every voice
/// is sounding, new notes are dropped rather than stealing a voice.
pub struct VoicePool<V: Voice> {
    voices: Box<[V]>,
}

impl<V: Voice> VoicePool<V> {
    pub fn new(voices: impl IntoIterator<Item = V>) -> Self {
        Self {
            voices: voices.into_iter().collect(),
        }
    }

    pub fn voices(&self) -> &[V] {
        &self.voices
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    /// Starts a note on the first free voice. Returns `false` if none is free.
    pub fn trigger(&mut self, params: &VoiceParameters) -> bool {
        match self.voices.iter_mut().find(|v| v.done()) {
            Some(voice) => {
                voice.trigger(params);
                true
            }
            None => false,
        }
    }

    /// Releases every voice playing `id`.
    pub fn release(&mut self, id: i32) {
        for voice in self.voices.iter_mut().filter(|v| v.id() == id) {
            voice.release();
        }
    }

    pub fn release_all(&mut self) {
        for voice in self.voices.iter_mut() {
            voice.release();
        }
    }

    pub fn generate_audio(&mut self, audio_out: &mut ChannelBuffer) {
        for voice in self.voices.iter_mut().filter(|v| !v.done()) {
            voice.process(audio_out);
        }
    }
}

impl<V: Voice> Instrument for VoicePool<V> {
    fn handle(&mut self, command: SynthCommand) -> bool {
        match command {
            SynthCommand::Trigger(params) => return self.trigger(&params),
            SynthCommand::Release(id) => self.release(id),
            SynthCommand::ReleaseAll => self.release_all(),
            // Only the drone has randomisable timbre
            SynthCommand::Randomize(_) => {}
        }
        true
    }

    fn generate_audio(&mut self, audio_out: &mut ChannelBuffer) {
        VoicePool::generate_audio(self, audio_out);
    }

    fn active_voices(&self) -> usize {
        self.voices.iter().filter(|v| !v.done()).count()
    }
}

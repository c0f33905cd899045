use crate::{
    audio::buffer::ChannelBuffer,
    convert::interleave,
    midi::MidiEvent,
    note::Note,
    synth::{ChaosPreset, Instrument, ParameterError, SynthCommand, SynthPreset, VoiceParameters},
};
use basedrop::{Handle, Owned};
use ringbuf_basedrop as ringbuf;
use std::sync::{
    atomic::{AtomicU64, AtomicUsize, Ordering},
    Arc,
};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, PartialEq)]
pub enum ControlError {
    #[error("Command queue is full")]
    QueueFull,
    #[error("Invalid voice parameters: {0}")]
    InvalidParameters(#[from] ParameterError),
}

/// Counters written by the audio thread and read by the control thread.
#[derive(Debug, Default)]
pub struct EngineStats {
    dropped_triggers: AtomicU64,
    active_voices: AtomicUsize,
}

impl EngineStats {
    pub fn dropped_triggers(&self) -> u64 {
        self.dropped_triggers.load(Ordering::Relaxed)
    }

    pub fn active_voices(&self) -> usize {
        self.active_voices.load(Ordering::Relaxed)
    }
}

/// Sizes shared by both halves of an engine.
#[derive(Clone, Debug)]
pub struct EngineSetup {
    /// Number of planar channels the instrument renders into.
    pub channels: usize,
    /// Partials (or modes) per voice.
    pub partials: usize,
    /// Largest block rendered in one go.
    pub block_size: usize,
    pub queue_capacity: usize,
}

/// Creates a connected controller and engine around `instrument`.
///
/// The engine goes to the audio thread; the controller stays on the control
/// thread, which must also run `Collector::collect` for `handle`'s collector.
pub fn channel(
    instrument: Box<dyn Instrument>,
    setup: &EngineSetup,
    preset: SynthPreset,
    handle: &Handle,
) -> (SynthController, SynthEngine) {
    let (tx, rx) = ringbuf::RingBuffer::new(setup.queue_capacity.max(1)).split(handle);
    let stats = Arc::new(EngineStats::default());

    let mut controller = SynthController {
        commands: tx,
        handle: handle.clone(),
        preset: SynthPreset::default(),
        channels: setup.channels,
        partials: setup.partials,
        stats: Arc::clone(&stats),
    };
    controller.set_preset(preset);

    let engine = SynthEngine {
        instrument,
        commands: rx,
        buffer: ChannelBuffer::new(setup.channels, setup.block_size.max(1)),
        stats,
    };

    (controller, engine)
}

/// The audio-thread half. Applies queued commands at block boundaries, then renders.
pub struct SynthEngine {
    instrument: Box<dyn Instrument>,
    commands: ringbuf::Consumer<SynthCommand>,
    buffer: ChannelBuffer,
    stats: Arc<EngineStats>,
}

impl SynthEngine {
    pub fn channels(&self) -> usize {
        self.buffer.channels()
    }

    pub fn block_size(&self) -> usize {
        self.buffer.capacity()
    }

    pub fn stats(&self) -> &Arc<EngineStats> {
        &self.stats
    }

    /// Fills an interleaved device buffer with `output_channels` channels.
    pub fn process(&mut self, output: &mut [f32], output_channels: usize) {
        if output_channels == 0 {
            return;
        }
        let chunk = self.block_size() * output_channels;
        for block in output.chunks_mut(chunk) {
            self.render(block.len() / output_channels);
            interleave(&self.buffer, block, output_channels);
        }
    }

    /// Renders `frames` frames (at most one block) into the planar buffer and returns it.
    pub fn render(&mut self, frames: usize) -> &ChannelBuffer {
        self.apply_commands();
        self.buffer.set_frames(frames);
        self.buffer.clear();
        self.instrument.generate_audio(&mut self.buffer);
        self.stats.active_voices.store(self.instrument.active_voices(), Ordering::Relaxed);
        &self.buffer
    }

    fn apply_commands(&mut self) {
        while let Some(command) = self.commands.pop() {
            if !self.instrument.handle(command) {
                self.stats.dropped_triggers.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

/// The control-thread half. Turns notes into parameter snapshots and queues them.
pub struct SynthController {
    commands: ringbuf::Producer<SynthCommand>,
    handle: Handle,
    preset: SynthPreset,
    channels: usize,
    partials: usize,
    stats: Arc<EngineStats>,
}

impl SynthController {
    pub fn preset(&self) -> &SynthPreset {
        &self.preset
    }

    /// Sets the preset used for subsequent notes. Sounding notes are unaffected.
    pub fn set_preset(&mut self, mut preset: SynthPreset) {
        preset.fit_partials(self.partials);
        debug!(preset = %preset.name, "preset selected");
        self.preset = preset;
    }

    pub fn note_on(&mut self, note: Note, velocity: u8) -> Result<(), ControlError> {
        if velocity == 0 {
            return self.note_off(note);
        }
        let level = velocity.min(127) as f32 / 127.0;
        let params = self.preset.to_voice_parameters(note.id(), note.frequency(), level);
        self.trigger(params)
    }

    pub fn note_off(&mut self, note: Note) -> Result<(), ControlError> {
        self.release(note.id())
    }

    /// Dispatches note events; other MIDI messages are ignored.
    pub fn handle_midi(&mut self, event: MidiEvent) -> Result<(), ControlError> {
        match event {
            MidiEvent::NoteOn { note, velocity, .. } => self.note_on(note, velocity),
            MidiEvent::NoteOff { note, .. } => self.note_off(note),
            _ => Ok(()),
        }
    }

    pub fn trigger(&mut self, params: VoiceParameters) -> Result<(), ControlError> {
        params.validate(self.partials, self.channels)?;
        let params = Owned::new(&self.handle, params);
        self.send(SynthCommand::Trigger(params))
    }

    pub fn release(&mut self, id: i32) -> Result<(), ControlError> {
        self.send(SynthCommand::Release(id))
    }

    pub fn release_all(&mut self) -> Result<(), ControlError> {
        self.send(SynthCommand::ReleaseAll)
    }

    pub fn randomize(&mut self, preset: ChaosPreset) -> Result<(), ControlError> {
        self.send(SynthCommand::Randomize(preset))
    }

    /// Triggers the audio thread dropped for lack of a free voice.
    pub fn dropped_triggers(&self) -> u64 {
        self.stats.dropped_triggers()
    }

    pub fn active_voices(&self) -> usize {
        self.stats.active_voices()
    }

    fn send(&mut self, command: SynthCommand) -> Result<(), ControlError> {
        self.commands.push(command).map_err(|_| ControlError::QueueFull)
    }
}

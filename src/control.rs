use crate::{
    engine::{ControlError, SynthController},
    midi::MidiEvent,
    note::Note,
    osc::{args_of, Arg},
    synth::{ChaosPreset, PresetError, PresetKey, PresetMorph, PresetStore},
};
use rosc::OscMessage;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Remote control messages understood by a synthesiser process.
#[derive(Clone, Debug, PartialEq)]
pub enum ControlMessage {
    NoteOn { note: Note, velocity: u8 },
    NoteOff { note: Note },
    ReleaseAll,
    Randomize(ChaosPreset),
    Preset(PresetKey),
    Morph { preset: PresetKey, seconds: f32 },
}

fn note_arg(arg: &Arg) -> Option<Note> {
    let id = arg.as_i32()?;
    (0..=127).contains(&id).then(|| Note(id as u8))
}

fn preset_arg(arg: &Arg) -> Option<PresetKey> {
    match arg {
        Arg::Str(name) => Some(PresetKey::parse(name)),
        other => usize::try_from(other.as_i32()?).ok().map(PresetKey::Index),
    }
}

impl ControlMessage {
    /// Decodes a message, or `None` if the address is unknown or the arguments don't fit.
    pub fn parse(message: &OscMessage) -> Option<Self> {
        let args = args_of(message);
        let parsed = match (message.addr.as_str(), args.as_slice()) {
            ("/noteOn", [id]) => ControlMessage::NoteOn {
                note: note_arg(id)?,
                velocity: 127,
            },
            ("/noteOn", [id, velocity, ..]) => ControlMessage::NoteOn {
                note: note_arg(id)?,
                velocity: velocity.as_i32()?.clamp(0, 127) as u8,
            },
            ("/noteOff", [id, ..]) => ControlMessage::NoteOff { note: note_arg(id)? },
            ("/releaseAll", _) => ControlMessage::ReleaseAll,
            ("/randomize", [preset, ..]) => ControlMessage::Randomize(ChaosPreset::from_name(preset.as_str()?)?),
            ("/preset", [preset, ..]) => ControlMessage::Preset(preset_arg(preset)?),
            ("/morph", [preset, seconds, ..]) => ControlMessage::Morph {
                preset: preset_arg(preset)?,
                seconds: seconds.as_f32()?.max(0.0),
            },
            _ => return None,
        };
        Some(parsed)
    }
}

#[derive(Error, Debug)]
pub enum SurfaceError {
    #[error(transparent)]
    Control(#[from] ControlError),
    #[error(transparent)]
    Preset(#[from] PresetError),
}

/// Everything a synthesiser process drives from the control thread: note input,
/// preset recall and preset morphs.
pub struct ControlSurface {
    controller: SynthController,
    presets: PresetStore,
    morph: Option<PresetMorph>,
}

impl ControlSurface {
    pub fn new(controller: SynthController, presets: PresetStore) -> Self {
        Self {
            controller,
            presets,
            morph: None,
        }
    }

    pub fn controller(&self) -> &SynthController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut SynthController {
        &mut self.controller
    }

    pub fn presets(&self) -> &PresetStore {
        &self.presets
    }

    pub fn morphing(&self) -> bool {
        self.morph.is_some()
    }

    /// Applies a decoded control message.
    pub fn apply(&mut self, message: ControlMessage) -> Result<(), SurfaceError> {
        match message {
            ControlMessage::NoteOn { note, velocity } => self.controller.note_on(note, velocity)?,
            ControlMessage::NoteOff { note } => self.controller.note_off(note)?,
            ControlMessage::ReleaseAll => self.controller.release_all()?,
            ControlMessage::Randomize(preset) => self.controller.randomize(preset)?,
            ControlMessage::Preset(key) => self.recall(&key)?,
            ControlMessage::Morph { preset, seconds } => self.morph_to(&preset, seconds)?,
        }
        Ok(())
    }

    /// Handles a raw OSC message, logging anything that cannot be applied.
    pub fn handle_message(&mut self, message: &OscMessage) {
        let Some(parsed) = ControlMessage::parse(message) else {
            debug!(addr = %message.addr, "ignoring unrecognised control message");
            return;
        };
        if let Err(err) = self.apply(parsed) {
            warn!(%err, addr = %message.addr, "control message failed");
        }
    }

    pub fn handle_midi(&mut self, event: MidiEvent) {
        if let Err(err) = self.controller.handle_midi(event) {
            warn!(%err, ?event, "MIDI event dropped");
        }
    }

    /// Switches every subsequent note to a stored preset. Cancels a running morph.
    pub fn recall(&mut self, key: &PresetKey) -> Result<(), PresetError> {
        let preset = self.presets.recall(key)?.clone();
        info!(preset = %preset.name, "recalled preset");
        self.morph = None;
        self.controller.set_preset(preset);
        Ok(())
    }

    /// Starts moving from the current preset towards a stored one over `seconds`.
    pub fn morph_to(&mut self, key: &PresetKey, seconds: f32) -> Result<(), PresetError> {
        let target = self.presets.recall(key)?.clone();
        info!(preset = %target.name, seconds, "morphing");
        self.morph = Some(PresetMorph::new(self.controller.preset().clone(), target, seconds));
        self.tick(0.0);
        Ok(())
    }

    /// Advances a running morph by `seconds`.
    pub fn tick(&mut self, seconds: f32) {
        let Some(morph) = self.morph.as_mut() else {
            return;
        };
        let preset = morph.advance(seconds);
        if morph.done() {
            self.morph = None;
        }
        self.controller.set_preset(preset);
    }
}

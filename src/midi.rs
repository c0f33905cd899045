use crate::note::Note;
use midir::{Ignore, MidiInput, MidiInputConnection};
use std::sync::mpsc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum MidiEvent {
    NoteOn {
        channel: u8,
        note: Note,
        velocity: u8,
    },
    NoteOff {
        channel: u8,
        note: Note,
        velocity: u8,
    },
    ControlChange {
        channel: u8,
        control: u8,
        value: u8,
    },
    PitchBend {
        channel: u8,
        value: u16,
    },
    Invalid,
}

impl MidiEvent {
    pub fn from_raw(data: &[u8]) -> Self {
        match *data {
            [a @ 0x80..=0x8f, note, velocity] => MidiEvent::NoteOff {
                channel: a & 0x0f,
                note: note.into(),
                velocity,
            },
            // A note-on with zero velocity is a note-off by convention
            [a @ 0x90..=0x9f, note, 0] => MidiEvent::NoteOff {
                channel: a & 0x0f,
                note: note.into(),
                velocity: 0,
            },
            [a @ 0x90..=0x9f, note, velocity] => MidiEvent::NoteOn {
                channel: a & 0x0f,
                note: note.into(),
                velocity,
            },
            [a @ 0xb0..=0xbf, control, value] => MidiEvent::ControlChange {
                channel: a & 0x0f,
                control,
                value,
            },
            [a @ 0xe0..=0xef, lsb, msb] => MidiEvent::PitchBend {
                channel: a & 0x0f,
                value: lsb as u16 | ((msb as u16) << 7),
            },
            _ => MidiEvent::Invalid,
        }
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, MidiEvent::Invalid)
    }

    pub fn channel(&self) -> Option<u8> {
        match *self {
            MidiEvent::NoteOn { channel, .. }
            | MidiEvent::NoteOff { channel, .. }
            | MidiEvent::ControlChange { channel, .. }
            | MidiEvent::PitchBend { channel, .. } => Some(channel),
            MidiEvent::Invalid => None,
        }
    }

    /// Whether the event should reach a synth listening on `filter` (0-based, `None` = omni).
    pub fn matches_channel(&self, filter: Option<u8>) -> bool {
        match (filter, self.channel()) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(wanted), Some(channel)) => wanted == channel,
        }
    }
}

/// Converts a 1-based MIDI channel as typed by a user into the 0-based wire value.
pub fn channel_from_user(channel: u8) -> Option<u8> {
    (1..=16).contains(&channel).then(|| channel - 1)
}

#[derive(Error, Debug)]
pub enum MidiSetupError {
    #[error("Failed to initialise MIDI input: {0}")]
    Init(#[from] midir::InitError),
    #[error("Failed to connect to MIDI port: {0}")]
    Connect(String),
}

/// Connects to the first available MIDI input port, forwarding decoded events on `tx`.
///
/// Returns `Ok(None)` when the system has no MIDI input ports.
pub fn connect_first_port(
    tx: mpsc::Sender<MidiEvent>,
    channel: Option<u8>,
) -> Result<Option<MidiInputConnection<()>>, MidiSetupError> {
    let mut midi_in = MidiInput::new("resonant-field input")?;
    midi_in.ignore(Ignore::ActiveSense);

    let in_ports = midi_in.ports();
    let Some(port) = in_ports.first() else {
        return Ok(None);
    };
    let port_name = midi_in.port_name(port).unwrap_or_else(|_| "unknown".into());

    // Create a callback to handle incoming MIDI messages
    let callback = move |_, message: &[u8], _: &mut ()| {
        let event = MidiEvent::from_raw(message);
        if !event.matches_channel(channel) {
            return;
        }
        if tx.send(event).is_err() {
            warn!("MIDI event dropped, receiver has gone away");
        }
    };

    let connection = midi_in
        .connect(port, "resonant-field-read", callback, ())
        .map_err(|err| MidiSetupError::Connect(err.to_string()))?;
    info!(port = %port_name, "connected MIDI input");

    Ok(Some(connection))
}

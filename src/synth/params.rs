use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Settings for a single partial (or resonant mode) of a voice.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialParams {
    /// Attack time in seconds.
    pub attack: f32,
    /// Decay time in seconds.
    pub decay: f32,
    /// Sustain level between 0 and 1.
    pub sustain: f32,
    /// Release time in seconds.
    pub release: f32,
    /// Multiplier applied to the voice fundamental.
    pub freq_factor: f32,
    pub amplitude: f32,
    /// Amplitude modulation rate in Hz.
    pub am_freq: f32,
    /// Amplitude modulation depth; 0 disables modulation.
    pub am_depth: f32,
    /// Resonator bandwidth as a fraction of the mode frequency (modal voices only).
    pub width: f32,
}

impl Default for PartialParams {
    fn default() -> Self {
        Self {
            attack: 0.05,
            decay: 0.2,
            sustain: 0.6,
            release: 1.0,
            freq_factor: 1.0,
            amplitude: 0.1,
            am_freq: 0.0,
            am_depth: 0.0,
            width: 0.01,
        }
    }
}

/// The attack/decay envelope shaping the noise that excites a modal voice.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Excitation {
    pub attack: f32,
    pub decay: f32,
}

impl Default for Excitation {
    fn default() -> Self {
        Self {
            attack: 0.005,
            decay: 0.3,
        }
    }
}

/// Everything a voice needs to start a note.
///
/// A snapshot: the voice copies what it needs during `trigger`, so later changes
/// to the control-side parameters never reach a sounding voice.
#[derive(Clone, Debug, PartialEq)]
pub struct VoiceParameters {
    /// Identifier used to release the voice, normally a MIDI note number.
    pub id: i32,
    /// Overall voice level between 0 and 1.
    pub level: f32,
    /// Fundamental frequency in Hz.
    pub fundamental: f32,
    /// Onset delay added per partial index in seconds. Negative values sweep from the top partial down.
    pub cumulative_delay: f32,
    /// Maximum random deviation added to each partial's onset delay, in seconds.
    pub random_dev: f32,
    pub partials: Vec<PartialParams>,
    /// Attack time of the amplitude modulation envelope.
    pub am_attack: f32,
    /// Release time of the amplitude modulation envelope.
    pub am_release: f32,
    /// Start of the spatial arc as a fraction of the circle.
    pub arc_start: f32,
    /// Signed length of the spatial arc, at most two full turns.
    pub arc_span: f32,
    /// Physical output channels, in circular order.
    pub channels: Vec<usize>,
    pub excitation: Excitation,
}

impl Default for VoiceParameters {
    fn default() -> Self {
        Self {
            id: 0,
            level: 1.0,
            fundamental: 220.0,
            cumulative_delay: 0.0,
            random_dev: 0.0,
            partials: vec![PartialParams::default()],
            am_attack: 0.1,
            am_release: 0.5,
            arc_start: 0.0,
            arc_span: 1.0,
            channels: vec![0],
            excitation: Excitation::default(),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum ParameterError {
    #[error("Expected {expected} partials but got {actual}")]
    PartialCount { expected: usize, actual: usize },
    #[error("Output channel list is empty")]
    NoChannels,
    #[error("Output channel {channel} is out of range for {available} channels")]
    ChannelOutOfRange { channel: usize, available: usize },
    #[error("Arc span {0} exceeds two full turns")]
    ArcSpan(f32),
    #[error("Non-finite value for {0}")]
    NotFinite(&'static str),
}

impl VoiceParameters {
    /// Checks the parameters against a voice with `partials` partials and `channels` output channels.
    pub fn validate(&self, partials: usize, channels: usize) -> Result<(), ParameterError> {
        if self.partials.len() != partials {
            return Err(ParameterError::PartialCount {
                expected: partials,
                actual: self.partials.len(),
            });
        }
        if self.channels.is_empty() {
            return Err(ParameterError::NoChannels);
        }
        if let Some(&channel) = self.channels.iter().find(|&&c| c >= channels) {
            return Err(ParameterError::ChannelOutOfRange {
                channel,
                available: channels,
            });
        }
        if self.arc_span.abs() > 2.0 {
            return Err(ParameterError::ArcSpan(self.arc_span));
        }
        let scalars = [
            ("level", self.level),
            ("fundamental", self.fundamental),
            ("cumulative_delay", self.cumulative_delay),
            ("random_dev", self.random_dev),
            ("arc_start", self.arc_start),
            ("arc_span", self.arc_span),
        ];
        if let Some((name, _)) = scalars.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ParameterError::NotFinite(*name));
        }
        Ok(())
    }
}

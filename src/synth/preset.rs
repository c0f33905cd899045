use super::params::{Excitation, PartialParams, VoiceParameters};
use crate::util::{lerp, scale_from_gain};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// A named snapshot of every voice setting except the note itself.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthPreset {
    pub name: String,
    /// Overall gain in dB applied on top of note velocity.
    pub gain_db: f32,
    pub cumulative_delay: f32,
    pub random_dev: f32,
    pub partials: Vec<PartialParams>,
    pub am_attack: f32,
    pub am_release: f32,
    pub arc_start: f32,
    pub arc_span: f32,
    pub channels: Vec<usize>,
    pub excitation: Excitation,
}

impl Default for SynthPreset {
    fn default() -> Self {
        let voice = VoiceParameters::default();
        Self {
            name: "default".into(),
            gain_db: -12.0,
            cumulative_delay: voice.cumulative_delay,
            random_dev: voice.random_dev,
            partials: voice.partials,
            am_attack: voice.am_attack,
            am_release: voice.am_release,
            arc_start: voice.arc_start,
            arc_span: voice.arc_span,
            channels: voice.channels,
            excitation: voice.excitation,
        }
    }
}

impl SynthPreset {
    /// A harmonic series of `partials` partials with amplitudes falling off as 1/n,
    /// spread once around `channels`.
    pub fn harmonic(name: &str, partials: usize, channels: usize) -> Self {
        Self {
            name: name.into(),
            partials: (0..partials)
                .map(|i| {
                    let n = (i + 1) as f32;
                    PartialParams {
                        freq_factor: n,
                        amplitude: 0.5 / n,
                        release: 1.5 / n.sqrt(),
                        ..Default::default()
                    }
                })
                .collect(),
            channels: (0..channels.max(1)).collect(),
            ..Default::default()
        }
    }

    /// Builds the snapshot handed to a voice when a note starts.
    pub fn to_voice_parameters(&self, id: i32, fundamental: f32, level: f32) -> VoiceParameters {
        VoiceParameters {
            id,
            level: level * scale_from_gain(self.gain_db),
            fundamental,
            cumulative_delay: self.cumulative_delay,
            random_dev: self.random_dev,
            partials: self.partials.clone(),
            am_attack: self.am_attack,
            am_release: self.am_release,
            arc_start: self.arc_start,
            arc_span: self.arc_span,
            channels: self.channels.clone(),
            excitation: self.excitation,
        }
    }

    /// Pads or truncates the partial list to exactly `count` entries.
    pub fn fit_partials(&mut self, count: usize) {
        let fill = self.partials.last().copied().unwrap_or_default();
        self.partials.resize(count, fill);
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PresetKey {
    Name(String),
    Index(usize),
}

impl PresetKey {
    /// Treats anything that parses as an integer as an index.
    pub fn parse(key: &str) -> Self {
        match key.parse() {
            Ok(index) => PresetKey::Index(index),
            Err(_) => PresetKey::Name(key.to_owned()),
        }
    }
}

impl std::fmt::Display for PresetKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PresetKey::Name(name) => write!(f, "\"{name}\""),
            PresetKey::Index(index) => write!(f, "#{index}"),
        }
    }
}

#[derive(Error, Debug)]
pub enum PresetError {
    #[error("No preset {0}")]
    NotFound(PresetKey),
    #[error("Failed to read preset file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse preset file: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Default, Deserialize, Serialize)]
struct PresetFile {
    #[serde(default, rename = "preset")]
    presets: Vec<SynthPreset>,
}

/// An ordered collection of presets, recalled by name or position.
#[derive(Clone, Debug, Default)]
pub struct PresetStore {
    presets: Vec<SynthPreset>,
}

impl PresetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, PresetError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// Parses a document of `[[preset]]` tables.
    pub fn from_toml(text: &str) -> Result<Self, PresetError> {
        let file: PresetFile = toml::from_str(text)?;
        Ok(Self { presets: file.presets })
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string(&PresetFile {
            presets: self.presets.clone(),
        })
    }

    /// Adds a preset, replacing any existing preset of the same name in place.
    pub fn insert(&mut self, preset: SynthPreset) {
        match self.presets.iter_mut().find(|p| p.name == preset.name) {
            Some(existing) => *existing = preset,
            None => self.presets.push(preset),
        }
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.presets.iter().map(|p| p.name.as_str())
    }

    pub fn recall(&self, key: &PresetKey) -> Result<&SynthPreset, PresetError> {
        let found = match key {
            PresetKey::Name(name) => self.presets.iter().find(|p| &p.name == name),
            PresetKey::Index(index) => self.presets.get(*index),
        };
        found.ok_or_else(|| PresetError::NotFound(key.clone()))
    }
}

/// A linear transition between two presets over a fixed duration.
///
/// Numeric settings are interpolated. The channel list and the partial count
/// cannot be blended, so they switch over halfway through.
#[derive(Clone, Debug)]
pub struct PresetMorph {
    from: SynthPreset,
    to: SynthPreset,
    duration: f32,
    elapsed: f32,
}

impl PresetMorph {
    pub fn new(from: SynthPreset, to: SynthPreset, duration: f32) -> Self {
        Self {
            from,
            to,
            duration: duration.max(0.0),
            elapsed: 0.0,
        }
    }

    pub fn target(&self) -> &SynthPreset {
        &self.to
    }

    /// Progress between 0 and 1.
    pub fn position(&self) -> f32 {
        if self.duration <= 0.0 {
            1.0
        } else {
            (self.elapsed / self.duration).min(1.0)
        }
    }

    pub fn done(&self) -> bool {
        self.position() >= 1.0
    }

    /// Moves the morph forward by `seconds` and returns the blended preset.
    pub fn advance(&mut self, seconds: f32) -> SynthPreset {
        self.elapsed += seconds.max(0.0);
        self.at(self.position())
    }

    /// The blended preset at position `t` in `[0, 1]`.
    pub fn at(&self, t: f32) -> SynthPreset {
        let t = t.clamp(0.0, 1.0);
        if t >= 1.0 {
            return self.to.clone();
        }
        let (a, b) = (&self.from, &self.to);
        let near = if t < 0.5 { a } else { b };

        let partials = near
            .partials
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let (pa, pb) = match (a.partials.get(i), b.partials.get(i)) {
                    (Some(pa), Some(pb)) => (pa, pb),
                    _ => (p, p),
                };
                lerp_partial(pa, pb, t)
            })
            .collect();

        SynthPreset {
            name: near.name.clone(),
            gain_db: lerp(a.gain_db, b.gain_db, t),
            cumulative_delay: lerp(a.cumulative_delay, b.cumulative_delay, t),
            random_dev: lerp(a.random_dev, b.random_dev, t),
            partials,
            am_attack: lerp(a.am_attack, b.am_attack, t),
            am_release: lerp(a.am_release, b.am_release, t),
            arc_start: lerp(a.arc_start, b.arc_start, t),
            arc_span: lerp(a.arc_span, b.arc_span, t),
            channels: near.channels.clone(),
            excitation: Excitation {
                attack: lerp(a.excitation.attack, b.excitation.attack, t),
                decay: lerp(a.excitation.decay, b.excitation.decay, t),
            },
        }
    }
}

fn lerp_partial(a: &PartialParams, b: &PartialParams, t: f32) -> PartialParams {
    PartialParams {
        attack: lerp(a.attack, b.attack, t),
        decay: lerp(a.decay, b.decay, t),
        sustain: lerp(a.sustain, b.sustain, t),
        release: lerp(a.release, b.release, t),
        freq_factor: lerp(a.freq_factor, b.freq_factor, t),
        amplitude: lerp(a.amplitude, b.amplitude, t),
        am_freq: lerp(a.am_freq, b.am_freq, t),
        am_depth: lerp(a.am_depth, b.am_depth, t),
        width: lerp(a.width, b.width, t),
    }
}

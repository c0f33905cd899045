use crate::synth::SynthKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub audio: AudioConfig,
    pub synth: SynthConfig,
    pub osc: OscConfig,
    pub scene: SceneConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Largest number of frames rendered per engine block.
    pub block_size: usize,
    /// Number of output channels; the device default when unset.
    pub channels: Option<usize>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            block_size: 256,
            channels: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    pub kind: SynthKind,
    pub voices: usize,
    pub partials: usize,
    pub queue_capacity: usize,
    /// TOML file of `[[preset]]` tables.
    pub presets: Option<PathBuf>,
    /// Name of the preset active at startup.
    pub preset: Option<String>,
    pub seed: Option<u64>,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            kind: SynthKind::Additive,
            voices: 16,
            partials: 8,
            queue_capacity: 256,
            presets: None,
            preset: None,
            seed: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OscConfig {
    /// UDP port for synth control messages; disabled when unset.
    pub port: Option<u16>,
}

impl Default for OscConfig {
    fn default() -> Self {
        Self { port: Some(9000) }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub listen_port: u16,
    /// Addresses every scene mutation is mirrored to, as `host:port`.
    pub relay: Vec<String>,
    pub frame_rate: f32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            listen_port: 9100,
            relay: vec![],
            frame_rate: 60.0,
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` when given, otherwise returns the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.audio.block_size == 0 {
            return Err(ConfigError::Invalid("audio.block_size must be positive".into()));
        }
        match self.audio.channels {
            Some(0) => return Err(ConfigError::Invalid("audio.channels must be positive".into())),
            Some(channels) if channels > u16::MAX as usize => {
                return Err(ConfigError::Invalid(format!("audio.channels must be at most {}", u16::MAX)));
            }
            _ => {}
        }
        if self.synth.voices == 0 || self.synth.partials == 0 {
            return Err(ConfigError::Invalid("synth.voices and synth.partials must be positive".into()));
        }
        if !(self.scene.frame_rate > 0.0) {
            return Err(ConfigError::Invalid("scene.frame_rate must be positive".into()));
        }
        Ok(())
    }
}

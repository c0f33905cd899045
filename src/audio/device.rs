use crate::engine::SynthEngine;
use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    FromSample, SampleFormat, SizedSample, Stream, StreamConfig,
};
use thiserror::Error;
use tracing::{error, info};

#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("No audio output device available")]
    NoDevice,
    #[error("Failed to query output config: {0}")]
    Config(#[from] cpal::DefaultStreamConfigError),
    #[error("Failed to build output stream: {0}")]
    Build(#[from] cpal::BuildStreamError),
    #[error("Failed to start output stream: {0}")]
    Play(#[from] cpal::PlayStreamError),
    #[error("Unsupported channel count {0}")]
    Channels(usize),
    #[error("Unsupported sample format {0:?}")]
    SampleFormat(SampleFormat),
}

/// The default output device together with the stream settings the engine will run at.
pub struct OutputDevice {
    device: cpal::Device,
    config: StreamConfig,
    format: SampleFormat,
}

impl OutputDevice {
    /// Opens the default output device, optionally forcing the channel count.
    pub fn open_default(channels: Option<usize>) -> Result<Self, DeviceError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(DeviceError::NoDevice)?;
        let supported = device.default_output_config()?;
        let format = supported.sample_format();
        let mut config: StreamConfig = supported.into();
        if let Some(channels) = channels {
            config.channels = u16::try_from(channels).map_err(|_| DeviceError::Channels(channels))?;
        }
        info!(
            device = %device.name().unwrap_or_else(|_| "unknown".into()),
            sample_rate = config.sample_rate.0,
            channels = config.channels,
            ?format,
            "opened audio output"
        );
        Ok(Self { device, config, format })
    }

    pub fn sample_rate(&self) -> f32 {
        self.config.sample_rate.0 as f32
    }

    pub fn channels(&self) -> usize {
        self.config.channels as usize
    }

    /// Starts a stream that pulls every block from `engine`.
    pub fn play(&self, engine: SynthEngine) -> Result<Stream, DeviceError> {
        let stream = match self.format {
            SampleFormat::F32 => self.build::<f32>(engine)?,
            SampleFormat::I16 => self.build::<i16>(engine)?,
            SampleFormat::U16 => self.build::<u16>(engine)?,
            other => return Err(DeviceError::SampleFormat(other)),
        };
        stream.play()?;
        Ok(stream)
    }

    fn build<T>(&self, mut engine: SynthEngine) -> Result<Stream, DeviceError>
    where
        T: SizedSample + FromSample<f32>,
    {
        let channels = self.channels();
        let mut scratch = vec![0.0f32; engine.block_size() * channels.max(1)].into_boxed_slice();
        let stream = self.device.build_output_stream(
            &self.config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                for chunk in data.chunks_mut(scratch.len()) {
                    let samples = &mut scratch[..chunk.len()];
                    engine.process(samples, channels);
                    for (out, &sample) in chunk.iter_mut().zip(samples.iter()) {
                        *out = T::from_sample(sample);
                    }
                }
            },
            |err| error!(%err, "output stream error"),
            None,
        )?;
        Ok(stream)
    }
}

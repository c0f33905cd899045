/// A block of planar audio with a fixed number of output channels.
///
/// Voices accumulate into this buffer; nothing overwrites it except [`ChannelBuffer::clear`].
#[derive(Clone, Debug)]
pub struct ChannelBuffer {
    data: Box<[f32]>,
    channels: usize,
    frames: usize,
}

impl ChannelBuffer {
    pub fn new(channels: usize, frames: usize) -> Self {
        Self {
            data: vec![0.0; channels * frames].into_boxed_slice(),
            channels,
            frames,
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Shrinks the active block length. Never grows past the allocated capacity.
    pub fn set_frames(&mut self, frames: usize) {
        self.frames = frames.min(self.capacity());
    }

    pub fn capacity(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.data.len() / self.channels
        }
    }

    pub fn channel(&self, channel: usize) -> &[f32] {
        let stride = self.capacity();
        &self.data[channel * stride..channel * stride + self.frames]
    }

    pub fn channel_mut(&mut self, channel: usize) -> &mut [f32] {
        let stride = self.capacity();
        &mut self.data[channel * stride..channel * stride + self.frames]
    }

    /// Accumulates `sample` into one frame of one channel. Out-of-range channels are ignored.
    #[inline]
    pub fn add(&mut self, channel: usize, frame: usize, sample: f32) {
        if channel < self.channels && frame < self.frames {
            let stride = self.capacity();
            self.data[channel * stride + frame] += sample;
        }
    }

    /// Fills all channels with silence.
    pub fn clear(&mut self) {
        self.data.fill(0.0);
    }

    /// Peak absolute value across all channels.
    pub fn peak(&self) -> f32 {
        (0..self.channels)
            .flat_map(|ch| self.channel(ch))
            .fold(0.0, |peak: f32, s| peak.max(s.abs()))
    }
}

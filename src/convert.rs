use crate::audio::buffer::ChannelBuffer;

/// Interleaves the planar channels of `input` into `output`.
///
/// `output` holds `frames * output_channels` samples. Output channels without a
/// matching planar channel are filled with silence.
pub fn interleave(input: &ChannelBuffer, output: &mut [f32], output_channels: usize) {
    if output_channels == 0 {
        return;
    }
    for (frame, samples) in output.chunks_exact_mut(output_channels).enumerate() {
        for (channel, sample) in samples.iter_mut().enumerate() {
            *sample = if channel < input.channels() && frame < input.frames() {
                input.channel(channel)[frame]
            } else {
                0.0
            };
        }
    }
}

use std::f32::consts::PI;

/// A second order infinite impulse response filter.
#[derive(Copy, Clone, Debug)]
pub struct Biquad {
    /// Feed-forward coefficients, normalised by `a0`.
    b: [f32; 3],
    /// Feedback coefficients `a1`, `a2`, normalised by `a0`.
    a: [f32; 2],
    /// Previous inputs, most recent first.
    x: [f32; 2],
    /// Previous outputs, most recent first.
    y: [f32; 2],
}

impl Biquad {
    pub fn new_identity() -> Self {
        Self {
            b: [1.0, 0.0, 0.0],
            a: [0.0, 0.0],
            x: [0.0; 2],
            y: [0.0; 2],
        }
    }

    /// Sets constant-peak-gain band-pass coefficients around `center_hz` with the given bandwidth.
    pub fn set_bandpass(&mut self, center_hz: f32, bandwidth_hz: f32, sample_rate: f32) {
        let nyquist = 0.5 * sample_rate;
        let center = center_hz.clamp(1.0, 0.99 * nyquist);
        let q = (center / bandwidth_hz.max(1e-3)).max(1e-3);

        let w = 2.0 * PI * center / sample_rate;
        let alpha = w.sin() / (2.0 * q);
        let a0 = 1.0 + alpha;

        self.b = [alpha / a0, 0.0, -alpha / a0];
        self.a = [-2.0 * w.cos() / a0, (1.0 - alpha) / a0];
    }

    /// Clears the filter history.
    pub fn reset(&mut self) {
        self.x = [0.0; 2];
        self.y = [0.0; 2];
    }

    #[inline]
    pub fn process(&mut self, s_in: f32) -> f32 {
        let s_out = self.b[0] * s_in + self.b[1] * self.x[0] + self.b[2] * self.x[1]
            - self.a[0] * self.y[0]
            - self.a[1] * self.y[1];
        self.x = [s_in, self.x[0]];
        self.y = [s_out, self.y[0]];
        s_out
    }
}

/// Removes DC offset with a one-pole high-pass.
#[derive(Copy, Clone, Debug)]
pub struct DcBlocker {
    pole: f32,
    x1: f32,
    y1: f32,
}

impl DcBlocker {
    pub fn new() -> Self {
        Self {
            pole: 0.995,
            x1: 0.0,
            y1: 0.0,
        }
    }

    #[inline]
    pub fn process(&mut self, s_in: f32) -> f32 {
        let s_out = s_in - self.x1 + self.pole * self.y1;
        self.x1 = s_in;
        self.y1 = s_out;
        s_out
    }
}

impl Default for DcBlocker {
    fn default() -> Self {
        Self::new()
    }
}

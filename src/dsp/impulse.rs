//! Synthetic impulse response for the convolution reverb.
//!
//! No sample file is involved: the response is shaped noise with a short,
//! loud early section and a slower tail, then smoothed differently per
//! channel so left and right decorrelate.

use rand::Rng;

/// Length of the response in seconds.
pub const IMPULSE_SECONDS: f64 = 1.2;

/// Fraction of the response treated as early reflections.
const EARLY_FRACTION: f64 = 0.1;
const EARLY_CURVE: f64 = 0.02;
const EARLY_LEVEL: f64 = 1.3;
const LATE_CURVE: f64 = 0.9;
const LATE_LEVEL: f64 = 0.5;

const SMOOTH_LEFT: f32 = 0.1;
const SMOOTH_RIGHT: f32 = 0.12;
/// Weight of the following sample in the restoring pass.
const RESTORE_BLEND: f32 = 0.1;

/// A stereo impulse response.
#[derive(Debug, Clone, PartialEq)]
pub struct ImpulseResponse {
    pub sample_rate: f64,
    pub left: Vec<f32>,
    pub right: Vec<f32>,
}

impl ImpulseResponse {
    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    /// Interleave into `[l0, r0, l1, r1, ...]` for hosts that want one buffer.
    pub fn interleaved(&self) -> Vec<f32> {
        self.left
            .iter()
            .zip(&self.right)
            .flat_map(|(&l, &r)| [l, r])
            .collect()
    }
}

/// Two-segment decay envelope at normalized time `t` in `[0, 1)`.
pub fn envelope(t: f64) -> f64 {
    if t < EARLY_FRACTION {
        (1.0 - t / EARLY_FRACTION).powf(EARLY_CURVE) * EARLY_LEVEL
    } else {
        (1.0 - (t - EARLY_FRACTION) / (1.0 - EARLY_FRACTION)).powf(LATE_CURVE) * LATE_LEVEL
    }
}

/// Build a fresh response at `sample_rate` using `rng` for the noise.
pub fn synthesize<R: Rng>(sample_rate: f64, rng: &mut R) -> ImpulseResponse {
    let length = (IMPULSE_SECONDS * sample_rate).round().max(0.0) as usize;
    let mut left = Vec::with_capacity(length);
    let mut right = Vec::with_capacity(length);

    for i in 0..length {
        let amplitude = envelope(i as f64 / length as f64);
        left.push((rng.gen_range(-1.0..1.0) * amplitude) as f32);
        right.push((rng.gen_range(-1.0..1.0) * amplitude) as f32);
    }

    smooth(&mut left, SMOOTH_LEFT);
    smooth(&mut right, SMOOTH_RIGHT);
    restore_highs(&mut left);
    restore_highs(&mut right);

    ImpulseResponse {
        sample_rate,
        left,
        right,
    }
}

/// One-pole low-pass, front to back.
fn smooth(buf: &mut [f32], coeff: f32) {
    for i in 1..buf.len() {
        buf[i] = buf[i] * (1.0 - coeff) + buf[i - 1] * coeff;
    }
}

/// Back-to-front blend with the following sample.
fn restore_highs(buf: &mut [f32]) {
    for i in (0..buf.len().saturating_sub(1)).rev() {
        buf[i] = buf[i] * (1.0 - RESTORE_BLEND) + buf[i + 1] * RESTORE_BLEND;
    }
}

//! Biquad filter using the WebAudio BiquadFilterNode (RBJ cookbook) coefficients.

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    Lowpass,
    Highpass,
    /// Unity magnitude at every frequency; used as the bypass setting.
    Allpass,
}

/// Highest usable cutoff as a fraction of Nyquist. At exactly Nyquist the
/// low-pass poles sit on the unit circle.
const MAX_NYQUIST_FRACTION: f64 = 0.999;

/// Normalized transfer function `(b0 + b1 z^-1 + b2 z^-2) / (1 + a1 z^-1 + a2 z^-2)`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Coefficients {
    b: [f64; 3],
    a: [f64; 2],
}

impl Coefficients {
    const IDENTITY: Coefficients = Coefficients {
        b: [1.0, 0.0, 0.0],
        a: [0.0, 0.0],
    };

    fn design(filter_type: FilterType, frequency: f64, q: f64, sample_rate: f64) -> Self {
        let freq = frequency.clamp(1.0, sample_rate / 2.0 * MAX_NYQUIST_FRACTION);
        let w0 = TAU * freq / sample_rate;
        let (sin_w0, cos_w0) = w0.sin_cos();
        let alpha = sin_w0 / (2.0 * q.max(1e-4));

        let a0 = 1.0 + alpha;
        let a = [-2.0 * cos_w0, 1.0 - alpha];
        let b = match filter_type {
            FilterType::Lowpass => {
                let edge = (1.0 - cos_w0) / 2.0;
                [edge, 2.0 * edge, edge]
            }
            FilterType::Highpass => {
                let edge = (1.0 + cos_w0) / 2.0;
                [edge, -2.0 * edge, edge]
            }
            // Mirror-image numerator of the denominator
            FilterType::Allpass => [a[1], a[0], a0],
        };
        Coefficients {
            b: b.map(|x| x / a0),
            a: a.map(|x| x / a0),
        }
    }
}

/// Second-order IIR section, Direct Form II Transposed.
///
/// Parameter setters only mark the coefficients stale; they are redesigned
/// lazily on the next sample, so per-sample automation is cheap when the
/// value holds still.
#[derive(Debug, Clone)]
pub struct BiquadFilter {
    pub filter_type: FilterType,
    pub frequency: f64,
    pub q: f64,
    sample_rate: f64,
    coeffs: Coefficients,
    state: [f64; 2],
    stale: bool,
}

impl BiquadFilter {
    pub fn new(filter_type: FilterType, sample_rate: f64) -> Self {
        let mut f = BiquadFilter {
            filter_type,
            frequency: 350.0,
            q: 1.0,
            sample_rate,
            coeffs: Coefficients::IDENTITY,
            state: [0.0; 2],
            stale: true,
        };
        f.update_coefficients();
        f
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn update_coefficients(&mut self) {
        self.coeffs = Coefficients::design(self.filter_type, self.frequency, self.q, self.sample_rate);
        self.stale = false;
    }

    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        if self.stale {
            self.update_coefficients();
        }
        let Coefficients { b, a } = self.coeffs;
        let [s1, s2] = self.state;
        let output = b[0] * input + s1;
        self.state = [b[1] * input - a[0] * output + s2, b[2] * input - a[1] * output];
        output
    }

    pub fn reset(&mut self) {
        self.state = [0.0; 2];
    }

    pub fn set_type(&mut self, filter_type: FilterType) {
        self.stale |= self.filter_type != filter_type;
        self.filter_type = filter_type;
    }

    pub fn set_frequency(&mut self, freq: f64) {
        self.stale |= self.frequency != freq;
        self.frequency = freq;
    }

    pub fn set_q(&mut self, q: f64) {
        self.stale |= self.q != q;
        self.q = q;
    }
}

//! Reverb send/return: a parallel path that taps the source, cuts its lows,
//! convolves it with a synthetic room, and mixes it back in.
//!
//! send gain → lowcut high-pass → convolver → return gain

use super::convolver::Convolver;
use super::filter::{BiquadFilter, FilterType};
use super::impulse::ImpulseResponse;
use super::param::AudioParam;

/// Fixed boost on the wet return.
pub const RETURN_GAIN: f64 = 1.4;
/// Q of the lowcut high-pass on the send.
pub const LOWCUT_Q: f64 = 0.7;

/// The reverb auxiliary path.
#[derive(Debug, Clone)]
pub struct ReverbSend {
    /// Send level; zero means the path contributes nothing.
    pub send: AudioParam,
    /// Lowcut corner frequency in Hz.
    pub lowcut: AudioParam,
    pub return_gain: f64,

    lowcut_l: BiquadFilter,
    lowcut_r: BiquadFilter,
    convolver: Convolver,
}

impl ReverbSend {
    /// Build the path around an impulse response.
    ///
    /// # Arguments
    /// - `ir`: response for the convolver (normalized on load).
    /// - `lowcut_hz`: initial lowcut frequency.
    pub fn new(ir: &ImpulseResponse, lowcut_hz: f64) -> Self {
        let make_lowcut = || {
            let mut f = BiquadFilter::new(FilterType::Highpass, ir.sample_rate);
            f.set_frequency(lowcut_hz);
            f.set_q(LOWCUT_Q);
            f
        };
        ReverbSend {
            send: AudioParam::new(0.0),
            lowcut: AudioParam::new(lowcut_hz),
            return_gain: RETURN_GAIN,
            lowcut_l: make_lowcut(),
            lowcut_r: make_lowcut(),
            convolver: Convolver::new(ir, true),
        }
    }

    /// Process one stereo frame at audio-clock `time`, returning the wet
    /// signal only.
    #[inline]
    pub fn process(&mut self, left: f32, right: f32, time: f64) -> (f32, f32) {
        let send = self.send.advance(time);
        let lowcut = self.lowcut.advance(time);
        self.lowcut_l.set_frequency(lowcut);
        self.lowcut_r.set_frequency(lowcut);

        let in_l = self.lowcut_l.process(left as f64 * send) as f32;
        let in_r = self.lowcut_r.process(right as f64 * send) as f32;
        let (wet_l, wet_r) = self.convolver.process(in_l, in_r);
        let ret = self.return_gain as f32;
        (wet_l * ret, wet_r * ret)
    }

    /// Clear filter and convolution state; parameters are kept.
    pub fn reset(&mut self) {
        self.lowcut_l.reset();
        self.lowcut_r.reset();
        self.convolver.reset();
    }
}

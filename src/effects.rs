//! Effect parameters and their mappings onto node settings.
//!
//! These curves are the behavioural contract of the control surface: the
//! same knob position must produce the same cutoff, Q, and send level in
//! every host.

use serde::{Deserialize, Serialize};

use crate::dsp::filter::FilterType;

pub const FILTER_CENTER: u8 = 50;
pub const FILTER_MIN_FREQ: f64 = 20.0;
/// Ramp length for master filter changes, seconds.
pub const FILTER_RAMP_SECONDS: f64 = 0.02;
/// Ramp length for reverb send and lowcut changes, seconds.
pub const REVERB_RAMP_SECONDS: f64 = 0.05;
pub const REVERB_SEND_CURVE: f64 = 1.1;
pub const REVERB_SEND_SCALE: f64 = 1.5;
pub const LOWCUT_MIN_HZ: f64 = 80.0;
pub const LOWCUT_MAX_HZ: f64 = 800.0;
pub const LOWCUT_DEFAULT_HZ: f64 = 200.0;
/// Lowcut moves by this fraction of its current value per step.
pub const LOWCUT_STEP_FRACTION: f64 = 0.1;

/// Per-track effect settings. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffectState {
    pub filter_enabled: bool,
    pub filter_position: u8,
    pub reverb_enabled: bool,
    pub reverb_amount: u8,
    pub reverb_lowcut_hz: f64,
}

impl Default for EffectState {
    fn default() -> Self {
        Self {
            filter_enabled: false,
            filter_position: FILTER_CENTER,
            reverb_enabled: false,
            reverb_amount: 0,
            reverb_lowcut_hz: LOWCUT_DEFAULT_HZ,
        }
    }
}

impl EffectState {
    /// Back to defaults for a newly loaded track. The lowcut is a mixing
    /// preference and survives.
    pub fn reset_for_new_track(&mut self) {
        *self = EffectState {
            reverb_lowcut_hz: self.reverb_lowcut_hz,
            ..EffectState::default()
        };
    }
}

/// Perceptual volume curve: `(percent/100)^2`.
pub fn volume_gain(percent: u8) -> f64 {
    let p = percent.min(100) as f64 / 100.0;
    p * p
}

/// Linear element-level volume used when the graph is not in the path.
pub fn element_volume(percent: u8) -> f64 {
    percent.min(100) as f64 / 100.0
}

/// Target settings for the master biquad.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterResponse {
    pub filter_type: FilterType,
    pub frequency: f64,
    pub q: f64,
    /// Whether the change should ramp (otherwise it is applied at once).
    pub ramped: bool,
}

impl FilterResponse {
    fn bypass(max_freq: f64, ramped: bool) -> Self {
        FilterResponse {
            filter_type: FilterType::Allpass,
            frequency: max_freq,
            q: 1.0,
            ramped,
        }
    }
}

/// Map a filter knob position to master filter settings.
///
/// Below centre sweeps a resonant low-pass down from Nyquist, above centre
/// sweeps a high-pass up from 20 Hz; both sides are exponential in
/// frequency with Q rising from 1 to 6 towards the extremes.
pub fn filter_response(enabled: bool, position: u8, sample_rate: f64) -> FilterResponse {
    let max_freq = sample_rate / 2.0;
    let v = position.min(100) as f64;
    if !enabled {
        return FilterResponse::bypass(max_freq, false);
    }
    if position == FILTER_CENTER {
        return FilterResponse::bypass(max_freq, true);
    }
    let (filter_type, normalized, exponent) = if v < 50.0 {
        let n = (49.0 - v) / 49.0;
        (FilterType::Lowpass, n, 1.0 - n)
    } else {
        let n = (v - 51.0) / 49.0;
        (FilterType::Highpass, n, n)
    };
    let freq = FILTER_MIN_FREQ * (max_freq / FILTER_MIN_FREQ).powf(exponent);
    FilterResponse {
        filter_type,
        frequency: freq.max(FILTER_MIN_FREQ),
        q: 1.0 + normalized * 5.0,
        ramped: true,
    }
}

/// Reverb send level; exactly zero whenever reverb is off.
pub fn reverb_send(enabled: bool, amount: u8) -> f64 {
    if !enabled {
        return 0.0;
    }
    (amount.min(100) as f64 / 100.0).powf(REVERB_SEND_CURVE) * REVERB_SEND_SCALE
}

/// Direction of a lowcut nudge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LowcutStep {
    Up,
    Down,
}

/// Move the lowcut by a tenth of its current value, clamped to
/// `[LOWCUT_MIN_HZ, LOWCUT_MAX_HZ]`.
pub fn step_lowcut(current_hz: f64, step: LowcutStep) -> f64 {
    let delta = current_hz * LOWCUT_STEP_FRACTION;
    match step {
        LowcutStep::Up => (current_hz + delta).min(LOWCUT_MAX_HZ),
        LowcutStep::Down => (current_hz - delta).max(LOWCUT_MIN_HZ),
    }
}

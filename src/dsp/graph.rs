//! The effects graph: its node set and fixed topology.
//!
//! ```text
//! source ─┬──────────────────────────────────────────▶ analyser
//!         ├──────────────────────────────▶ master gain ─▶ master filter ─▶ out
//!         └─▶ send ─▶ lowcut ─▶ convolver ─▶ return ─┘
//! ```
//!
//! The analyser sees the raw source, so the waveform does not follow the
//! volume knob. The reverb return joins before the master filter.

use rand::Rng;

use super::analyser::Analyser;
use super::filter::{BiquadFilter, FilterType};
use super::impulse::{self, ImpulseResponse};
use super::param::AudioParam;
use super::reverb::ReverbSend;
use crate::effects::FilterResponse;
use crate::error::GraphError;

/// The master low/high-pass with automatable cutoff and Q.
#[derive(Debug, Clone)]
pub struct MasterFilter {
    pub frequency: AudioParam,
    pub q: AudioParam,
    filter_type: FilterType,
    left: BiquadFilter,
    right: BiquadFilter,
}

impl MasterFilter {
    fn new(sample_rate: f64) -> Self {
        let nyquist = sample_rate / 2.0;
        let mut left = BiquadFilter::new(FilterType::Allpass, sample_rate);
        left.set_frequency(nyquist);
        left.set_q(1.0);
        MasterFilter {
            frequency: AudioParam::new(nyquist),
            q: AudioParam::new(1.0),
            filter_type: FilterType::Allpass,
            right: left.clone(),
            left,
        }
    }

    pub fn filter_type(&self) -> FilterType {
        self.filter_type
    }

    /// Apply a mapped response. Type changes are immediate; cutoff and Q
    /// either jump or ramp over `ramp_seconds`.
    pub fn apply(&mut self, response: &FilterResponse, now: f64, ramp_seconds: f64) {
        self.filter_type = response.filter_type;
        self.left.set_type(response.filter_type);
        self.right.set_type(response.filter_type);
        if response.ramped {
            let end = now + ramp_seconds;
            self.frequency
                .linear_ramp_to_value_at_time(response.frequency, now, end);
            self.q.linear_ramp_to_value_at_time(response.q, now, end);
        } else {
            self.frequency.set_value_at_time(response.frequency, now);
            self.q.set_value_at_time(response.q, now);
        }
    }

    #[inline]
    fn process(&mut self, left: f32, right: f32, time: f64) -> (f32, f32) {
        let freq = self.frequency.advance(time);
        let q = self.q.advance(time);
        for f in [&mut self.left, &mut self.right] {
            f.set_frequency(freq);
            f.set_q(q);
        }
        (
            self.left.process(left as f64) as f32,
            self.right.process(right as f64) as f32,
        )
    }

    fn reset(&mut self) {
        self.left.reset();
        self.right.reset();
    }
}

/// Sample rates a graph can be built at (the WebAudio range).
pub const MIN_SAMPLE_RATE: f64 = 3000.0;
pub const MAX_SAMPLE_RATE: f64 = 768_000.0;

/// Whether `sample_rate` is finite and inside the supported range.
pub fn valid_sample_rate(sample_rate: f64) -> bool {
    (MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&sample_rate)
}

/// All live processing nodes plus the impulse response behind the
/// convolver.
#[derive(Debug, Clone)]
pub struct AudioGraph {
    pub master_gain: AudioParam,
    pub filter: MasterFilter,
    pub reverb: ReverbSend,
    pub analyser: Analyser,
    impulse: ImpulseResponse,
    sample_rate: f64,
    frames: u64,
}

impl AudioGraph {
    /// Build every node. Nothing is returned on failure, so a caller never
    /// holds a partly wired graph.
    pub fn build<R: Rng>(
        sample_rate: f64,
        fft_size: usize,
        lowcut_hz: f64,
        rng: &mut R,
    ) -> Result<Self, GraphError> {
        if !valid_sample_rate(sample_rate) {
            return Err(GraphError::InvalidSampleRate(sample_rate));
        }
        let impulse = impulse::synthesize(sample_rate, rng);
        Ok(AudioGraph {
            master_gain: AudioParam::new(1.0),
            filter: MasterFilter::new(sample_rate),
            reverb: ReverbSend::new(&impulse, lowcut_hz),
            analyser: Analyser::new(fft_size),
            impulse,
            sample_rate,
            frames: 0,
        })
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Audio clock in seconds, advanced by processed frames.
    pub fn current_time(&self) -> f64 {
        self.frames as f64 / self.sample_rate
    }

    pub fn impulse_response(&self) -> &ImpulseResponse {
        &self.impulse
    }

    /// Run one stereo frame through the graph.
    #[inline]
    pub fn process_frame(&mut self, left: f32, right: f32) -> (f32, f32) {
        let time = self.current_time();
        self.analyser.push((left + right) * 0.5);

        let (wet_l, wet_r) = self.reverb.process(left, right, time);
        let gain = self.master_gain.advance(time) as f32;
        let out = self
            .filter
            .process((left + wet_l) * gain, (right + wet_r) * gain, time);

        self.frames += 1;
        out
    }

    /// Process a block of stereo audio in-place.
    pub fn process_block(&mut self, left: &mut [f32], right: &mut [f32]) {
        for i in 0..left.len().min(right.len()) {
            let (out_l, out_r) = self.process_frame(left[i], right[i]);
            left[i] = out_l;
            right[i] = out_r;
        }
    }

    /// Clear all signal history (filters, convolution tail, analyser).
    /// Parameters and the clock are kept.
    pub fn reset_state(&mut self) {
        self.filter.reset();
        self.reverb.reset();
        self.analyser.clear();
    }
}

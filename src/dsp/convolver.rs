//! Stereo convolution with a fixed impulse response.
//!
//! Uniformly partitioned convolution. The first `block` taps of the kernel
//! run in the time domain per sample, so output has no added latency. The
//! rest of the kernel is split into `block`-sized partitions that are
//! applied once per block in the frequency domain (overlap-save over a
//! frequency-domain delay line). Channel `n` of the input is convolved with
//! channel `n` of the response.

use std::fmt;
use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use super::impulse::ImpulseResponse;

// Normalization constants of the WebAudio ConvolverNode.
const GAIN_CALIBRATION_DB: f64 = -58.0;
const GAIN_CALIBRATION_SAMPLE_RATE: f64 = 44100.0;
const MIN_POWER: f64 = 0.000125;

/// Partition size; one WebAudio render quantum.
pub const DEFAULT_BLOCK_SIZE: usize = 128;

/// Scale applied to a response so loud and quiet impulses sit at a similar
/// perceived level (RMS based, calibrated at −58 dB / 44.1 kHz).
pub fn normalization_scale(ir: &ImpulseResponse) -> f64 {
    let len = ir.len();
    if len == 0 {
        return 1.0;
    }
    let power: f64 = ir
        .left
        .iter()
        .chain(&ir.right)
        .map(|&s| (s as f64) * (s as f64))
        .sum();
    let mut power = (power / (2 * len) as f64).sqrt();
    if !power.is_finite() || power < MIN_POWER {
        power = MIN_POWER;
    }
    let mut scale = 1.0 / power;
    scale *= 10f64.powf(GAIN_CALIBRATION_DB * 0.05);
    if ir.sample_rate > 0.0 {
        scale *= GAIN_CALIBRATION_SAMPLE_RATE / ir.sample_rate;
    }
    scale
}

/// Forward and inverse transforms of size `2 * block`, shared by both
/// channels.
#[derive(Clone)]
struct Transforms {
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl Transforms {
    fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(size);
        let inverse = planner.plan_fft_inverse(size);
        let scratch_len = forward
            .get_inplace_scratch_len()
            .max(inverse.get_inplace_scratch_len());
        Transforms {
            forward,
            inverse,
            scratch: vec![Complex::default(); scratch_len],
        }
    }
}

#[derive(Debug, Clone)]
struct Channel {
    /// Kernel taps `0..block`, applied directly.
    head: Vec<f32>,
    /// Spectra of the kernel partitions after the head.
    partitions: Vec<Vec<Complex<f32>>>,
    /// Spectra of past input segments; `spectra[(newest + p) % len]` pairs
    /// with `partitions[p]`.
    spectra: Vec<Vec<Complex<f32>>>,
    newest: usize,
    /// Input block being filled, and the one before it.
    current: Vec<f32>,
    previous: Vec<f32>,
    /// Tail contribution for the block being filled.
    tail: Vec<f32>,
    segment: Vec<Complex<f32>>,
}

impl Channel {
    fn new(kernel: &[f32], scale: f32, block: usize, fft: &mut Transforms) -> Self {
        let size = 2 * block;
        let head = kernel.iter().take(block).map(|&h| h * scale).collect();
        let partitions: Vec<Vec<Complex<f32>>> = kernel
            .get(block..)
            .unwrap_or_default()
            .chunks(block)
            .map(|chunk| {
                let mut spectrum = vec![Complex::default(); size];
                for (bin, &h) in spectrum.iter_mut().zip(chunk) {
                    bin.re = h * scale;
                }
                fft.forward.process_with_scratch(&mut spectrum, &mut fft.scratch);
                spectrum
            })
            .collect();
        let spectra = vec![vec![Complex::default(); size]; partitions.len()];
        Channel {
            head,
            partitions,
            spectra,
            newest: 0,
            current: vec![0.0; block],
            previous: vec![0.0; block],
            tail: vec![0.0; block],
            segment: vec![Complex::default(); size],
        }
    }

    #[inline]
    fn process(&mut self, pos: usize, input: f32) -> f32 {
        self.current[pos] = input;
        let block = self.current.len();
        // head[k] pairs with the input k samples back, which reaches into
        // the previous block once k > pos
        let recent: f32 = self
            .head
            .iter()
            .zip(self.current[..=pos].iter().rev())
            .map(|(h, x)| h * x)
            .sum();
        let older: f32 = self
            .head
            .iter()
            .skip(pos + 1)
            .zip(self.previous[pos + 1..block].iter().rev())
            .map(|(h, x)| h * x)
            .sum();
        recent + older + self.tail[pos]
    }

    /// Called once `current` is full: computes the tail for the next block
    /// and rotates the input blocks.
    fn finish_block(&mut self, fft: &mut Transforms) {
        let block = self.current.len();
        if !self.partitions.is_empty() {
            let slots = self.spectra.len();
            self.newest = (self.newest + slots - 1) % slots;
            let spectrum = &mut self.spectra[self.newest];
            for (bin, &x) in spectrum.iter_mut().zip(self.previous.iter().chain(&self.current)) {
                *bin = Complex::new(x, 0.0);
            }
            fft.forward.process_with_scratch(spectrum, &mut fft.scratch);

            self.segment.fill(Complex::default());
            for (p, partition) in self.partitions.iter().enumerate() {
                let input = &self.spectra[(self.newest + p) % slots];
                for ((acc, h), x) in self.segment.iter_mut().zip(partition).zip(input) {
                    *acc += h * x;
                }
            }
            fft.inverse.process_with_scratch(&mut self.segment, &mut fft.scratch);

            // Overlap-save: only the second half is free of wrap-around
            let norm = 1.0 / self.segment.len() as f32;
            for (out, bin) in self.tail.iter_mut().zip(&self.segment[block..]) {
                *out = bin.re * norm;
            }
        }
        std::mem::swap(&mut self.previous, &mut self.current);
    }

    fn reset(&mut self) {
        self.current.fill(0.0);
        self.previous.fill(0.0);
        self.tail.fill(0.0);
        for spectrum in &mut self.spectra {
            spectrum.fill(Complex::default());
        }
        self.newest = 0;
    }
}

/// A stereo convolver.
#[derive(Clone)]
pub struct Convolver {
    left: Channel,
    right: Channel,
    fft: Transforms,
    kernel_len: usize,
    pos: usize,
}

impl fmt::Debug for Convolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Convolver")
            .field("kernel_len", &self.kernel_len)
            .field("block_size", &self.block_size())
            .field("partitions", &self.left.partitions.len())
            .field("pos", &self.pos)
            .finish()
    }
}

impl Convolver {
    /// Build from a response, scaling it when `normalize` is set.
    pub fn new(ir: &ImpulseResponse, normalize: bool) -> Self {
        Self::with_block_size(ir, normalize, DEFAULT_BLOCK_SIZE)
    }

    /// Build with a specific partition size (at least 1).
    pub fn with_block_size(ir: &ImpulseResponse, normalize: bool, block: usize) -> Self {
        let block = block.max(1);
        let scale = if normalize { normalization_scale(ir) as f32 } else { 1.0 };
        let mut fft = Transforms::new(2 * block);
        let left = Channel::new(&ir.left, scale, block, &mut fft);
        let right = Channel::new(&ir.right, scale, block, &mut fft);
        Convolver {
            left,
            right,
            fft,
            kernel_len: ir.left.len().max(ir.right.len()),
            pos: 0,
        }
    }

    pub fn kernel_len(&self) -> usize {
        self.kernel_len
    }

    pub fn block_size(&self) -> usize {
        self.left.current.len()
    }

    /// Process a stereo sample pair.
    #[inline]
    pub fn process(&mut self, left: f32, right: f32) -> (f32, f32) {
        let out_l = self.left.process(self.pos, left);
        let out_r = self.right.process(self.pos, right);
        self.pos += 1;
        if self.pos == self.block_size() {
            self.left.finish_block(&mut self.fft);
            self.right.finish_block(&mut self.fft);
            self.pos = 0;
        }
        (out_l, out_r)
    }

    /// Clear the input history.
    pub fn reset(&mut self) {
        self.left.reset();
        self.right.reset();
        self.pos = 0;
    }
}

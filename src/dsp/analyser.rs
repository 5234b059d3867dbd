//! Analyser tap: keeps the most recent window of the source signal for the
//! waveform visualizer.

/// Default analysis window, as on a fresh WebAudio AnalyserNode.
pub const DEFAULT_FFT_SIZE: usize = 2048;

/// A ring buffer over the last `fft_size` mono samples.
#[derive(Debug, Clone)]
pub struct Analyser {
    buffer: Vec<f32>,
    write_pos: usize,
}

impl Analyser {
    pub fn new(fft_size: usize) -> Self {
        Analyser {
            buffer: vec![0.0; fft_size.max(32)],
            write_pos: 0,
        }
    }

    pub fn fft_size(&self) -> usize {
        self.buffer.len()
    }

    /// Number of samples the visualizer pulls per frame.
    pub fn frequency_bin_count(&self) -> usize {
        self.buffer.len() / 2
    }

    #[inline]
    pub fn push(&mut self, sample: f32) {
        self.buffer[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();
    }

    /// Copy the start of the latest window (oldest first) as unsigned bytes,
    /// 128 being silence. Extra room in `out` is left untouched.
    pub fn byte_time_domain_data(&self, out: &mut [u8]) {
        let len = self.buffer.len();
        for (i, slot) in out.iter_mut().take(len).enumerate() {
            let sample = self.buffer[(self.write_pos + i) % len];
            *slot = (128.0 * (sample as f64 + 1.0)).clamp(0.0, 255.0) as u8;
        }
    }

    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}

impl Default for Analyser {
    fn default() -> Self {
        Self::new(DEFAULT_FFT_SIZE)
    }
}

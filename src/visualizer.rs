//! Waveform visualizer, a cooperative per-frame task.
//!
//! The host calls [`Visualizer::frame`] from its display-refresh callback
//! and schedules the next one only while the call returns
//! [`FrameRequest::Continue`].

use crate::config::{IdleStyle, VisualizerConfig};
use crate::dsp::analyser::Analyser;

/// How a stroke should be coloured; the host maps these to its theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrokeStyle {
    Waveform,
    Idle,
}

/// A 2D drawing target.
pub trait Surface {
    fn set_backing_size(&mut self, width: f64, height: f64);
    fn clear(&mut self);
    fn stroke_polyline(&mut self, points: &[(f64, f64)], line_width: f64, style: StrokeStyle);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameRequest {
    Continue,
    Stop,
}

/// Polyline for one frame of byte samples, ending on the centre line at the
/// right edge.
pub fn waveform_points(samples: &[u8], width: f64, height: f64) -> Vec<(f64, f64)> {
    let cy = height / 2.0;
    let mut points = Vec::with_capacity(samples.len() + 1);
    if !samples.is_empty() {
        let step = width / samples.len() as f64;
        for (i, &b) in samples.iter().enumerate() {
            let v = b as f64 / 128.0;
            points.push((i as f64 * step, cy + (v - 1.0) * cy));
        }
    }
    points.push((width, cy));
    points
}

#[derive(Debug, Clone)]
pub struct Visualizer {
    config: VisualizerConfig,
    width: f64,
    height: f64,
    running: bool,
    scratch: Vec<u8>,
}

impl Visualizer {
    pub fn new(config: VisualizerConfig) -> Self {
        Visualizer {
            scratch: vec![0; config.fft_size / 2],
            config,
            width: 0.0,
            height: 0.0,
            running: false,
        }
    }

    pub fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Mark the loop as running. Returns `true` if the host should schedule
    /// the first frame (it was not already running).
    pub fn start(&mut self) -> bool {
        !std::mem::replace(&mut self.running, true)
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Match the backing store to the displayed size.
    pub fn resize(&mut self, surface: &mut dyn Surface, width: f64, height: f64) {
        self.width = width.max(0.0);
        self.height = height.max(0.0);
        surface.set_backing_size(self.width, self.height);
    }

    /// The at-rest picture.
    pub fn draw_idle(&self, surface: &mut dyn Surface) {
        surface.clear();
        if self.config.idle == IdleStyle::FlatLine {
            let cy = self.height / 2.0;
            surface.stroke_polyline(
                &[(0.0, cy), (self.width, cy)],
                self.config.line_width,
                StrokeStyle::Idle,
            );
        }
    }

    /// Draw one frame if `eligible` and an analyser is present; otherwise
    /// draw the idle picture and stop.
    pub fn frame(
        &mut self,
        eligible: bool,
        analyser: Option<&Analyser>,
        surface: &mut dyn Surface,
    ) -> FrameRequest {
        let analyser = match (eligible, analyser) {
            (true, Some(a)) => a,
            _ => {
                self.running = false;
                self.draw_idle(surface);
                return FrameRequest::Stop;
            }
        };
        self.running = true;
        self.scratch.resize(analyser.frequency_bin_count(), 128);
        analyser.byte_time_domain_data(&mut self.scratch);

        let points = waveform_points(&self.scratch, self.width, self.height);
        surface.clear();
        surface.stroke_polyline(&points, self.config.line_width, StrokeStyle::Waveform);
        FrameRequest::Continue
    }
}

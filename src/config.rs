//! Player configuration.
//!
//! Every section has a `Default` matching the live player, and JSON input
//! may omit any field. Capability flags are injected here rather than
//! detected, so hosts decide (and tests pin) the audio path.

use serde::{Deserialize, Serialize};

use crate::dsp::analyser::DEFAULT_FFT_SIZE;
use crate::dsp::graph::valid_sample_rate;
use crate::error::ConfigError;

/// What the host can do with audio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Capabilities {
    /// The host can build an audio processing graph at all.
    pub audio_graph_supported: bool,
    /// Background playback matters more than effects (typically mobile).
    /// Routing through a graph would stop audio when the page is hidden.
    pub prefer_background_playback: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            audio_graph_supported: true,
            prefer_background_playback: false,
        }
    }
}

/// What the visualizer draws when it is not eligible to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdleStyle {
    FlatLine,
    Clear,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualizerConfig {
    /// Analyser window; the waveform uses half of it.
    pub fft_size: usize,
    pub line_width: f64,
    pub idle: IdleStyle,
}

impl Default for VisualizerConfig {
    fn default() -> Self {
        Self {
            fft_size: DEFAULT_FFT_SIZE,
            line_width: 2.0,
            idle: IdleStyle::FlatLine,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaSessionConfig {
    pub show_name: String,
    pub album: String,
    pub artwork_url: String,
    pub artwork_sizes: Vec<u32>,
}

impl Default for MediaSessionConfig {
    fn default() -> Self {
        Self {
            show_name: "OFFBEAT".to_string(),
            album: "Offbeat Archive".to_string(),
            artwork_url: "https://vault.petsq.net/offbeat-promo.jpg".to_string(),
            artwork_sizes: vec![96, 128, 192, 256, 384, 512],
        }
    }
}

/// How episode URLs reach the media element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SourceRouting {
    Direct,
    /// Through a CORS relay: `<endpoint>?url=<percent-encoded url>`.
    Relay { endpoint: String },
}

impl Default for SourceRouting {
    fn default() -> Self {
        SourceRouting::Direct
    }
}

impl SourceRouting {
    pub fn route(&self, url: &str) -> String {
        match self {
            SourceRouting::Direct => url.to_string(),
            SourceRouting::Relay { endpoint } => {
                let encoded: String = url::form_urlencoded::byte_serialize(url.as_bytes()).collect();
                let sep = if endpoint.contains('?') { '&' } else { '?' };
                format!("{endpoint}{sep}url={encoded}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Sample rate of the audio graph.
    pub sample_rate: f64,
    /// Seek distance for skip back/forward and media-key seeks.
    pub skip_seconds: f64,
    /// Knob value change per pixel of drag.
    pub knob_sensitivity: f64,
    /// Volume used when nothing is stored yet.
    pub default_volume: u8,
    /// Episode loaded on start when the URL has no valid hash.
    pub default_episode: Option<u32>,
    pub capabilities: Capabilities,
    pub visualizer: VisualizerConfig,
    pub media_session: MediaSessionConfig,
    pub routing: SourceRouting,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100.0,
            skip_seconds: 30.0,
            knob_sensitivity: 0.15,
            default_volume: 80,
            default_episode: Some(23),
            capabilities: Capabilities::default(),
            visualizer: VisualizerConfig::default(),
            media_session: MediaSessionConfig::default(),
            routing: SourceRouting::default(),
        }
    }
}

impl PlayerConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: PlayerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let check = |field: &'static str, value: f64, ok: bool| {
            if ok && value.is_finite() {
                Ok(())
            } else {
                Err(ConfigError::OutOfRange { field, value })
            }
        };
        check(
            "sample_rate",
            self.sample_rate,
            valid_sample_rate(self.sample_rate),
        )?;
        check("skip_seconds", self.skip_seconds, self.skip_seconds > 0.0)?;
        check(
            "knob_sensitivity",
            self.knob_sensitivity,
            self.knob_sensitivity > 0.0,
        )?;
        check(
            "default_volume",
            self.default_volume as f64,
            self.default_volume <= 100,
        )?;
        let fft = self.visualizer.fft_size;
        check(
            "visualizer.fft_size",
            fft as f64,
            fft.is_power_of_two() && (32..=32768).contains(&fft),
        )?;
        Ok(())
    }
}

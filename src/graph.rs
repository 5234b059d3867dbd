//! Audio graph manager: owns the effects graph and its lifecycle.
//!
//! ```text
//! Uninitialized ──attach──▶ Active ◀──resume── Suspended
//!       │                     │ └────suspend────▶ │
//!       └──attach (no graph)──┼──▶ PassThrough    │
//!                             └────teardown───────┴──▶ TornDown
//! ```
//!
//! Effect settings live here whatever the state, and are pushed into the
//! graph whenever it (re)connects.

use log::{debug, info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::config::Capabilities;
use crate::dsp::analyser::Analyser;
use crate::dsp::graph::AudioGraph;
use crate::effects::{
    self, EffectState, LowcutStep, FILTER_RAMP_SECONDS, REVERB_RAMP_SECONDS,
};
use crate::engine::MediaElement;
use crate::error::GraphError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PassThroughReason {
    /// Effects were traded for background playback.
    BackgroundPlayback,
    /// The graph could not be built.
    Unsupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GraphState {
    Uninitialized,
    Active,
    Suspended,
    PassThrough(PassThroughReason),
    TornDown,
}

/// The one connection from the media element into the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceConnection {
    pub id: u32,
}

pub struct AudioGraphManager {
    state: GraphState,
    graph: Option<AudioGraph>,
    source: Option<SourceConnection>,
    connections_made: u32,
    effects: EffectState,
    volume_percent: u8,
    capabilities: Capabilities,
    sample_rate: f64,
    fft_size: usize,
    rng: StdRng,
}

impl AudioGraphManager {
    pub fn new(capabilities: Capabilities, sample_rate: f64, fft_size: usize, volume_percent: u8) -> Self {
        Self::with_rng(
            capabilities,
            sample_rate,
            fft_size,
            volume_percent,
            StdRng::from_entropy(),
        )
    }

    /// Like `new`, with a fixed noise source for the impulse response.
    pub fn with_rng(
        capabilities: Capabilities,
        sample_rate: f64,
        fft_size: usize,
        volume_percent: u8,
        rng: StdRng,
    ) -> Self {
        AudioGraphManager {
            state: GraphState::Uninitialized,
            graph: None,
            source: None,
            connections_made: 0,
            effects: EffectState::default(),
            volume_percent: volume_percent.min(100),
            capabilities,
            sample_rate,
            fft_size,
            rng,
        }
    }

    pub fn state(&self) -> GraphState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == GraphState::Active
    }

    /// Whether filter and reverb can have any effect now or later.
    pub fn effects_available(&self) -> bool {
        matches!(
            self.state,
            GraphState::Uninitialized | GraphState::Active | GraphState::Suspended
        )
    }

    pub fn effects(&self) -> &EffectState {
        &self.effects
    }

    pub fn volume_percent(&self) -> u8 {
        self.volume_percent
    }

    pub fn source(&self) -> Option<SourceConnection> {
        self.source
    }

    /// Number of source connections created so far.
    pub fn connections_made(&self) -> u32 {
        self.connections_made
    }

    pub fn graph(&self) -> Option<&AudioGraph> {
        self.graph.as_ref()
    }

    /// The analyser, only while the graph is live.
    pub fn analyser(&self) -> Option<&Analyser> {
        match self.state {
            GraphState::Active => self.graph.as_ref().map(|g| &g.analyser),
            _ => None,
        }
    }

    fn now(&self) -> f64 {
        self.graph.as_ref().map_or(0.0, AudioGraph::current_time)
    }

    /// Build and connect the graph on first use. Idempotent: any state
    /// other than `Uninitialized` returns `Ok` without touching anything.
    ///
    /// An `Err` means the manager fell back to pass-through for good; it is
    /// returned once, on the attach that failed.
    pub fn attach(&mut self, media: &mut dyn MediaElement) -> Result<(), GraphError> {
        if self.state != GraphState::Uninitialized {
            debug!("attach ignored in state {:?}", self.state);
            return Ok(());
        }

        if self.capabilities.prefer_background_playback {
            info!("Background playback preferred, effects disabled");
            self.state = GraphState::PassThrough(PassThroughReason::BackgroundPlayback);
            media.set_volume(effects::element_volume(self.volume_percent));
            return Ok(());
        }

        let built = if self.capabilities.audio_graph_supported {
            AudioGraph::build(
                self.sample_rate,
                self.fft_size,
                self.effects.reverb_lowcut_hz,
                &mut self.rng,
            )
        } else {
            Err(GraphError::Unsupported {
                reason: "host reports no audio graph support".into(),
            })
        };

        match built {
            Ok(graph) => {
                self.graph = Some(graph);
                self.connect_source();
                self.state = GraphState::Active;
                media.set_volume(1.0);
                self.apply_volume();
                self.apply_filter();
                self.apply_reverb();
                self.apply_lowcut();
                info!("Audio graph attached at {} Hz", self.sample_rate);
                Ok(())
            }
            Err(e) => {
                warn!("Audio graph unavailable, falling back to plain playback: {e}");
                self.state = GraphState::PassThrough(PassThroughReason::Unsupported);
                media.set_volume(effects::element_volume(self.volume_percent));
                Err(e)
            }
        }
    }

    fn connect_source(&mut self) {
        if self.source.is_some() {
            return;
        }
        self.connections_made += 1;
        self.source = Some(SourceConnection {
            id: self.connections_made,
        });
    }

    /// Drop the source while hidden. Returns whether anything changed.
    pub fn suspend(&mut self, media: &mut dyn MediaElement) -> bool {
        if self.state != GraphState::Active {
            return false;
        }
        self.source = None;
        self.state = GraphState::Suspended;
        media.set_volume(effects::element_volume(self.volume_percent));
        info!("Audio graph suspended");
        true
    }

    /// Reconnect after `suspend`, reapplying volume and effects.
    pub fn resume(&mut self, media: &mut dyn MediaElement) -> bool {
        if self.state != GraphState::Suspended {
            return false;
        }
        if let Some(graph) = self.graph.as_mut() {
            graph.reset_state();
        }
        self.connect_source();
        self.state = GraphState::Active;
        media.set_volume(1.0);
        self.apply_volume();
        self.apply_filter();
        self.apply_reverb();
        self.apply_lowcut();
        info!("Audio graph resumed");
        true
    }

    pub fn teardown(&mut self, media: &mut dyn MediaElement) {
        if self.state == GraphState::TornDown {
            return;
        }
        self.source = None;
        self.graph = None;
        self.state = GraphState::TornDown;
        media.set_volume(effects::element_volume(self.volume_percent));
        info!("Audio graph torn down");
    }

    pub fn set_volume(&mut self, percent: u8, media: &mut dyn MediaElement) {
        self.volume_percent = percent.min(100);
        if self.is_active() {
            self.apply_volume();
        } else {
            media.set_volume(effects::element_volume(self.volume_percent));
        }
    }

    fn apply_volume(&mut self) {
        let gain = effects::volume_gain(self.volume_percent);
        let now = self.now();
        if let Some(graph) = self.graph.as_mut() {
            graph.master_gain.set_value_at_time(gain, now);
        }
    }

    fn apply_filter(&mut self) {
        if !self.is_active() {
            return;
        }
        let response = effects::filter_response(
            self.effects.filter_enabled,
            self.effects.filter_position,
            self.sample_rate,
        );
        let now = self.now();
        if let Some(graph) = self.graph.as_mut() {
            graph.filter.apply(&response, now, FILTER_RAMP_SECONDS);
        }
    }

    fn apply_reverb(&mut self) {
        if !self.is_active() {
            return;
        }
        let send = effects::reverb_send(self.effects.reverb_enabled, self.effects.reverb_amount);
        let now = self.now();
        if let Some(graph) = self.graph.as_mut() {
            graph
                .reverb
                .send
                .linear_ramp_to_value_at_time(send, now, now + REVERB_RAMP_SECONDS);
        }
    }

    fn apply_lowcut(&mut self) {
        if !self.is_active() {
            return;
        }
        let hz = self.effects.reverb_lowcut_hz;
        let now = self.now();
        if let Some(graph) = self.graph.as_mut() {
            graph
                .reverb
                .lowcut
                .linear_ramp_to_value_at_time(hz, now, now + REVERB_RAMP_SECONDS);
        }
    }

    /// Returns `false` (and changes nothing) when effects are unavailable.
    pub fn set_filter_enabled(&mut self, enabled: bool) -> bool {
        if !self.effects_available() {
            return false;
        }
        self.effects.filter_enabled = enabled;
        self.apply_filter();
        true
    }

    pub fn toggle_filter(&mut self) -> bool {
        let enabled = !self.effects.filter_enabled;
        self.set_filter_enabled(enabled)
    }

    pub fn set_filter_position(&mut self, position: u8) -> bool {
        if !self.effects_available() {
            return false;
        }
        self.effects.filter_position = position.min(100);
        self.apply_filter();
        true
    }

    pub fn set_reverb_enabled(&mut self, enabled: bool) -> bool {
        if !self.effects_available() {
            return false;
        }
        self.effects.reverb_enabled = enabled;
        self.apply_reverb();
        true
    }

    pub fn toggle_reverb(&mut self) -> bool {
        let enabled = !self.effects.reverb_enabled;
        self.set_reverb_enabled(enabled)
    }

    pub fn set_reverb_amount(&mut self, amount: u8) -> bool {
        if !self.effects_available() {
            return false;
        }
        self.effects.reverb_amount = amount.min(100);
        self.apply_reverb();
        true
    }

    /// Nudge the reverb lowcut, returning the new frequency.
    pub fn step_lowcut(&mut self, step: LowcutStep) -> Option<f64> {
        if !self.effects_available() {
            return None;
        }
        self.effects.reverb_lowcut_hz = effects::step_lowcut(self.effects.reverb_lowcut_hz, step);
        self.apply_lowcut();
        debug!("Reverb lowcut: {:.0} Hz", self.effects.reverb_lowcut_hz);
        Some(self.effects.reverb_lowcut_hz)
    }

    /// Back to default effects for a new track.
    pub fn reset_effects(&mut self) {
        self.effects.reset_for_new_track();
        self.apply_filter();
        self.apply_reverb();
    }

    /// Run audio through the graph while it is active. In any other state
    /// the block is left as it is.
    pub fn process_block(&mut self, left: &mut [f32], right: &mut [f32]) {
        if !self.is_active() {
            return;
        }
        if let Some(graph) = self.graph.as_mut() {
            graph.process_block(left, right);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::filter::FilterType;
    use crate::engine::tests::FakeMedia;

    const SR: f64 = 8000.0;

    fn manager(capabilities: Capabilities) -> AudioGraphManager {
        AudioGraphManager::with_rng(capabilities, SR, 2048, 80, StdRng::seed_from_u64(3))
    }

    fn run(m: &mut AudioGraphManager, frames: usize) {
        let mut l = vec![0.0f32; frames];
        let mut r = vec![0.0f32; frames];
        m.process_block(&mut l, &mut r);
    }

    #[test]
    fn attach_builds_once() {
        let media = FakeMedia::default();
        let mut el = media.clone();
        let mut m = manager(Capabilities::default());
        assert_eq!(m.state(), GraphState::Uninitialized);
        assert!(m.analyser().is_none());

        m.attach(&mut el).unwrap();
        assert_eq!(m.state(), GraphState::Active);
        assert_eq!(media.0.borrow().volume, 1.0, "element held at unity");
        let gain = m.graph().unwrap().master_gain.value();
        assert!((gain - 0.64).abs() < 1e-12);

        m.attach(&mut el).unwrap();
        assert_eq!(m.connections_made(), 1, "second attach must not reconnect");
        assert!(m.analyser().is_some());
    }

    #[test]
    fn background_preference_passes_through() {
        let media = FakeMedia::default();
        let mut el = media.clone();
        let mut m = manager(Capabilities {
            audio_graph_supported: true,
            prefer_background_playback: true,
        });
        m.attach(&mut el).unwrap();
        assert_eq!(
            m.state(),
            GraphState::PassThrough(PassThroughReason::BackgroundPlayback)
        );
        assert!(m.graph().is_none());
        assert!((media.0.borrow().volume - 0.8).abs() < 1e-12);

        m.set_volume(50, &mut el);
        assert!((media.0.borrow().volume - 0.5).abs() < 1e-12, "linear on the element");
        assert!(!m.toggle_filter());
        assert!(!m.effects().filter_enabled, "inert controls do not change state");
    }

    #[test]
    fn unsupported_graph_fails_once_then_stays_passthrough() {
        let mut el = FakeMedia::default();
        let mut m = manager(Capabilities {
            audio_graph_supported: false,
            prefer_background_playback: false,
        });
        assert!(m.attach(&mut el).is_err());
        assert_eq!(m.state(), GraphState::PassThrough(PassThroughReason::Unsupported));
        assert!(m.graph().is_none(), "nothing half-built");
        assert!(m.attach(&mut el).is_ok(), "only the failing attach reports");
        assert_eq!(m.connections_made(), 0);
    }

    #[test]
    fn invalid_sample_rate_falls_back() {
        let mut el = FakeMedia::default();
        let mut m =
            AudioGraphManager::with_rng(Capabilities::default(), 0.0, 2048, 80, StdRng::seed_from_u64(1));
        assert_eq!(m.attach(&mut el), Err(GraphError::InvalidSampleRate(0.0)));
        assert!(!m.effects_available());
    }

    #[test]
    fn suspend_resume_cycle() {
        let media = FakeMedia::default();
        let mut el = media.clone();
        let mut m = manager(Capabilities::default());
        assert!(!m.suspend(&mut el), "nothing to suspend yet");
        m.attach(&mut el).unwrap();
        m.set_filter_enabled(true);
        m.set_filter_position(10);

        assert!(m.suspend(&mut el));
        assert_eq!(m.state(), GraphState::Suspended);
        assert!(m.source().is_none());
        assert!(m.analyser().is_none());
        assert!((media.0.borrow().volume - 0.8).abs() < 1e-12);

        m.set_volume(100, &mut el);
        assert_eq!(media.0.borrow().volume, 1.0);

        assert!(m.resume(&mut el));
        assert!(!m.resume(&mut el));
        assert_eq!(m.state(), GraphState::Active);
        assert_eq!(m.source(), Some(SourceConnection { id: 2 }));
        assert_eq!(m.graph().unwrap().master_gain.value(), 1.0);
        assert_eq!(m.graph().unwrap().filter.filter_type(), FilterType::Lowpass);
    }

    #[test]
    fn resume_keeps_the_impulse_response() {
        let mut el = FakeMedia::default();
        let mut m = manager(Capabilities::default());
        m.attach(&mut el).unwrap();
        let before = m.graph().unwrap().impulse_response().clone();
        let buffer = before.left.as_ptr();

        m.suspend(&mut el);
        m.resume(&mut el);
        let graph = m.graph().unwrap();
        assert_eq!(graph.impulse_response(), &before);
        assert_eq!(graph.impulse_response().left.as_ptr(), buffer, "same buffer, not a new one");
    }

    #[test]
    fn lowcut_step_ramps_the_send_filter() {
        let mut el = FakeMedia::default();
        let mut m = manager(Capabilities::default());
        m.attach(&mut el).unwrap();
        run(&mut m, 800);
        let now = m.graph().unwrap().current_time();

        assert_eq!(m.step_lowcut(LowcutStep::Up), Some(220.0));
        let lowcut = &m.graph().unwrap().reverb.lowcut;
        assert!(lowcut.is_ramping());
        assert_eq!(lowcut.target(), 220.0);
        assert!((lowcut.value_at(now + REVERB_RAMP_SECONDS / 2.0) - 210.0).abs() < 1e-9);
        assert_eq!(lowcut.value_at(now + REVERB_RAMP_SECONDS), 220.0);
    }

    #[test]
    fn teardown_is_terminal() {
        let mut el = FakeMedia::default();
        let mut m = manager(Capabilities::default());
        m.attach(&mut el).unwrap();
        m.teardown(&mut el);
        assert_eq!(m.state(), GraphState::TornDown);
        assert!(m.graph().is_none());
        assert!(m.attach(&mut el).is_ok());
        assert_eq!(m.state(), GraphState::TornDown);
        assert!(!m.resume(&mut el));
    }

    #[test]
    fn reverb_send_ramps_and_disables_to_zero() {
        let mut el = FakeMedia::default();
        let mut m = manager(Capabilities::default());
        m.attach(&mut el).unwrap();
        m.set_reverb_amount(100);
        assert_eq!(m.graph().unwrap().reverb.send.target(), 0.0, "off means zero");

        m.set_reverb_enabled(true);
        assert!((m.graph().unwrap().reverb.send.target() - 1.5).abs() < 1e-12);
        run(&mut m, 800);
        assert!((m.graph().unwrap().reverb.send.value() - 1.5).abs() < 1e-12);

        m.toggle_reverb();
        run(&mut m, 800);
        assert_eq!(m.graph().unwrap().reverb.send.value(), 0.0);
    }

    #[test]
    fn reset_effects_returns_graph_to_neutral() {
        let mut el = FakeMedia::default();
        let mut m = manager(Capabilities::default());
        m.attach(&mut el).unwrap();
        m.set_filter_enabled(true);
        m.set_filter_position(90);
        m.set_reverb_enabled(true);
        m.set_reverb_amount(60);
        let lowcut = m.step_lowcut(LowcutStep::Up).unwrap();
        run(&mut m, 800);

        m.reset_effects();
        assert_eq!(*m.effects(), EffectState { reverb_lowcut_hz: lowcut, ..EffectState::default() });
        let graph = m.graph().unwrap();
        assert_eq!(graph.filter.filter_type(), FilterType::Allpass);
        assert_eq!(graph.filter.frequency.value(), SR / 2.0);
        assert_eq!(graph.reverb.send.target(), 0.0);
    }

    #[test]
    fn effects_set_before_attach_apply_on_attach() {
        let mut el = FakeMedia::default();
        let mut m = manager(Capabilities::default());
        assert!(m.set_reverb_enabled(true));
        assert!(m.set_reverb_amount(100));
        m.attach(&mut el).unwrap();
        assert!((m.graph().unwrap().reverb.send.target() - 1.5).abs() < 1e-12);
    }

    #[test]
    fn inactive_block_passes_through() {
        let mut m = manager(Capabilities::default());
        let mut l = vec![0.3f32; 16];
        let mut r = vec![-0.3f32; 16];
        m.process_block(&mut l, &mut r);
        assert!(l.iter().all(|&s| s == 0.3));
        assert!(r.iter().all(|&s| s == -0.3));
    }
}

//! Player: one of each component, and the routing between them.
//!
//! Every host callback lands on a `&mut self` method here. Nothing is
//! shared or locked; asynchronous outcomes (play starting, metadata
//! arriving) come back in as [`MediaEvent`]s.

use log::{debug, info};

use crate::catalog::{episode_hash, Catalog, EpisodeRecord};
use crate::config::PlayerConfig;
use crate::control::{key_command, nudge, ControlSurface, Knob, KeyCommand, KnobChange, PointerEvent};
use crate::effects::{EffectState, LowcutStep};
use crate::engine::{EngineEvent, MediaElement, MediaEvent, PlaybackEngine, PlaybackSession, SubscriptionId};
use crate::error::PlayerError;
use crate::graph::{AudioGraphManager, GraphState};
use crate::media_session::{position_state, MediaAction, MediaSessionState, NowPlaying};
use crate::notice::Notice;
use crate::settings::{store_quietly, Settings, SettingsStore, Theme, THEME_KEY, VOLUME_KEY};
use crate::switcher::{PendingSwitch, SwitchDecision, TrackSwitchController};
use crate::visualizer::{FrameRequest, Surface, Visualizer};

pub struct Player {
    config: PlayerConfig,
    catalog: Catalog,
    engine: PlaybackEngine,
    graph: AudioGraphManager,
    controls: ControlSurface,
    visualizer: Visualizer,
    switcher: TrackSwitchController,
    media_session: MediaSessionState,
    settings: Box<dyn SettingsStore>,
    theme: Theme,
    visible: bool,
    location_hash: Option<String>,
    notices: Vec<Notice>,
}

impl Player {
    pub fn new(
        config: PlayerConfig,
        catalog: Catalog,
        media: Box<dyn MediaElement>,
        settings: Box<dyn SettingsStore>,
    ) -> Self {
        let graph = AudioGraphManager::new(
            config.capabilities,
            config.sample_rate,
            config.visualizer.fft_size,
            config.default_volume,
        );
        Self::with_graph(config, catalog, media, settings, graph)
    }

    /// Like `new`, with a caller-built graph manager (fixed noise seed,
    /// different capabilities).
    pub fn with_graph(
        config: PlayerConfig,
        catalog: Catalog,
        mut media: Box<dyn MediaElement>,
        settings: Box<dyn SettingsStore>,
        mut graph: AudioGraphManager,
    ) -> Self {
        let stored = Settings::load(settings.as_ref(), config.default_volume);
        graph.set_volume(stored.volume_percent, media.as_mut());
        let engine = PlaybackEngine::new(
            media,
            config.routing.clone(),
            config.skip_seconds,
            stored.volume_percent,
        );
        Player {
            controls: ControlSurface::new(config.knob_sensitivity),
            visualizer: Visualizer::new(config.visualizer.clone()),
            switcher: TrackSwitchController::new(config.media_session.show_name.clone()),
            media_session: MediaSessionState::default(),
            theme: stored.theme,
            visible: true,
            location_hash: None,
            notices: Vec::new(),
            config,
            catalog,
            engine,
            graph,
            settings,
        }
    }

    /// Build from the host's config and catalog documents.
    pub fn from_json(
        config_json: &str,
        catalog_json: &str,
        media: Box<dyn MediaElement>,
        settings: Box<dyn SettingsStore>,
    ) -> Result<Self, PlayerError> {
        let config = PlayerConfig::from_json(config_json)?;
        let catalog = Catalog::from_json(catalog_json)?;
        info!("player configured with {} episodes", catalog.len());
        Ok(Self::new(config, catalog, media, settings))
    }

    /// Like `from_json`, with settings kept in the platform config directory.
    #[cfg(feature = "settings-file")]
    pub fn from_json_with_settings_file(
        config_json: &str,
        catalog_json: &str,
        media: Box<dyn MediaElement>,
    ) -> Result<Self, PlayerError> {
        let store = crate::settings::JsonFileStore::open_default()?;
        Self::from_json(config_json, catalog_json, media, Box::new(store))
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn session(&self) -> &PlaybackSession {
        self.engine.session()
    }

    pub fn current_episode(&self) -> Option<&EpisodeRecord> {
        self.session().current.and_then(|i| self.catalog.get(i))
    }

    pub fn effects(&self) -> &EffectState {
        self.graph.effects()
    }

    pub fn graph(&self) -> &AudioGraphManager {
        &self.graph
    }

    pub fn graph_state(&self) -> GraphState {
        self.graph.state()
    }

    pub fn controls(&self) -> &ControlSurface {
        &self.controls
    }

    pub fn media_session(&self) -> &MediaSessionState {
        &self.media_session
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn location_hash(&self) -> Option<&str> {
        self.location_hash.as_deref()
    }

    pub fn pending_switch(&self) -> Option<&PendingSwitch> {
        self.switcher.pending()
    }

    /// Whether the host should keep requesting animation frames.
    pub fn wants_animation_frame(&self) -> bool {
        self.visualizer.is_running()
    }

    /// Notices raised since the last call.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&EngineEvent) + 'static,
    {
        self.engine.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.engine.unsubscribe(id)
    }

    fn notify(&mut self, notice: Notice) {
        info!("Notice: {}", notice.message());
        self.notices.push(notice);
    }

    /// Load the episode named by `hash`, or the default one.
    pub fn initialize(&mut self, hash: Option<&str>) {
        let index = self
            .switcher
            .initial_index(&self.catalog, hash, self.config.default_episode);
        self.load_index(index, false);
    }

    fn load_index(&mut self, index: usize, autoplay: bool) {
        let Some(episode) = self.catalog.get(index).cloned() else {
            return;
        };
        self.engine.load(index, &episode.url);
        self.graph.reset_effects();
        self.controls.reset_all();
        self.location_hash = Some(episode_hash(episode.number));
        self.media_session.metadata = Some(NowPlaying::for_episode(&episode, &self.config.media_session));
        self.media_session.position = None;
        if autoplay {
            self.play();
        }
    }

    fn apply_decision(&mut self, decision: SwitchDecision) -> SwitchDecision {
        if let SwitchDecision::Load { index, autoplay } = decision {
            self.load_index(index, autoplay);
        }
        decision
    }

    /// The user picked an episode from the list.
    pub fn select_episode(&mut self, number: u32) -> SwitchDecision {
        let session = self.engine.session();
        let decision = self
            .switcher
            .select(&self.catalog, number, session.current, session.is_playing);
        self.apply_decision(decision)
    }

    pub fn confirm_switch(&mut self) {
        if let Some(decision) = self.switcher.confirm() {
            self.apply_decision(decision);
        }
    }

    pub fn cancel_switch(&mut self) {
        self.switcher.cancel();
    }

    pub fn previous_track(&mut self) -> SwitchDecision {
        let session = self.engine.session();
        let decision = self
            .switcher
            .previous(&self.catalog, session.current, session.is_playing);
        self.apply_decision(decision)
    }

    pub fn next_track(&mut self) -> SwitchDecision {
        let session = self.engine.session();
        let decision = self
            .switcher
            .next(&self.catalog, session.current, session.is_playing);
        self.apply_decision(decision)
    }

    pub fn handle_hash_change(&mut self, hash: &str) {
        let current = self.engine.session().current;
        let decision = self.switcher.hash_changed(&self.catalog, hash, current);
        self.apply_decision(decision);
    }

    /// A play intent from the user. The first one also builds the graph.
    pub fn play(&mut self) {
        if self.visible {
            self.ensure_graph();
        }
        self.engine.play();
    }

    pub fn pause(&mut self) {
        self.engine.pause();
    }

    pub fn toggle_playback(&mut self) {
        if self.engine.is_playing() {
            self.pause();
        } else {
            self.play();
        }
    }

    pub fn seek(&mut self, seconds: f64) {
        self.engine.seek(seconds);
        self.refresh_position();
    }

    pub fn seek_fraction(&mut self, fraction: f64) {
        self.engine.seek_fraction(fraction);
        self.refresh_position();
    }

    pub fn skip_backward(&mut self) {
        self.engine.skip_backward();
        self.refresh_position();
    }

    pub fn skip_forward(&mut self) {
        self.engine.skip_forward();
        self.refresh_position();
    }

    fn ensure_graph(&mut self) {
        match self.graph.state() {
            GraphState::Uninitialized => {
                if self.graph.attach(self.engine.media_mut()).is_err() {
                    self.notify(Notice::EffectsUnavailable);
                }
            }
            GraphState::Suspended => {
                self.graph.resume(self.engine.media_mut());
            }
            _ => {}
        }
    }

    fn refresh_position(&mut self) {
        let rate = self.engine.media().playback_rate();
        self.media_session.position = position_state(self.engine.session(), rate);
    }

    /// Something happened on the media element.
    pub fn handle_media_event(&mut self, event: MediaEvent) {
        if let Some(notice) = self.engine.dispatch(event) {
            self.notify(notice);
        }
        match event {
            MediaEvent::Play => {
                if self.visible {
                    self.ensure_graph();
                }
                self.media_session.playing = true;
                self.start_visualizer();
            }
            MediaEvent::Pause | MediaEvent::Error(_) => {
                self.media_session.playing = false;
            }
            MediaEvent::TimeUpdate { .. } | MediaEvent::LoadedMetadata { .. } => {
                self.refresh_position();
            }
            MediaEvent::Ended => {
                self.media_session.playing = false;
                self.media_session.position = None;
                self.graph.reset_effects();
                self.controls.reset_all();
            }
            MediaEvent::PlayRejected => {}
        }
    }

    fn visualizer_eligible(&self) -> bool {
        self.engine.is_playing() && self.graph.analyser().is_some()
    }

    fn start_visualizer(&mut self) -> bool {
        self.visualizer_eligible() && self.visualizer.start()
    }

    /// The host's display-refresh tick. Returns whether to schedule another.
    pub fn animation_frame(&mut self, surface: &mut dyn Surface) -> bool {
        let eligible = self.visualizer_eligible();
        let request = self.visualizer.frame(eligible, self.graph.analyser(), surface);
        request == FrameRequest::Continue
    }

    pub fn resize_canvas(&mut self, surface: &mut dyn Surface, width: f64, height: f64) {
        self.visualizer.resize(surface, width, height);
        if !self.visualizer.is_running() {
            self.visualizer.draw_idle(surface);
        }
    }

    /// Page visibility changed.
    pub fn set_visibility(&mut self, visible: bool) {
        if self.visible == visible {
            return;
        }
        self.visible = visible;
        debug!("Visibility: {visible}");
        if !visible {
            if self.engine.is_playing() && self.graph.suspend(self.engine.media_mut()) {
                self.visualizer.stop();
            }
        } else if self.engine.is_playing() {
            self.ensure_graph();
            self.start_visualizer();
        }
    }

    /// Run host audio through the effects graph.
    pub fn process_audio(&mut self, left: &mut [f32], right: &mut [f32]) {
        self.graph.process_block(left, right);
    }

    pub fn set_volume(&mut self, percent: u8) {
        let percent = percent.min(100);
        self.graph.set_volume(percent, self.engine.media_mut());
        self.engine.set_volume_percent(percent);
        store_quietly(self.settings.as_mut(), VOLUME_KEY, &percent.to_string());
    }

    pub fn toggle_theme(&mut self) -> Theme {
        self.theme = self.theme.toggled();
        store_quietly(self.settings.as_mut(), THEME_KEY, self.theme.as_str());
        self.theme
    }

    /// Push a knob change into the graph. A rejected change puts the knob
    /// back on the effect's value and yields nothing to render.
    fn apply_knob(&mut self, change: KnobChange) -> Option<KnobChange> {
        let applied = match change.knob {
            Knob::Filter => self.graph.set_filter_position(change.value),
            Knob::Reverb => self.graph.set_reverb_amount(change.value),
        };
        if applied {
            return Some(change);
        }
        let effects = self.graph.effects();
        let current = match change.knob {
            Knob::Filter => effects.filter_position,
            Knob::Reverb => effects.reverb_amount,
        };
        self.controls.set_value(change.knob, current);
        None
    }

    /// Pointer input on a knob. Returns the accepted change to render.
    pub fn handle_pointer(&mut self, event: PointerEvent) -> Option<KnobChange> {
        let change = self.controls.handle_pointer(event)?;
        self.apply_knob(change)
    }

    /// Slider-style direct input on a knob.
    pub fn set_knob(&mut self, knob: Knob, value: u8) -> Option<KnobChange> {
        let change = self.controls.set_value(knob, value)?;
        self.apply_knob(change)
    }

    pub fn toggle_filter(&mut self) -> bool {
        self.graph.toggle_filter()
    }

    pub fn toggle_reverb(&mut self) -> bool {
        self.graph.toggle_reverb()
    }

    pub fn step_lowcut(&mut self, step: LowcutStep) -> Option<f64> {
        self.graph.step_lowcut(step)
    }

    /// A key press. Returns whether it was a shortcut.
    pub fn handle_key(&mut self, code: &str, in_text_input: bool) -> bool {
        let Some(command) = key_command(code, in_text_input) else {
            return false;
        };
        match command {
            KeyCommand::TogglePlayback => self.toggle_playback(),
            KeyCommand::ToggleTheme => {
                self.toggle_theme();
            }
            KeyCommand::ResetKnob(knob) => {
                let change = self.controls.reset(knob);
                self.apply_knob(change);
            }
            KeyCommand::ToggleFilter => {
                self.toggle_filter();
            }
            KeyCommand::ToggleReverb => {
                self.toggle_reverb();
            }
            KeyCommand::Volume(step) => {
                let volume = nudge(self.engine.session().volume_percent, step);
                self.set_volume(volume);
            }
            KeyCommand::Filter(step) => {
                let value = nudge(self.controls.value(Knob::Filter), step);
                self.set_knob(Knob::Filter, value);
            }
            KeyCommand::Lowcut(step) => {
                self.step_lowcut(step);
            }
        }
        true
    }

    /// An OS-level transport action.
    pub fn handle_media_action(&mut self, action: MediaAction) {
        match action {
            MediaAction::Play => self.play(),
            MediaAction::Pause => self.pause(),
            MediaAction::SeekBackward => self.skip_backward(),
            MediaAction::SeekForward => self.skip_forward(),
            MediaAction::PreviousTrack => {
                self.previous_track();
            }
            MediaAction::NextTrack => {
                self.next_track();
            }
        }
    }

    /// Release the graph for good; playback continues on the element.
    pub fn shutdown(&mut self) {
        self.visualizer.stop();
        self.graph.teardown(self.engine.media_mut());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::offbeat_catalog;
    use crate::config::Capabilities;
    use crate::dsp::filter::FilterType;
    use crate::engine::tests::FakeMedia;
    use crate::engine::MediaFault;
    use crate::graph::PassThroughReason;
    use crate::settings::MemoryStore;
    use crate::visualizer::tests::RecordingSurface;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn player_with(config: PlayerConfig) -> (Player, FakeMedia) {
        let media = FakeMedia::default();
        let graph = AudioGraphManager::with_rng(
            config.capabilities,
            8000.0,
            config.visualizer.fft_size,
            config.default_volume,
            StdRng::seed_from_u64(7),
        );
        let player = Player::with_graph(
            config,
            offbeat_catalog(),
            Box::new(media.clone()),
            Box::new(MemoryStore::default()),
            graph,
        );
        (player, media)
    }

    fn player() -> (Player, FakeMedia) {
        player_with(PlayerConfig::default())
    }

    /// Load, ask to play, and report that playback started.
    fn start_playing(p: &mut Player) {
        p.play();
        p.handle_media_event(MediaEvent::LoadedMetadata { duration: 3600.0 });
        p.handle_media_event(MediaEvent::Play);
    }

    #[test]
    fn initialize_uses_hash_or_default() {
        let (mut p, media) = player();
        p.initialize(Some("#episode-9"));
        assert_eq!(p.current_episode().unwrap().number, 9);
        assert_eq!(p.location_hash(), Some("#episode-9"));
        assert_eq!(media.0.borrow().play_requests, 0, "no autoplay on start");

        let (mut p, _) = player();
        p.initialize(Some("#episode-5"));
        assert_eq!(p.current_episode().unwrap().number, 23);
        assert_eq!(p.media_session().metadata.as_ref().unwrap().title, "OFFBEAT #23");
    }

    #[test]
    fn first_play_attaches_graph() {
        let (mut p, media) = player();
        p.initialize(None);
        assert_eq!(p.graph_state(), GraphState::Uninitialized);
        start_playing(&mut p);
        assert_eq!(p.graph_state(), GraphState::Active);
        assert_eq!(media.0.borrow().volume, 1.0);
        assert!(p.wants_animation_frame());
        assert_eq!(p.graph().connections_made(), 1);

        p.handle_media_event(MediaEvent::Pause);
        start_playing(&mut p);
        assert_eq!(p.graph().connections_made(), 1);
    }

    #[test]
    fn new_episode_resets_effects() {
        let (mut p, _) = player();
        p.initialize(None);
        start_playing(&mut p);
        p.toggle_filter();
        p.set_knob(Knob::Filter, 20);
        p.toggle_reverb();
        p.set_knob(Knob::Reverb, 80);
        assert!(p.effects().filter_enabled);

        p.handle_media_event(MediaEvent::Pause);
        p.select_episode(20);
        let fx = p.effects();
        assert!(!fx.filter_enabled);
        assert_eq!(fx.filter_position, 50);
        assert!(!fx.reverb_enabled);
        assert_eq!(fx.reverb_amount, 0);
        assert_eq!(p.controls().value(Knob::Reverb), 0);
        assert_eq!(
            p.graph().graph().unwrap().filter.filter_type(),
            FilterType::Allpass
        );
    }

    #[test]
    fn switching_while_paused_never_prompts() {
        let (mut p, media) = player();
        p.initialize(None);
        let decision = p.select_episode(20);
        assert_eq!(decision, SwitchDecision::Load { index: 3, autoplay: false });
        assert!(p.pending_switch().is_none());
        assert_eq!(p.current_episode().unwrap().number, 20);
        assert_eq!(media.0.borrow().play_requests, 0);
    }

    #[test]
    fn switching_while_playing_prompts_and_cancel_keeps_state() {
        let (mut p, media) = player();
        p.initialize(None);
        start_playing(&mut p);
        p.handle_media_event(MediaEvent::TimeUpdate { position: 125.0 });

        assert!(matches!(p.select_episode(20), SwitchDecision::Confirm(_)));
        p.cancel_switch();
        assert_eq!(p.current_episode().unwrap().number, 23);
        assert_eq!(p.session().position, 125.0);

        p.select_episode(20);
        let plays = media.0.borrow().play_requests;
        p.confirm_switch();
        assert_eq!(p.current_episode().unwrap().number, 20);
        assert_eq!(p.session().position, 0.0);
        assert_eq!(media.0.borrow().play_requests, plays + 1, "confirmed switch autoplays");
    }

    #[test]
    fn previous_and_next_by_list_position() {
        let (mut p, _) = player();
        p.initialize(Some("#episode-23"));
        assert_eq!(p.next_track(), SwitchDecision::Ignore);
        assert_eq!(p.current_episode().unwrap().number, 23);
        p.previous_track();
        assert_eq!(p.current_episode().unwrap().number, 22);

        p.initialize(Some("#episode-6"));
        p.previous_track();
        assert_eq!(p.current_episode().unwrap().number, 4, "skips the missing #5");
    }

    #[test]
    fn media_keys_go_through_the_gate() {
        let (mut p, _) = player();
        p.initialize(Some("#episode-22"));
        start_playing(&mut p);
        p.handle_media_action(MediaAction::NextTrack);
        assert_eq!(p.pending_switch().unwrap().number, 23);
        assert_eq!(p.current_episode().unwrap().number, 22);
    }

    #[test]
    fn end_of_track_collapses() {
        let (mut p, _) = player();
        p.initialize(None);
        start_playing(&mut p);
        p.handle_media_event(MediaEvent::TimeUpdate { position: 1800.0 });
        assert!(p.session().progress_percent() > 0.0);

        p.handle_media_event(MediaEvent::Ended);
        assert!(p.current_episode().is_none());
        assert_eq!(p.session().progress_percent(), 0.0);
        assert!(!p.session().is_playing);

        let mut surface = RecordingSurface::default();
        assert!(!p.animation_frame(&mut surface), "visualizer idles after the end");
    }

    #[test]
    fn hidden_page_suspends_and_resumes() {
        let (mut p, media) = player();
        p.initialize(None);
        start_playing(&mut p);
        p.set_visibility(false);
        assert_eq!(p.graph_state(), GraphState::Suspended);
        assert!(!p.wants_animation_frame());
        assert!((media.0.borrow().volume - 0.8).abs() < 1e-12);

        p.set_visibility(true);
        assert_eq!(p.graph_state(), GraphState::Active);
        assert_eq!(p.graph().connections_made(), 2);
        assert!(p.wants_animation_frame());
    }

    #[test]
    fn unsupported_graph_notifies_once() {
        let mut config = PlayerConfig::default();
        config.capabilities = Capabilities {
            audio_graph_supported: false,
            prefer_background_playback: false,
        };
        let (mut p, media) = player_with(config);
        p.initialize(None);
        start_playing(&mut p);
        p.handle_media_event(MediaEvent::Pause);
        start_playing(&mut p);
        assert_eq!(p.take_notices(), vec![Notice::EffectsUnavailable]);
        assert_eq!(
            p.graph_state(),
            GraphState::PassThrough(PassThroughReason::Unsupported)
        );
        assert_eq!(media.0.borrow().play_requests, 2, "playback goes on");
        assert!(!p.toggle_filter());
    }

    #[test]
    fn knobs_hold_still_without_effects() {
        let mut config = PlayerConfig::default();
        config.capabilities.audio_graph_supported = false;
        let (mut p, _) = player_with(config);
        p.initialize(None);
        start_playing(&mut p);

        assert_eq!(p.set_knob(Knob::Filter, 80), None);
        assert_eq!(p.handle_pointer(PointerEvent::Down { knob: Knob::Reverb, x: 0.0, y: 0.0 }), None);
        assert_eq!(p.handle_pointer(PointerEvent::Move { x: 0.0, y: -200.0 }), None);
        p.handle_pointer(PointerEvent::Up);
        assert!(p.handle_key("ArrowRight", false));

        assert_eq!(p.controls().value(Knob::Filter), p.effects().filter_position);
        assert_eq!(p.controls().value(Knob::Reverb), p.effects().reverb_amount);
        assert_eq!(p.controls().value(Knob::Filter), 50);
    }

    #[test]
    fn builds_from_json_documents() {
        let catalog = r#"[
            {"number": 2, "date": "01.02.2025", "url": "https://x.test/2.mp3"},
            {"number": 1, "date": "01.01.2025", "url": "https://x.test/1.mp3"}
        ]"#;
        let mut p = Player::from_json(
            r#"{ "default_episode": 1 }"#,
            catalog,
            Box::new(FakeMedia::default()),
            Box::new(MemoryStore::default()),
        )
        .unwrap();
        p.initialize(None);
        assert_eq!(p.current_episode().unwrap().number, 1);

        let media = || Box::new(FakeMedia::default());
        let store = || Box::new(MemoryStore::default());
        let bad_config = Player::from_json(r#"{ "default_volume": 101 }"#, catalog, media(), store());
        assert!(matches!(bad_config, Err(PlayerError::Config(_))));
        let bad_catalog = Player::from_json("{}", "[]", media(), store());
        assert!(matches!(bad_catalog, Err(PlayerError::Catalog(_))));
    }

    #[test]
    fn network_fault_stops_with_notice() {
        let (mut p, _) = player();
        p.initialize(None);
        start_playing(&mut p);
        p.handle_media_event(MediaEvent::Error(MediaFault::Network));
        assert!(!p.session().is_playing);
        assert_eq!(p.take_notices(), vec![Notice::NetworkError]);
        assert!(p.take_notices().is_empty());
    }

    #[test]
    fn keyboard_shortcuts() {
        let (mut p, media) = player();
        p.initialize(None);
        assert!(p.handle_key("ArrowUp", false));
        assert_eq!(p.session().volume_percent, 85);
        assert!((media.0.borrow().volume - 0.85).abs() < 1e-12);

        assert!(!p.handle_key("ArrowUp", true), "typing is not a shortcut");
        p.handle_key("ArrowLeft", false);
        assert_eq!(p.controls().value(Knob::Filter), 48);
        p.handle_key("KeyR", false);
        assert_eq!(p.controls().value(Knob::Filter), 50);
        p.handle_key("BracketRight", false);
        assert!((p.effects().reverb_lowcut_hz - 220.0).abs() < 1e-9);
        assert!(p.handle_key("KeyT", false));
        assert_eq!(p.theme(), Theme::Light);

        p.handle_key("Space", false);
        assert_eq!(media.0.borrow().play_requests, 1);
    }

    #[test]
    fn volume_is_persisted() {
        let media = FakeMedia::default();
        let mut store = MemoryStore::default();
        store.set(VOLUME_KEY, "40").unwrap();
        let mut p = Player::new(
            PlayerConfig::default(),
            offbeat_catalog(),
            Box::new(media.clone()),
            Box::new(store),
        );
        assert_eq!(p.session().volume_percent, 40);
        assert!((media.0.borrow().volume - 0.4).abs() < 1e-12);
        p.set_volume(70);
        assert_eq!(p.session().volume_percent, 70);
    }

    #[test]
    fn knob_drag_drives_graph() {
        let (mut p, _) = player();
        p.initialize(None);
        start_playing(&mut p);
        p.toggle_filter();
        p.handle_pointer(PointerEvent::Down { knob: Knob::Filter, x: 0.0, y: 0.0 });
        let change = p.handle_pointer(PointerEvent::Move { x: -200.0, y: 0.0 }).unwrap();
        assert_eq!(change.value, 20);
        assert_eq!(p.effects().filter_position, 20);
        assert_eq!(
            p.graph().graph().unwrap().filter.filter_type(),
            FilterType::Lowpass
        );
        p.handle_pointer(PointerEvent::Up);
        assert_eq!(p.handle_pointer(PointerEvent::Move { x: 0.0, y: 0.0 }), None);
    }

    #[test]
    fn media_session_position_follows_time() {
        let (mut p, _) = player();
        p.initialize(None);
        assert!(p.media_session().position.is_none());
        start_playing(&mut p);
        p.handle_media_event(MediaEvent::TimeUpdate { position: 60.0 });
        let pos = p.media_session().position.unwrap();
        assert_eq!((pos.duration, pos.position, pos.playback_rate), (3600.0, 60.0, 1.0));
        p.handle_media_action(MediaAction::SeekForward);
        assert_eq!(p.media_session().position.unwrap().position, 90.0);
    }

    #[test]
    fn audio_runs_through_graph_when_active() {
        let (mut p, _) = player();
        let mut l = vec![1.0f32; 64];
        let mut r = vec![1.0f32; 64];
        p.process_audio(&mut l, &mut r);
        assert!(l.iter().all(|&s| s == 1.0), "untouched before attach");

        p.initialize(None);
        start_playing(&mut p);
        p.set_volume(0);
        p.process_audio(&mut l, &mut r);
        assert!(l.iter().all(|&s| s == 0.0));

        p.shutdown();
        assert_eq!(p.graph_state(), GraphState::TornDown);
    }
}

//! Playback engine: the single media element, the session it drives, and
//! the events it republishes to subscribers.
//!
//! The element itself belongs to the host. Play and pause are requests;
//! the session only changes when the host reports what the element did.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::config::SourceRouting;
use crate::notice::Notice;

/// The host's media element.
pub trait MediaElement {
    /// Replace the source and start loading it. Playback position resets.
    fn set_source(&mut self, url: &str);
    fn request_play(&mut self);
    fn request_pause(&mut self);
    fn set_current_time(&mut self, seconds: f64);
    /// Element-level volume, linear in `[0, 1]`.
    fn set_volume(&mut self, volume: f64);
    fn playback_rate(&self) -> f64 {
        1.0
    }
}

/// Why the element gave up on a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaFault {
    Aborted,
    Network,
    Decode,
    SourceNotSupported,
}

impl MediaFault {
    /// Map an HTML `MediaError.code`.
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => MediaFault::Aborted,
            2 => MediaFault::Network,
            3 => MediaFault::Decode,
            _ => MediaFault::SourceNotSupported,
        }
    }

    pub fn notice(self) -> Option<Notice> {
        match self {
            MediaFault::Aborted => None,
            MediaFault::Network => Some(Notice::NetworkError),
            MediaFault::Decode => Some(Notice::DecodeError),
            MediaFault::SourceNotSupported => Some(Notice::UnsupportedFormat),
        }
    }
}

/// What the host observed on the element.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MediaEvent {
    Play,
    Pause,
    TimeUpdate { position: f64 },
    LoadedMetadata { duration: f64 },
    Ended,
    Error(MediaFault),
    /// A play request was refused (no user gesture yet).
    PlayRejected,
}

/// Events republished to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EngineEvent {
    TimeUpdate { position: f64, duration: Option<f64> },
    MetadataReady { duration: f64 },
    StateChanged { playing: bool },
    Ended,
    Fault(MediaFault),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u32);

type Listener = Box<dyn FnMut(&EngineEvent)>;

/// The state of the one active playback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSession {
    /// Catalog index of the loaded episode.
    pub current: Option<usize>,
    pub position: f64,
    pub duration: Option<f64>,
    pub is_playing: bool,
    pub volume_percent: u8,
}

impl PlaybackSession {
    fn new(volume_percent: u8) -> Self {
        PlaybackSession {
            current: None,
            position: 0.0,
            duration: None,
            is_playing: false,
            volume_percent: volume_percent.min(100),
        }
    }

    /// Progress in percent, 0 when nothing is loaded or the length is unknown.
    pub fn progress_percent(&self) -> f64 {
        match (self.current, self.duration) {
            (Some(_), Some(d)) if d > 0.0 => (self.position / d * 100.0).clamp(0.0, 100.0),
            _ => 0.0,
        }
    }
}

pub struct PlaybackEngine {
    media: Box<dyn MediaElement>,
    session: PlaybackSession,
    routing: SourceRouting,
    skip_seconds: f64,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u32,
}

impl PlaybackEngine {
    pub fn new(
        media: Box<dyn MediaElement>,
        routing: SourceRouting,
        skip_seconds: f64,
        volume_percent: u8,
    ) -> Self {
        PlaybackEngine {
            media,
            session: PlaybackSession::new(volume_percent),
            routing,
            skip_seconds,
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    pub fn media_mut(&mut self) -> &mut dyn MediaElement {
        self.media.as_mut()
    }

    pub fn media(&self) -> &dyn MediaElement {
        self.media.as_ref()
    }

    pub fn is_playing(&self) -> bool {
        self.session.is_playing
    }

    pub fn set_volume_percent(&mut self, percent: u8) {
        self.session.volume_percent = percent.min(100);
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&EngineEvent) + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(other, _)| *other != id);
        self.listeners.len() != before
    }

    fn emit(&mut self, event: EngineEvent) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(&event);
        }
    }

    /// Load catalog entry `index` from `url`. Does not start playback.
    pub fn load(&mut self, index: usize, url: &str) {
        let routed = self.routing.route(url);
        info!("Loading episode at index {index}: {routed}");
        self.media.set_source(&routed);
        self.session.current = Some(index);
        self.session.position = 0.0;
        self.session.duration = None;
        self.session.is_playing = false;
    }

    pub fn play(&mut self) {
        if self.session.current.is_some() {
            self.media.request_play();
        }
    }

    pub fn pause(&mut self) {
        self.media.request_pause();
    }

    pub fn toggle(&mut self) {
        if self.session.is_playing {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Seek to `target` seconds, clamped to the track. Ignored until the
    /// duration is known.
    pub fn seek(&mut self, target: f64) {
        let Some(duration) = self.session.duration else {
            debug!("Seek to {target} ignored, duration unknown");
            return;
        };
        if !target.is_finite() {
            return;
        }
        let position = target.clamp(0.0, duration);
        self.media.set_current_time(position);
        self.session.position = position;
    }

    pub fn skip_backward(&mut self) {
        self.seek(self.session.position - self.skip_seconds);
    }

    pub fn skip_forward(&mut self) {
        self.seek(self.session.position + self.skip_seconds);
    }

    /// Seek to a fraction of the track, for progress-bar clicks.
    pub fn seek_fraction(&mut self, fraction: f64) {
        if let Some(duration) = self.session.duration {
            self.seek(fraction.clamp(0.0, 1.0) * duration);
        }
    }

    /// Fold a host-observed media event into the session. Returns the
    /// notice to surface, if any.
    pub fn dispatch(&mut self, event: MediaEvent) -> Option<Notice> {
        match event {
            MediaEvent::Play => {
                self.session.is_playing = true;
                self.emit(EngineEvent::StateChanged { playing: true });
            }
            MediaEvent::Pause => {
                self.session.is_playing = false;
                self.emit(EngineEvent::StateChanged { playing: false });
            }
            MediaEvent::TimeUpdate { position } => {
                if self.session.current.is_some() && position.is_finite() {
                    self.session.position = position.max(0.0);
                    let duration = self.session.duration;
                    self.emit(EngineEvent::TimeUpdate {
                        position: self.session.position,
                        duration,
                    });
                }
            }
            MediaEvent::LoadedMetadata { duration } => {
                if duration.is_finite() && duration > 0.0 {
                    self.session.duration = Some(duration);
                    self.emit(EngineEvent::MetadataReady { duration });
                }
            }
            MediaEvent::Ended => {
                info!("Track ended");
                self.session.current = None;
                self.session.position = 0.0;
                self.session.duration = None;
                self.session.is_playing = false;
                self.emit(EngineEvent::Ended);
            }
            MediaEvent::Error(fault) => {
                warn!("Media error: {fault:?}");
                self.session.is_playing = false;
                self.media.request_pause();
                self.emit(EngineEvent::Fault(fault));
                return fault.notice();
            }
            MediaEvent::PlayRejected => {
                warn!("Play request rejected by the host");
                return Some(Notice::PlaybackBlocked);
            }
        }
        None
    }
}

/// `MM:SS`, or `00:00` for anything that is not a non-negative number.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "00:00".to_string();
    }
    let total = seconds.floor() as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}

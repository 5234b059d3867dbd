//! OS-level now-playing integration: metadata, position state, and the
//! transport actions the platform can send back.

use serde::{Deserialize, Serialize};

use crate::catalog::EpisodeRecord;
use crate::config::MediaSessionConfig;
use crate::engine::PlaybackSession;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artwork {
    pub src: String,
    /// `"<n>x<n>"`.
    pub sizes: String,
    #[serde(rename = "type")]
    pub mime_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NowPlaying {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub artwork: Vec<Artwork>,
}

impl NowPlaying {
    pub fn for_episode(episode: &EpisodeRecord, config: &MediaSessionConfig) -> Self {
        let mime_type = mime_for(&config.artwork_url).to_string();
        NowPlaying {
            title: episode.title(&config.show_name),
            artist: episode.subtitle(),
            album: config.album.clone(),
            artwork: config
                .artwork_sizes
                .iter()
                .map(|n| Artwork {
                    src: config.artwork_url.clone(),
                    sizes: format!("{n}x{n}"),
                    mime_type: mime_type.clone(),
                })
                .collect(),
        }
    }
}

fn mime_for(url: &str) -> &'static str {
    let lower = url.to_ascii_lowercase();
    if lower.ends_with(".png") {
        "image/png"
    } else if lower.ends_with(".webp") {
        "image/webp"
    } else {
        "image/jpeg"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionState {
    pub duration: f64,
    pub playback_rate: f64,
    pub position: f64,
}

/// Position state, only once the duration is known.
pub fn position_state(session: &PlaybackSession, playback_rate: f64) -> Option<PositionState> {
    let duration = session.duration?;
    session.current?;
    Some(PositionState {
        duration,
        playback_rate,
        position: session.position.clamp(0.0, duration),
    })
}

/// Transport actions the platform can send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaAction {
    Play,
    Pause,
    SeekBackward,
    SeekForward,
    PreviousTrack,
    NextTrack,
}

impl MediaAction {
    /// Parse a `MediaSessionAction` name.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "play" => MediaAction::Play,
            "pause" => MediaAction::Pause,
            "seekbackward" => MediaAction::SeekBackward,
            "seekforward" => MediaAction::SeekForward,
            "previoustrack" => MediaAction::PreviousTrack,
            "nexttrack" => MediaAction::NextTrack,
            _ => return None,
        })
    }
}

/// What the host should currently publish.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaSessionState {
    pub metadata: Option<NowPlaying>,
    pub position: Option<PositionState>,
    pub playing: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::offbeat_catalog;

    #[test]
    fn metadata_for_guest_and_solo_episodes() {
        let catalog = offbeat_catalog();
        let config = MediaSessionConfig::default();

        let guest = NowPlaying::for_episode(catalog.find(9).unwrap(), &config);
        assert_eq!(guest.title, "OFFBEAT #9");
        assert_eq!(guest.artist, "feat. screamsoda");
        assert_eq!(guest.album, "Offbeat Archive");

        let solo = NowPlaying::for_episode(catalog.find(23).unwrap(), &config);
        assert_eq!(solo.artist, "22.10.2025");
        assert_eq!(solo.artwork.len(), 6);
        assert_eq!(solo.artwork[0].sizes, "96x96");
        assert_eq!(solo.artwork[5].sizes, "512x512");
        assert_eq!(solo.artwork[0].mime_type, "image/jpeg");
    }

    #[test]
    fn position_needs_duration() {
        let mut session = PlaybackSession {
            current: Some(0),
            position: 12.0,
            duration: None,
            is_playing: true,
            volume_percent: 80,
        };
        assert_eq!(position_state(&session, 1.0), None);
        session.duration = Some(10.0);
        assert_eq!(
            position_state(&session, 1.0),
            Some(PositionState { duration: 10.0, playback_rate: 1.0, position: 10.0 })
        );
    }

    #[test]
    fn action_names() {
        assert_eq!(MediaAction::from_name("previoustrack"), Some(MediaAction::PreviousTrack));
        assert_eq!(MediaAction::from_name("seekto"), None);
    }
}

//! User-visible, non-fatal notices. The host decides how to show them.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notice {
    /// The effects graph could not be built; playback continues without it.
    EffectsUnavailable,
    NetworkError,
    DecodeError,
    UnsupportedFormat,
    /// A play request was refused because it did not follow a user gesture.
    PlaybackBlocked,
}

impl Notice {
    pub fn message(self) -> &'static str {
        match self {
            Notice::EffectsUnavailable => {
                "Audio effects are not available in this browser. Playback will continue without them."
            }
            Notice::NetworkError => "Network error loading audio. Please check your connection.",
            Notice::DecodeError => "The audio file could not be decoded.",
            Notice::UnsupportedFormat => "This audio format is not supported by your browser.",
            Notice::PlaybackBlocked => "Please click again to start playback.",
        }
    }
}

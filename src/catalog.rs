//! Episode catalog: the static, ordered list of archive episodes.
//!
//! List order is newest-first and defines navigation: "previous" moves to
//! the next (older) list entry and "next" moves to the preceding (newer)
//! one. Episode numbers are unique but not contiguous.

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

/// One archived episode. Immutable once the catalog is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeRecord {
    pub number: u32,
    /// Display date, e.g. `22.10.2025`.
    pub date: String,
    /// Absolute source URL of the episode audio.
    pub url: String,
    #[serde(default)]
    pub guest: Option<String>,
}

impl EpisodeRecord {
    pub fn new(number: u32, date: &str, url: &str, guest: Option<&str>) -> Self {
        EpisodeRecord {
            number,
            date: date.to_string(),
            url: url.to_string(),
            guest: guest.map(str::to_string),
        }
    }

    /// `OFFBEAT #23` style title.
    pub fn title(&self, show_name: &str) -> String {
        format!("{show_name} #{}", self.number)
    }

    /// Secondary line: `feat. <guest>` when there is a guest, else the date.
    pub fn subtitle(&self) -> String {
        match &self.guest {
            Some(guest) => format!("feat. {guest}"),
            None => self.date.clone(),
        }
    }
}

/// Ordered, validated list of episodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Catalog {
    episodes: Vec<EpisodeRecord>,
}

impl Catalog {
    /// Build a catalog, rejecting empty lists, zero or duplicate numbers,
    /// and URLs that are not absolute.
    pub fn new(episodes: Vec<EpisodeRecord>) -> Result<Self, CatalogError> {
        if episodes.is_empty() {
            return Err(CatalogError::Empty);
        }
        let mut seen = std::collections::HashSet::new();
        for (index, ep) in episodes.iter().enumerate() {
            if ep.number == 0 {
                return Err(CatalogError::InvalidNumber { index });
            }
            if !seen.insert(ep.number) {
                return Err(CatalogError::DuplicateNumber { number: ep.number });
            }
            if url::Url::parse(&ep.url).is_err() {
                return Err(CatalogError::InvalidUrl {
                    number: ep.number,
                    url: ep.url.clone(),
                });
            }
        }
        Ok(Catalog { episodes })
    }

    /// Parse a JSON array of episode records.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let episodes: Vec<EpisodeRecord> = serde_json::from_str(json)?;
        Self::new(episodes)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.episodes).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn episodes(&self) -> &[EpisodeRecord] {
        &self.episodes
    }

    pub fn len(&self) -> usize {
        self.episodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.episodes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&EpisodeRecord> {
        self.episodes.get(index)
    }

    /// List position of the episode with this number.
    pub fn index_of(&self, number: u32) -> Option<usize> {
        self.episodes.iter().position(|ep| ep.number == number)
    }

    pub fn find(&self, number: u32) -> Option<&EpisodeRecord> {
        self.episodes.iter().find(|ep| ep.number == number)
    }

    /// The next list entry (older episode), `None` at the end of the list.
    pub fn previous_of(&self, index: usize) -> Option<usize> {
        let candidate = index.checked_add(1)?;
        (candidate < self.episodes.len()).then_some(candidate)
    }

    /// The preceding list entry (newer episode), `None` at the head.
    pub fn next_of(&self, index: usize) -> Option<usize> {
        index.checked_sub(1).filter(|&i| i < self.episodes.len())
    }

    /// Episode loaded on a fresh visit with no deep link: the preferred
    /// number if present, else the head of the list.
    pub fn default_index(&self, preferred: Option<u32>) -> usize {
        preferred.and_then(|n| self.index_of(n)).unwrap_or(0)
    }
}

/// Parse a `#episode-<n>` location hash. Anything else yields `None`.
pub fn parse_episode_hash(hash: &str) -> Option<u32> {
    let rest = hash.strip_prefix('#').unwrap_or(hash);
    let digits = rest.strip_prefix("episode-")?;
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    digits[..end].parse().ok().filter(|&n| n > 0)
}

/// Format the deep-link hash for an episode number.
pub fn episode_hash(number: u32) -> String {
    format!("#episode-{number}")
}

const VAULT: &str = "https://vault.petsq.net";

/// The built-in OFFBEAT archive, newest first. Episode 5 was never
/// published.
pub fn offbeat_catalog() -> Catalog {
    let raw: [(u32, &str, &str, Option<&str>); 22] = [
        (23, "22.10.2025", "20251022_OFFBEAT_23.mp3", None),
        (22, "08.10.2025", "20251008_OFFBEAT_22.mp3", None),
        (21, "24.09.2025", "20250924_OFFBEAT_21.mp3", None),
        (20, "10.09.2025", "20250910_OFFBEAT_20.mp3", None),
        (19, "30.07.2025", "20250730_OFFBEAT_19.mp3", None),
        (18, "16.07.2025", "20250716_OFFBEAT_18.mp3", None),
        (17, "02.07.2025", "20250702_OFFBEAT_17.mp3", None),
        (16, "18.06.2025", "20250618_OFFBEAT_16.mp3", None),
        (15, "04.06.2025", "20250604_OFFBEAT_15.mp3", None),
        (14, "21.05.2025", "20250521_OFFBEAT_14.mp3", None),
        (13, "23.04.2025", "20250423_OFFBEAT_13.mp3", None),
        (12, "09.04.2025", "20250409_OFFBEAT_12.mp3", None),
        (11, "26.03.2025", "20250326_OFFBEAT_11.mp3", None),
        (10, "12.03.2025", "20250312_OFFBEAT_10.mp3", None),
        (9, "26.02.2025", "20250226_OFFBEAT_9_feat_screamsoda.mp3", Some("screamsoda")),
        (8, "12.02.2025", "20250212_OFFBEAT_8.mp3", None),
        (7, "29.01.2025", "20250129_OFFBEAT_7_feat_klankarbeit.mp3", Some("klankarbeit")),
        (6, "15.01.2025", "20250115_OFFBEAT_6.mp3", None),
        (4, "27.11.2024", "20241127_OFFBEAT_4.mp3", None),
        (3, "23.10.2024", "20241023_OFFBEAT_3.mp3", None),
        (2, "09.10.2024", "20241009_OFFBEAT_2.mp3", None),
        (1, "25.09.2024", "20240925_OFFBEAT_1.mp3", None),
    ];
    let episodes = raw
        .iter()
        .map(|&(number, date, file, guest)| {
            EpisodeRecord::new(number, date, &format!("{VAULT}/{file}"), guest)
        })
        .collect();
    Catalog { episodes }
}

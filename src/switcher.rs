//! Track switching: selection, the confirmation gate while playing, hash
//! deep links, and previous/next by list position.

use log::debug;

use crate::catalog::{parse_episode_hash, Catalog};

/// A switch waiting on the user's answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSwitch {
    pub index: usize,
    pub number: u32,
    pub message: String,
}

/// What the caller should do with a selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchDecision {
    Load { index: usize, autoplay: bool },
    Confirm(PendingSwitch),
    Ignore,
}

#[derive(Debug, Clone)]
pub struct TrackSwitchController {
    show_name: String,
    pending: Option<PendingSwitch>,
}

impl TrackSwitchController {
    pub fn new(show_name: impl Into<String>) -> Self {
        TrackSwitchController {
            show_name: show_name.into(),
            pending: None,
        }
    }

    pub fn pending(&self) -> Option<&PendingSwitch> {
        self.pending.as_ref()
    }

    /// The user picked episode `number`.
    pub fn select(
        &mut self,
        catalog: &Catalog,
        number: u32,
        current: Option<usize>,
        is_playing: bool,
    ) -> SwitchDecision {
        let Some(index) = catalog.index_of(number) else {
            debug!("Ignoring selection of unknown episode #{number}");
            return SwitchDecision::Ignore;
        };
        self.select_index(index, number, current, is_playing)
    }

    fn select_index(
        &mut self,
        index: usize,
        number: u32,
        current: Option<usize>,
        is_playing: bool,
    ) -> SwitchDecision {
        if current == Some(index) {
            return SwitchDecision::Ignore;
        }
        if !is_playing {
            self.pending = None;
            return SwitchDecision::Load {
                index,
                autoplay: false,
            };
        }
        let pending = PendingSwitch {
            index,
            number,
            message: format!("Switch to {} #{number}?", self.show_name),
        };
        self.pending = Some(pending.clone());
        SwitchDecision::Confirm(pending)
    }

    /// The user accepted the pending switch.
    pub fn confirm(&mut self) -> Option<SwitchDecision> {
        self.pending.take().map(|p| SwitchDecision::Load {
            index: p.index,
            autoplay: true,
        })
    }

    /// The user declined; nothing else changes.
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    /// One step older in the list (index + 1).
    pub fn previous(
        &mut self,
        catalog: &Catalog,
        current: Option<usize>,
        is_playing: bool,
    ) -> SwitchDecision {
        let Some(index) = current.and_then(|i| catalog.previous_of(i)) else {
            return SwitchDecision::Ignore;
        };
        self.step_to(catalog, index, current, is_playing)
    }

    /// One step newer in the list (index - 1).
    pub fn next(
        &mut self,
        catalog: &Catalog,
        current: Option<usize>,
        is_playing: bool,
    ) -> SwitchDecision {
        let Some(index) = current.and_then(|i| catalog.next_of(i)) else {
            return SwitchDecision::Ignore;
        };
        self.step_to(catalog, index, current, is_playing)
    }

    fn step_to(
        &mut self,
        catalog: &Catalog,
        index: usize,
        current: Option<usize>,
        is_playing: bool,
    ) -> SwitchDecision {
        match catalog.get(index) {
            Some(ep) => self.select_index(index, ep.number, current, is_playing),
            None => SwitchDecision::Ignore,
        }
    }

    /// The location hash changed. Loads without autoplay and without the
    /// gate; unknown or unchanged targets are ignored.
    pub fn hash_changed(
        &mut self,
        catalog: &Catalog,
        hash: &str,
        current: Option<usize>,
    ) -> SwitchDecision {
        let Some(index) = parse_episode_hash(hash).and_then(|n| catalog.index_of(n)) else {
            return SwitchDecision::Ignore;
        };
        if current == Some(index) {
            return SwitchDecision::Ignore;
        }
        self.pending = None;
        SwitchDecision::Load {
            index,
            autoplay: false,
        }
    }

    /// Episode to show on start: the hash target if valid, else the default.
    pub fn initial_index(
        &self,
        catalog: &Catalog,
        hash: Option<&str>,
        default_episode: Option<u32>,
    ) -> usize {
        hash.and_then(parse_episode_hash)
            .and_then(|n| catalog.index_of(n))
            .unwrap_or_else(|| catalog.default_index(default_episode))
    }
}

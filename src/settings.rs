//! Per-device settings: volume and theme.
//!
//! Values go through a small string key/value store so a browser host can
//! back it with `localStorage`. Effects are never stored.

use std::collections::BTreeMap;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::SettingsError;

pub const VOLUME_KEY: &str = "volume";
pub const THEME_KEY: &str = "theme";

pub trait SettingsStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), SettingsError>;
}

/// In-memory store, for tests and hosts without storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: BTreeMap<String, String>,
}

impl SettingsStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), SettingsError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "dark" => Some(Theme::Dark),
            "light" => Some(Theme::Light),
            _ => None,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub volume_percent: u8,
    pub theme: Theme,
}

impl Settings {
    /// Read stored values, falling back to defaults for anything missing or
    /// unparseable.
    pub fn load(store: &dyn SettingsStore, default_volume: u8) -> Self {
        let volume_percent = store
            .get(VOLUME_KEY)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .map(|v| v.round().clamp(0.0, 100.0) as u8)
            .unwrap_or(default_volume.min(100));
        let theme = store
            .get(THEME_KEY)
            .and_then(|t| Theme::parse(&t))
            .unwrap_or_default();
        Settings {
            volume_percent,
            theme,
        }
    }

    pub fn save(&self, store: &mut dyn SettingsStore) -> Result<(), SettingsError> {
        store.set(VOLUME_KEY, &self.volume_percent.to_string())?;
        store.set(THEME_KEY, self.theme.as_str())
    }
}

/// Store one value, logging instead of failing.
pub(crate) fn store_quietly(store: &mut dyn SettingsStore, key: &str, value: &str) {
    if let Err(e) = store.set(key, value) {
        warn!("Could not save setting '{key}': {e}");
    }
}

/// Settings in a JSON object file under the platform config directory.
#[cfg(feature = "settings-file")]
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: std::path::PathBuf,
    values: BTreeMap<String, String>,
}

#[cfg(feature = "settings-file")]
impl JsonFileStore {
    /// `<config dir>/settings.json` for this app.
    pub fn default_path() -> Result<std::path::PathBuf, SettingsError> {
        let dirs = directories::ProjectDirs::from("net", "petsq", "offbeat")
            .ok_or(SettingsError::NoConfigDir)?;
        Ok(dirs.config_dir().join("settings.json"))
    }

    pub fn open_default() -> Result<Self, SettingsError> {
        Self::open(Self::default_path()?)
    }

    /// Open (or start) a store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<std::path::PathBuf>) -> Result<Self, SettingsError> {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(JsonFileStore { path, values })
    }

    fn flush(&self) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.values)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

#[cfg(feature = "settings-file")]
impl SettingsStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), SettingsError> {
        self.values.insert(key.to_string(), value.to_string());
        self.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_empty() {
        let store = MemoryStore::default();
        let s = Settings::load(&store, 80);
        assert_eq!(s, Settings { volume_percent: 80, theme: Theme::Dark });
    }

    #[test]
    fn round_trip_through_store() {
        let mut store = MemoryStore::default();
        Settings { volume_percent: 35, theme: Theme::Light }
            .save(&mut store)
            .unwrap();
        assert_eq!(store.get("volume").as_deref(), Some("35"));
        assert_eq!(store.get("theme").as_deref(), Some("light"));
        assert_eq!(
            Settings::load(&store, 80),
            Settings { volume_percent: 35, theme: Theme::Light }
        );
    }

    #[test]
    fn junk_values_fall_back() {
        let mut store = MemoryStore::default();
        store.set("volume", "loud").unwrap();
        store.set("theme", "neon").unwrap();
        assert_eq!(Settings::load(&store, 60), Settings { volume_percent: 60, theme: Theme::Dark });

        store.set("volume", "250").unwrap();
        assert_eq!(Settings::load(&store, 60).volume_percent, 100);
    }

    #[test]
    fn theme_toggles() {
        assert_eq!(Theme::Dark.toggled(), Theme::Light);
        assert_eq!(Theme::Light.toggled().as_str(), "dark");
    }

    #[cfg(feature = "settings-file")]
    #[test]
    fn file_store_persists() {
        let dir = std::env::temp_dir().join(format!("offbeat-settings-{}", std::process::id()));
        let path = dir.join("settings.json");
        {
            let mut store = JsonFileStore::open(&path).unwrap();
            store.set("volume", "42").unwrap();
        }
        let store = JsonFileStore::open(&path).unwrap();
        assert_eq!(store.get("volume").as_deref(), Some("42"));
        let _ = std::fs::remove_dir_all(&dir);
    }
}

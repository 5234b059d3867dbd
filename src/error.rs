use std::fmt;

/// Failure to assemble a player from its JSON inputs or settings file.
#[derive(Debug)]
pub enum PlayerError {
    Catalog(CatalogError),
    Settings(SettingsError),
    Config(ConfigError),
}

/// Failure to build the effects graph. Never fatal: the manager falls back
/// to pass-through playback.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphError {
    Unsupported { reason: String },
    InvalidSampleRate(f64),
}

#[derive(Debug)]
pub enum CatalogError {
    Json(serde_json::Error),
    Empty,
    InvalidNumber { index: usize },
    DuplicateNumber { number: u32 },
    InvalidUrl { number: u32, url: String },
}

#[derive(Debug)]
pub enum SettingsError {
    Io(std::io::Error),
    Json(serde_json::Error),
    NoConfigDir,
}

#[derive(Debug)]
pub enum ConfigError {
    Json(serde_json::Error),
    OutOfRange { field: &'static str, value: f64 },
}

impl fmt::Display for PlayerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerError::Catalog(e) => write!(f, "Catalog error: {e}"),
            PlayerError::Settings(e) => write!(f, "Settings error: {e}"),
            PlayerError::Config(e) => write!(f, "Config error: {e}"),
        }
    }
}

impl std::error::Error for PlayerError {}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphError::Unsupported { reason } => write!(f, "audio graph unsupported: {reason}"),
            GraphError::InvalidSampleRate(sr) => write!(f, "invalid sample rate {sr}"),
        }
    }
}

impl std::error::Error for GraphError {}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::Json(e) => write!(f, "malformed catalog JSON: {e}"),
            CatalogError::Empty => write!(f, "catalog has no episodes"),
            CatalogError::InvalidNumber { index } => {
                write!(f, "episode at index {index} has number 0")
            }
            CatalogError::DuplicateNumber { number } => {
                write!(f, "episode number {number} appears more than once")
            }
            CatalogError::InvalidUrl { number, url } => {
                write!(f, "episode {number} has a non-absolute URL '{url}'")
            }
        }
    }
}

impl std::error::Error for CatalogError {}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::Io(e) => write!(f, "settings I/O failed: {e}"),
            SettingsError::Json(e) => write!(f, "settings file is not valid JSON: {e}"),
            SettingsError::NoConfigDir => write!(f, "no config directory for this platform"),
        }
    }
}

impl std::error::Error for SettingsError {}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Json(e) => write!(f, "malformed config JSON: {e}"),
            ConfigError::OutOfRange { field, value } => {
                write!(f, "config field '{field}' out of range: {value}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<CatalogError> for PlayerError {
    fn from(e: CatalogError) -> Self {
        PlayerError::Catalog(e)
    }
}

impl From<SettingsError> for PlayerError {
    fn from(e: SettingsError) -> Self {
        PlayerError::Settings(e)
    }
}

impl From<ConfigError> for PlayerError {
    fn from(e: ConfigError) -> Self {
        PlayerError::Config(e)
    }
}

impl From<std::io::Error> for SettingsError {
    fn from(e: std::io::Error) -> Self {
        SettingsError::Io(e)
    }
}

impl From<serde_json::Error> for SettingsError {
    fn from(e: serde_json::Error) -> Self {
        SettingsError::Json(e)
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(e: serde_json::Error) -> Self {
        CatalogError::Json(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Json(e)
    }
}

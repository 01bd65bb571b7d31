use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Language;

/// Endpoint of the public checking service.
pub const DEFAULT_ENDPOINT: &str = "http://35.197.120.214:5000/api/v1/spell";

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unsupported config format: {0}")]
    UnsupportedFormat(PathBuf),
}

/// Engine configuration. Every field has a default, so a config file only
/// needs to name what it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// URL the check request is POSTed to.
    pub endpoint: String,
    /// Quiet time after the last keystroke before a check is issued.
    pub debounce_ms: u64,
    /// Delay between computing a pass and applying it to the surface.
    pub settle_ms: u64,
    /// Text no longer than this many chars is never checked.
    pub min_text_chars: usize,
    /// Languages to mount. The first is the default.
    pub languages: Vec<Language>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_owned(),
            debounce_ms: 2000,
            settle_ms: 500,
            min_text_chars: 1,
            languages: vec![Language::english()],
        }
    }
}

impl EngineConfig {
    /// Load from a `.json` file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => {
                let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_json(&raw)
            }
            _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    /// The configured language with this key, if any.
    pub fn language(&self, key: &str) -> Option<&Language> {
        self.languages.iter().find(|l| l.key == key)
    }

    /// The first configured language, falling back to English.
    pub fn default_language(&self) -> Language {
        self.languages
            .first()
            .cloned()
            .unwrap_or_else(Language::english)
    }
}

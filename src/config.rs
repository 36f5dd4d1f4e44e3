//! Configuration management

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use tracing::warn;

use crate::error::{Error, Result};
use crate::playback::EngineConfig;

const APP_DIR: &str = "live_news_player";

/// Which channel list the shell opens on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContentPreference {
    #[default]
    National,
    Regional,
}

impl ContentPreference {
    pub const KEY: &'static str = "content_preference";

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentPreference::National => "national",
            ContentPreference::Regional => "regional",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "national" => Some(ContentPreference::National),
            "regional" => Some(ContentPreference::Regional),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URL of the managed backend, e.g. https://project.example.co
    #[serde(default)]
    pub backend_url: String,
    #[serde(default)]
    pub backend_key: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
    /// Command used for the native playback path; empty disables it
    #[serde(default)]
    pub external_player: String,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default = "default_true")]
    pub dark_mode: bool,
    #[serde(default = "default_font_size")]
    pub font_size: u32,
}

fn default_user_agent() -> String { "LiveNewsPlayer/0.1".to_string() }
fn default_timeout() -> u64 { 15 }
fn default_font_size() -> u32 { 14 }
fn default_true() -> bool { true }

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_url: String::new(),
            backend_key: String::new(),
            user_agent: default_user_agent(),
            request_timeout_secs: default_timeout(),
            external_player: String::new(),
            engine: EngineConfig::default(),
            dark_mode: true,
            font_size: default_font_size(),
        }
    }
}

pub fn config_dir() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(APP_DIR);
    fs::create_dir_all(&path).ok();
    path
}

impl AppConfig {
    fn config_path() -> PathBuf {
        config_dir().join("config.json")
    }

    /// Local channel list used when no backend is configured
    pub fn local_catalog_path() -> PathBuf {
        config_dir().join("channels.json")
    }

    pub fn has_backend(&self) -> bool {
        !self.backend_url.trim().is_empty()
    }

    pub fn load() -> Self {
        let path = Self::config_path();

        if path.exists() {
            match fs::read_to_string(&path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => warn!("Ignoring unreadable config {}: {}", path.display(), e),
                },
                Err(e) => warn!("Cannot read config {}: {}", path.display(), e),
            }
        }

        Self::default()
    }

    pub fn save(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(Self::config_path(), content)?;
        Ok(())
    }
}

/// Key-value store the shell keeps user preferences in.
///
/// The playback core never touches it; only the shell reads and writes.
pub trait PreferenceStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Read the content preference, defaulting to national
pub fn load_content_preference(store: &dyn PreferenceStore) -> ContentPreference {
    store
        .get(ContentPreference::KEY)
        .and_then(|v| ContentPreference::parse(&v))
        .unwrap_or_default()
}

pub fn save_content_preference(store: &dyn PreferenceStore, pref: ContentPreference) -> Result<()> {
    store.set(ContentPreference::KEY, pref.as_str())
}

/// File-backed preference store (`preferences.json`)
pub struct JsonPreferenceStore {
    path: PathBuf,
    values: RefCell<HashMap<String, String>>,
}

impl JsonPreferenceStore {
    pub fn open_default() -> Self {
        Self::open(config_dir().join("preferences.json"))
    }

    pub fn open(path: PathBuf) -> Self {
        let values = fs::read_to_string(&path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default();
        Self {
            path,
            values: RefCell::new(values),
        }
    }
}

impl PreferenceStore for JsonPreferenceStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let content = {
            let mut values = self.values.borrow_mut();
            values.insert(key.to_string(), value.to_string());
            serde_json::to_string_pretty(&*values)?
        };
        fs::write(&self.path, content)
            .map_err(|e| Error::config(format!("cannot write {}: {}", self.path.display(), e)))
    }
}

/// In-memory preference store
#[cfg(test)]
#[derive(Default)]
pub struct MemoryPreferenceStore {
    values: RefCell<HashMap<String, String>>,
}

#[cfg(test)]
impl PreferenceStore for MemoryPreferenceStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

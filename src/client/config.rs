use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::models::User;

pub const DEFAULT_API_URL: &str = "https://database.kzii.site";

const SETTINGS_FILE: &str = "settings.json";
const SESSION_FILE: &str = "session.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSettings {
    api_url: Option<String>,
    api_key: Option<String>,
}

/// A username/password pair accepted without consulting the user store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Where the client talks to, loaded from `settings.json` in a directory
/// chosen by the caller.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    dir: PathBuf,
    settings: StoredSettings,
    /// Off unless the operator opts in; never persisted.
    pub break_glass: Option<Credentials>,
}

impl ClientConfig {
    /// Falls back to defaults when the file is missing or unreadable.
    pub fn load_or_default(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let settings = read_json::<StoredSettings>(&dir.join(SETTINGS_FILE)).unwrap_or_default();
        Self {
            dir,
            settings,
            break_glass: None,
        }
    }

    pub fn with_break_glass(mut self, credentials: Credentials) -> Self {
        self.break_glass = Some(credentials);
        self
    }

    pub fn api_url(&self) -> &str {
        self.settings
            .api_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .unwrap_or(DEFAULT_API_URL)
    }

    /// Stored for compatibility with existing settings files; requests do
    /// not send it.
    pub fn api_key(&self) -> Option<&str> {
        self.settings.api_key.as_deref()
    }

    pub fn save_api_config(&mut self, url: &str, key: &str) -> anyhow::Result<()> {
        let url = url.strip_suffix('/').unwrap_or(url);
        self.settings = StoredSettings {
            api_url: Some(url.to_string()),
            api_key: Some(key.to_string()),
        };
        write_json(&self.dir, &self.dir.join(SETTINGS_FILE), &self.settings)
    }

    pub fn reset_api_config(&mut self) -> anyhow::Result<()> {
        self.settings = StoredSettings::default();
        remove_if_present(&self.dir.join(SETTINGS_FILE))
    }
}

/// The logged-in user, persisted next to the settings. Holding a session
/// is the only check protected views make.
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self) -> PathBuf {
        self.dir.join(SESSION_FILE)
    }

    pub fn load(&self) -> Option<User> {
        read_json(&self.path())
    }

    pub fn save(&self, user: &User) -> anyhow::Result<()> {
        write_json(&self.dir, &self.path(), user)
    }

    pub fn clear(&self) -> anyhow::Result<()> {
        remove_if_present(&self.path())
    }

    pub fn is_logged_in(&self) -> bool {
        self.path().is_file()
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Option<T> {
    let text = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&text)
        .map_err(|e| warn!(path = %path.display(), error = %e, "ignoring unreadable client file"))
        .ok()
}

fn write_json<T: Serialize>(dir: &Path, path: &Path, value: &T) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create directory {}", dir.to_string_lossy()))?;
    let text = serde_json::to_string_pretty(value).context("failed to serialize client file")?;
    std::fs::write(path, text)
        .with_context(|| format!("failed to write {}", path.to_string_lossy()))
}

fn remove_if_present(path: &Path) -> anyhow::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("failed to remove {}", path.to_string_lossy())),
    }
}

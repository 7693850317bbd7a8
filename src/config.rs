use std::path::{Path, PathBuf};

use color_eyre::Result;
use color_eyre::eyre::WrapErr;
use serde::{Deserialize, Serialize};

const DEFAULT_MUSIC_APP: &str = "Music";

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// setlist.fm API key, used when neither the flag nor the env var is set
    #[serde(default)]
    api_key: Option<String>,
    /// Where exported playlists land when no explicit output path is given
    #[serde(default)]
    export_directory: Option<String>,
    /// Application the AppleScript bridge talks to ("Music", or "iTunes" on older macOS)
    #[serde(default)]
    music_app: Option<String>,
}

impl Config {
    /// Load config from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&contents)
            .wrap_err_with(|| format!("Failed to parse config file: {}", path.display()))
    }

    fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|path| path.join("setlist-sync").join("config.toml"))
    }

    /// Load the default config file, falling back to defaults when it does not exist
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) if path.is_file() => Self::from_file(&path),
            Some(path) => {
                log::debug!("No config file at {}, using defaults", path.display());
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }

    /// Expand ~ to home directory
    fn expand_path(&self, path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/")
            && let Some(home) = dirs::home_dir()
        {
            return home.join(rest);
        }
        PathBuf::from(path)
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|key| !key.trim().is_empty())
    }

    pub fn export_directory(&self) -> Option<PathBuf> {
        self.export_directory
            .as_deref()
            .map(|directory| self.expand_path(directory))
    }

    pub fn music_app(&self) -> &str {
        self.music_app.as_deref().unwrap_or(DEFAULT_MUSIC_APP)
    }
}

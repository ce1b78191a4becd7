use std::{fs, io, path::PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::{advice::DEFAULT_MODEL, services::gemini::GEMINI_BASE_URL};

const DEFAULT_CONFIG: &str = r#"
# Model that receives every question.
model = "gemini-1.5-pro-latest"

# Prefix of the Gemini models endpoint.
base_url = "https://generativelanguage.googleapis.com/v1beta/models/"

# Colors and markdown rendering, only used when writing to a terminal.
color = true

# GEMINI_API_KEY and API_KEY take precedence over this value.
# api_key = ""
"#;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to locate the configuration directory.")]
    ConfigDir,
    #[error("Configuration file {0:?} does not exist.")]
    NotFound(PathBuf),
    #[error("Failed to read {path:?}: {source}.")]
    Read { path: PathBuf, source: io::Error },
    #[error("IO error: {0}.")]
    Io(#[from] io::Error),
    #[error("Invalid configuration in {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub model: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub color: bool,
}

impl Default for Config {
    #[inline]
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_owned(),
            base_url: GEMINI_BASE_URL.to_owned(),
            api_key: None,
            color: true,
        }
    }
}

#[non_exhaustive]
pub struct ConfigManager {
    pub config_path: PathBuf,
    explicit: bool,
}

impl ConfigManager {
    /// Points at `gardenguide/config.toml` in the platform config directory.
    #[inline]
    pub fn new() -> Result<Self, ConfigError> {
        let config_path = dirs::config_dir()
            .ok_or(ConfigError::ConfigDir)?
            .join("gardenguide")
            .join("config.toml");

        Ok(Self {
            config_path,
            explicit: false,
        })
    }

    /// Uses a file given by the user, which then has to exist.
    #[inline]
    #[must_use]
    pub const fn with_path(config_path: PathBuf) -> Self {
        Self {
            config_path,
            explicit: true,
        }
    }

    /// Writes the default file unless one is already there. Returns whether
    /// a file was written.
    #[inline]
    pub fn init_default_config(&self) -> Result<bool, ConfigError> {
        if self.config_path.exists() {
            return Ok(false);
        }

        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.config_path, DEFAULT_CONFIG.trim_start())?;

        Ok(true)
    }

    #[inline]
    pub fn load(&self) -> Result<Config, ConfigError> {
        if !self.config_path.exists() {
            if self.explicit {
                return Err(ConfigError::NotFound(self.config_path.clone()));
            }
            return Ok(Config::default());
        }

        let content = fs::read_to_string(&self.config_path).map_err(|source| {
            ConfigError::Read {
                path: self.config_path.clone(),
                source,
            }
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: self.config_path.clone(),
            source,
        })
    }
}

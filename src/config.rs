//! Configuration types for the SharePoint services facade.

use crate::error::{SpError, SpResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Fields requested by `get_current_user` when none are given.
pub const DEFAULT_USER_FIELDS: [&str; 4] = ["ID", "Name", "Title", "EMail"];

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpServicesConfig {
    /// Config version
    pub version: String,

    /// General settings
    pub settings: SettingsConfig,

    /// Recorded-response transport
    pub replay: ReplayConfig,
}

impl Default for SpServicesConfig {
    fn default() -> Self {
        Self {
            version: "1".to_string(),
            settings: SettingsConfig::default(),
            replay: ReplayConfig::default(),
        }
    }
}

impl SpServicesConfig {
    /// Load from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> SpResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SpResult<()> {
        if self.settings.default_user_fields.is_empty() {
            return Err(SpError::Config(
                "settings.default_user_fields must not be empty".to_string(),
            ));
        }
        if let Some(field) = self
            .settings
            .default_user_fields
            .iter()
            .find(|field| field.trim().is_empty())
        {
            return Err(SpError::Config(format!(
                "settings.default_user_fields contains a blank field name: {:?}",
                field
            )));
        }
        Ok(())
    }
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsConfig {
    /// Fields requested for the current user when the caller names none
    pub default_user_fields: Vec<String>,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            default_user_fields: DEFAULT_USER_FIELDS.iter().map(|f| f.to_string()).collect(),
        }
    }
}

/// Replay transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Fixture file with recorded responses (YAML)
    pub fixture: Option<PathBuf>,

    /// Complete asynchronous requests on a spawned task instead of inline
    pub async_completion: bool,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            fixture: None,
            async_completion: true,
        }
    }
}

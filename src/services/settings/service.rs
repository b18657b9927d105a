use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use directories::ProjectDirs;

use crate::models::settings::Settings;

pub const API_URL_ENV: &str = "DMS_API_URL";

/// Reads and writes the TOML settings file.
pub struct SettingsService {
    path: PathBuf,
}

impl SettingsService {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Settings file in the platform config directory.
    pub fn default_location() -> Self {
        if let Some(dirs) = ProjectDirs::from("com", "DmsMail", "DmsDashboard") {
            Self::new(dirs.config_dir().join("config.toml"))
        } else {
            log::warn!("Unable to resolve project directory; using current dir for settings");
            Self::new("dms-dashboard.toml")
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the persisted settings, or defaults when no file exists yet
    pub fn get(&self) -> Result<Settings> {
        if !self.path.exists() {
            return Ok(Settings::default());
        }

        let data = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read settings from {}", self.path.display()))?;
        let settings: Settings = toml::from_str(&data)
            .with_context(|| format!("failed to parse settings in {}", self.path.display()))?;

        settings
            .validate()
            .map_err(|e| anyhow!("Invalid settings in {}: {}", self.path.display(), e))?;

        Ok(settings)
    }

    /// Update settings
    pub fn update(&self, settings: &Settings) -> Result<()> {
        settings
            .validate()
            .map_err(|e| anyhow!("Invalid settings: {}", e))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create dir {}", parent.display()))?;
            }
        }

        let data = toml::to_string_pretty(settings).context("failed to serialize settings")?;
        fs::write(&self.path, data)
            .with_context(|| format!("failed to write settings to {}", self.path.display()))?;
        Ok(())
    }

    /// Records the last signed-in email in the file.
    ///
    /// Starts from what is stored, not from the effective settings, so
    /// environment overrides never end up persisted. An unreadable file is
    /// left alone.
    pub fn remember_last_email(&self, email: &str) -> Result<()> {
        let mut stored = self.get()?;
        if stored.last_email.as_deref() == Some(email) {
            return Ok(());
        }
        stored.last_email = Some(email.to_string());
        self.update(&stored)
    }

    /// Settings as the running app should see them: file values plus environment overrides.
    pub fn load_effective(&self) -> Settings {
        let mut settings = match self.get() {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Failed to load settings: {:#}, using defaults", e);
                Settings::default()
            }
        };

        if let Ok(value) = std::env::var(API_URL_ENV) {
            settings.apply_api_url_override(&value);
            log::info!("API URL overridden from {}: {}", API_URL_ENV, settings.api_url);
        }

        settings
    }
}

//! Configuration handling for the wizard

use crate::error::{Result, WizardError};
use crate::session::SessionOptions;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the check service base URL
pub const CHECK_URL_ENV: &str = "ONBOARDING_CHECK_URL";
/// Environment variable overriding the submission service base URL
pub const SUBMIT_URL_ENV: &str = "ONBOARDING_SUBMIT_URL";

const DEFAULT_DEBOUNCE_MS: u64 = 500;
const DEFAULT_HIGHLIGHT_MS: u64 = 1500;
const DEFAULT_SUGGESTION_LIMIT: usize = 6;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// User configuration for the wizard
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct WizardConfig {
    /// Trailing debounce window of uniqueness checks
    pub debounce_ms: Option<u64>,
    /// Lifetime of the incomplete-step highlight
    pub highlight_ms: Option<u64>,
    /// Maximum number of slug suggestions shown
    pub suggestion_limit: Option<usize>,
    /// Base URL of the uniqueness check service
    pub check_service_url: Option<String>,
    /// Base URL of the record submission service
    pub submit_service_url: Option<String>,
    /// HTTP transport timeout
    pub request_timeout_ms: Option<u64>,
}

impl WizardConfig {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("io", "onboarding", "onboarding-wizard")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Load configuration from file, then apply environment overrides
    pub fn load() -> Result<Self> {
        let config = match Self::config_path() {
            Some(path) => Self::load_from(&path)?,
            None => Self::default(),
        };
        Ok(config.with_env_overrides(|name| std::env::var(name).ok()))
    }

    /// Load configuration from an explicit path; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let config: WizardConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()
            .ok_or_else(|| WizardError::Config("no config directory on this platform".to_string()))?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Non-empty environment values replace the service URLs
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        if let Some(url) = set(CHECK_URL_ENV) {
            self.check_service_url = Some(url);
        }
        if let Some(url) = set(SUBMIT_URL_ENV) {
            self.submit_service_url = Some(url);
        }
        self
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms.unwrap_or(DEFAULT_DEBOUNCE_MS))
    }

    pub fn highlight_window(&self) -> Duration {
        Duration::from_millis(self.highlight_ms.unwrap_or(DEFAULT_HIGHLIGHT_MS))
    }

    pub fn suggestion_limit(&self) -> usize {
        self.suggestion_limit.unwrap_or(DEFAULT_SUGGESTION_LIMIT)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms.unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS))
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            debounce: self.debounce(),
            highlight_window: self.highlight_window(),
            suggestion_limit: self.suggestion_limit(),
        }
    }
}

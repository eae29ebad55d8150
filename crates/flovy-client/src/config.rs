//! Client configuration.
//!
//! All settings live in a single `config.toml` at
//! `~/.config/flovy/config.toml` by default.
//!
//! Credential values (`client_id`, `client_secret`, API keys) support
//! secret references:
//! - `pass::path/in/store` — resolved via `pass show`
//! - `env::VAR_NAME` — resolved from the environment
//! - plain text — used as-is

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::secret;

/// Configuration for the flovy client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// The local profile acting as the application user id. Per-user
    /// data files (accounts, selected calendars, notes) are namespaced
    /// by it.
    pub profile: ProfileSettings,

    /// Google Calendar settings.
    pub google: Option<GoogleSettings>,

    /// AI suggestion settings.
    #[serde(default)]
    pub ai: AiSettings,

    /// Waitlist CRM settings.
    pub brevo: Option<BrevoSettings>,

    /// Session timeout settings.
    #[serde(default)]
    pub session: SessionSettings,

    /// Debug mode.
    pub debug: bool,
}

/// Local profile settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileSettings {
    /// The application user id all per-user data is keyed by.
    pub user: String,
}

impl Default for ProfileSettings {
    fn default() -> Self {
        Self {
            user: "default".to_string(),
        }
    }
}

/// Google Calendar settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleSettings {
    /// OAuth client ID (supports secret references).
    pub client_id: Option<String>,

    /// OAuth client secret (supports secret references).
    pub client_secret: Option<String>,

    /// Override for the per-user data directory.
    pub data_dir: Option<PathBuf>,
}

/// AI suggestion settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AiSettings {
    /// OpenAI API key (supports secret references).
    pub openai_api_key: Option<String>,

    /// Gemini API key (supports secret references).
    pub gemini_api_key: Option<String>,

    /// Default model ("openai" or "gemini").
    pub model: Option<String>,
}

/// Waitlist CRM settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BrevoSettings {
    /// Brevo API key (supports secret references).
    pub api_key: Option<String>,

    /// Optional Brevo list id to attach contacts to.
    pub list_id: Option<i64>,
}

/// Session timeout settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Preset name (high-security, standard, development, no-timeout).
    pub preset: Option<String>,

    /// Timeout override in minutes (0 disables the timeout).
    pub timeout_minutes: Option<u64>,
}

impl ClientConfig {
    /// Loads configuration from the default path.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &PathBuf) -> Result<Self, String> {
        let content =
            std::fs::read_to_string(path).map_err(|e| format!("failed to read config: {}", e))?;
        toml::from_str(&content).map_err(|e| format!("failed to parse config: {}", e))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("flovy")
    }

    /// The application user id for per-user data.
    pub fn user_id(&self) -> flovy_core::UserId {
        flovy_core::UserId::new(self.profile.user.clone())
    }

    /// Resolves the Google client id, following secret references.
    pub fn google_client_id(&self) -> Result<Option<String>, String> {
        resolve_optional(self.google.as_ref().and_then(|g| g.client_id.as_deref()))
    }

    /// Resolves the Google client secret, following secret references.
    pub fn google_client_secret(&self) -> Result<Option<String>, String> {
        resolve_optional(self.google.as_ref().and_then(|g| g.client_secret.as_deref()))
    }

    /// Resolves the OpenAI API key, following secret references.
    pub fn openai_api_key(&self) -> Result<Option<String>, String> {
        resolve_optional(self.ai.openai_api_key.as_deref())
    }

    /// Resolves the Gemini API key, following secret references.
    pub fn gemini_api_key(&self) -> Result<Option<String>, String> {
        resolve_optional(self.ai.gemini_api_key.as_deref())
    }

    /// Resolves the Brevo API key, following secret references.
    pub fn brevo_api_key(&self) -> Result<Option<String>, String> {
        resolve_optional(self.brevo.as_ref().and_then(|b| b.api_key.as_deref()))
    }

    /// The effective session configuration: preset, then overrides.
    pub fn session_config(&self) -> Result<flovy_session::SessionConfig, String> {
        let preset = match self.session.preset.as_deref() {
            Some(name) => name.parse::<flovy_session::SessionPreset>()?,
            None => flovy_session::SessionPreset::Standard,
        };

        let mut config = preset.config();
        if let Some(minutes) = self.session.timeout_minutes {
            config.timeout_minutes = minutes;
        }
        Ok(config)
    }
}

fn resolve_optional(value: Option<&str>) -> Result<Option<String>, String> {
    match value {
        Some(v) => secret::resolve(v).map(Some),
        None => Ok(None),
    }
}

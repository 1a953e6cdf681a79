//! Configuration types for the assistant core.

use crate::session::Origin;
use orbit_apps::RegistryConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbitConfig {
    /// Wake phrase detection.
    pub wake: WakeConfig,
    /// Confirmation and disambiguation dialog settings.
    pub dialog: DialogConfig,
    /// Intent classification settings.
    pub intent: IntentConfig,
    /// Installed-application registry settings.
    pub apps: RegistryConfig,
    /// Spoken output settings.
    pub speech: SpeechOutputConfig,
    /// Log output settings.
    pub logging: LoggingConfig,
}

/// Wake phrase detection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WakeConfig {
    /// Phrases that trigger a session when a capture is exactly the phrase
    /// or starts with it.
    pub phrases: Vec<String>,
    /// Single word that triggers when it appears as a whole word.
    pub keyword: String,
    /// Known misrecognitions of the keyword.
    pub variants: Vec<String>,
    /// Maximum length of one captured phrase in milliseconds.
    pub phrase_time_limit_ms: u64,
    /// Sleep after a recognition service error before listening again.
    pub retry_backoff_ms: u64,
    /// Pause after a detection so the wake phrase tail is not re-captured.
    pub cooldown_ms: u64,
    /// Spoken acknowledgement when a voice session opens.
    pub acknowledgement: String,
}

impl Default for WakeConfig {
    fn default() -> Self {
        Self {
            phrases: vec![
                "orbit".to_owned(),
                "hey orbit".to_owned(),
                "ok orbit".to_owned(),
            ],
            keyword: "orbit".to_owned(),
            variants: vec!["or bit".to_owned(), "or but".to_owned(), "hobbit".to_owned()],
            phrase_time_limit_ms: 4_000,
            retry_backoff_ms: 1_000,
            cooldown_ms: 1_200,
            acknowledgement: "Yes?".to_owned(),
        }
    }
}

/// When a destructive, reversible action needs a spoken "yes" first.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationPolicy {
    /// Typed requests are confirmed; spoken requests run immediately.
    #[default]
    TextOnly,
    /// Spoken requests are confirmed; typed requests run immediately.
    VoiceOnly,
    /// Every destructive request is confirmed.
    Always,
    /// Nothing is confirmed.
    Never,
}

impl ConfirmationPolicy {
    /// Whether a destructive request arriving through `origin` must be confirmed.
    #[must_use]
    pub fn requires_confirmation(self, origin: Origin) -> bool {
        match self {
            Self::TextOnly => origin == Origin::Text,
            Self::VoiceOnly => origin == Origin::Voice,
            Self::Always => true,
            Self::Never => false,
        }
    }
}

/// Dialog configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogConfig {
    /// Confirmation policy for destructive actions.
    pub confirmation: ConfirmationPolicy,
    /// Maximum number of choices offered when a request is ambiguous.
    pub max_options: usize,
}

impl Default for DialogConfig {
    fn default() -> Self {
        Self {
            confirmation: ConfirmationPolicy::default(),
            max_options: 5,
        }
    }
}

/// Intent classification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntentConfig {
    /// Classifications below this confidence are treated as unknown.
    pub confidence_threshold: f32,
}

impl Default for IntentConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.6,
        }
    }
}

/// Spoken output configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechOutputConfig {
    /// Start muted.
    pub muted: bool,
}

/// Log output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Also write daily log files under the data directory.
    pub file_logging: bool,
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file_logging: true,
            level: "info".to_owned(),
        }
    }
}

impl OrbitConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails validation.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self =
            toml::from_str(&content).map_err(|e| crate::error::OrbitError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::OrbitError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check value ranges that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::OrbitError::Config`] or
    /// [`crate::error::OrbitError::Registry`] describing the first bad field.
    pub fn validate(&self) -> crate::error::Result<()> {
        if !(0.0..=1.0).contains(&self.intent.confidence_threshold) {
            return Err(crate::error::OrbitError::Config(
                "intent.confidence_threshold must be within [0, 1]".into(),
            ));
        }
        if self.dialog.max_options == 0 {
            return Err(crate::error::OrbitError::Config(
                "dialog.max_options must be greater than 0".into(),
            ));
        }
        if self.wake.phrases.is_empty() && self.wake.keyword.trim().is_empty() {
            return Err(crate::error::OrbitError::Config(
                "wake needs at least one phrase or a keyword".into(),
            ));
        }
        self.apps.validate()?;
        Ok(())
    }

    /// Returns the default config file path: `~/.config/orbit/config.toml`.
    pub fn default_config_path() -> PathBuf {
        if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
            PathBuf::from(config).join("orbit").join("config.toml")
        } else if let Some(home) = dirs::home_dir() {
            home.join(".config").join("orbit").join("config.toml")
        } else {
            PathBuf::from("/tmp/orbit-config/config.toml")
        }
    }

    /// Returns the data directory (`~/.orbit`), used for log files.
    pub fn data_dir() -> PathBuf {
        dirs::home_dir()
            .map(|home| home.join(".orbit"))
            .unwrap_or_else(|| PathBuf::from("/tmp").join(".orbit"))
    }
}

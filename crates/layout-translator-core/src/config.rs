use serde::{Deserialize, Serialize};

/// Language codes following ISO 639-1
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Lang(pub String);

impl Lang {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Catalog entry for this code, if supported.
    pub fn option(&self) -> Option<&'static LanguageOption> {
        language_by_code(&self.0)
    }
}

fn default_target_lang() -> Lang {
    Lang::new(DEFAULT_TARGET_LANG)
}

impl std::fmt::Display for Lang {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Lang {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Lang {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Connection settings for the Gemini streaming API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    /// Whole-request timeout; a translation stream can run for minutes
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl GeminiConfig {
    pub fn new(
        api_base: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            api_base: api_base.into(),
            // An empty variable in .env counts as unset
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: model.into(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

const fn default_timeout_secs() -> u64 {
    300
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            api_key: None,
            model: default_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Target language selected for new sessions
    #[serde(default = "default_target_lang")]
    pub target_lang: Lang,

    /// Generative AI backend configuration
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Zoom multiplier for the original-page preview (default: 1.5)
    #[serde(default = "default_render_scale")]
    pub render_scale: f32,

    /// Upload size shown as guidance in the UI, in megabytes
    #[serde(default = "default_upload_soft_limit_mb")]
    pub upload_soft_limit_mb: u64,
}

const fn default_render_scale() -> f32 {
    crate::pdf::DEFAULT_RENDER_SCALE
}

const fn default_upload_soft_limit_mb() -> u64 {
    10
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            target_lang: default_target_lang(),
            gemini: GeminiConfig::default(),
            render_scale: default_render_scale(),
            upload_soft_limit_mb: default_upload_soft_limit_mb(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, crate::error::Error> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            crate::error::Error::ConfigLoad(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| {
            crate::error::Error::ConfigLoad(format!("Failed to parse config: {e}"))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from default locations (~/.config/layout-translator/config.toml, ./config.toml)
    pub fn load() -> Self {
        // Try user config
        if let Some(config_dir) = crate::util::config_dir() {
            let user_config = config_dir.join("layout-translator").join("config.toml");
            if user_config.exists() {
                match Self::from_file(&user_config) {
                    Ok(config) => {
                        tracing::debug!("Loaded config from {}", user_config.display());
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // Try local config
        let local_config = std::path::PathBuf::from("config.toml");
        if local_config.exists() {
            match Self::from_file(&local_config) {
                Ok(config) => {
                    tracing::debug!("Loaded config from ./config.toml");
                    return config;
                }
                Err(e) => {
                    tracing::warn!("Failed to load ./config.toml: {}", e);
                }
            }
        }

        tracing::debug!("No config file found, using defaults");
        Self::default()
    }

    /// Reject values the rest of the crate cannot work with.
    pub fn validate(&self) -> Result<(), crate::error::Error> {
        if self.target_lang.option().is_none() {
            return Err(crate::error::Error::ConfigInvalid {
                field: "target_lang".to_string(),
                reason: format!("unsupported language '{}'", self.target_lang),
            });
        }
        if !(self.render_scale.is_finite() && self.render_scale > 0.0) {
            return Err(crate::error::Error::ConfigInvalid {
                field: "render_scale".to_string(),
                reason: "must be a positive number".to_string(),
            });
        }
        Ok(())
    }

    /// Soft upload limit in bytes.
    pub const fn upload_soft_limit_bytes(&self) -> u64 {
        self.upload_soft_limit_mb.saturating_mul(1024 * 1024)
    }

    /// Catalog entry for the configured target language (English if unknown).
    pub fn target_language(&self) -> &'static LanguageOption {
        self.target_lang.option().unwrap_or_else(default_language)
    }
}

/// A language option for UI dropdowns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LanguageOption {
    /// ISO language code (e.g., "en", "zh")
    pub code: &'static str,
    /// Display name, also used in the translation prompt
    pub name: &'static str,
    /// Flag emoji
    pub flag: &'static str,
}

/// Languages available as translation target. English first: it is the default.
pub static SUPPORTED_LANGUAGES: [LanguageOption; 12] = [
    LanguageOption { code: "en", name: "English", flag: "🇺🇸" },
    LanguageOption { code: "es", name: "Spanish", flag: "🇪🇸" },
    LanguageOption { code: "fr", name: "French", flag: "🇫🇷" },
    LanguageOption { code: "de", name: "German", flag: "🇩🇪" },
    LanguageOption { code: "it", name: "Italian", flag: "🇮🇹" },
    LanguageOption { code: "pt", name: "Portuguese", flag: "🇵🇹" },
    LanguageOption { code: "zh", name: "Chinese (Simplified)", flag: "🇨🇳" },
    LanguageOption { code: "ja", name: "Japanese", flag: "🇯🇵" },
    LanguageOption { code: "ko", name: "Korean", flag: "🇰🇷" },
    LanguageOption { code: "ru", name: "Russian", flag: "🇷🇺" },
    LanguageOption { code: "ar", name: "Arabic", flag: "🇸🇦" },
    LanguageOption { code: "hi", name: "Hindi", flag: "🇮🇳" },
];

/// Default target language code
pub const DEFAULT_TARGET_LANG: &str = "en";
/// Default Gemini API endpoint
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";
/// Default model identifier
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

pub fn supported_languages() -> &'static [LanguageOption] {
    &SUPPORTED_LANGUAGES
}

pub fn language_by_code(code: &str) -> Option<&'static LanguageOption> {
    SUPPORTED_LANGUAGES.iter().find(|l| l.code == code)
}

pub fn default_language() -> &'static LanguageOption {
    &SUPPORTED_LANGUAGES[0]
}

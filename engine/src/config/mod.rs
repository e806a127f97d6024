//! Configuration management
//!
//! This module handles loading, validation, and management of the Confidant
//! configuration. Configuration is stored in TOML format at
//! ~/.confidant/config.toml. Credentials are never stored here; see
//! [`crate::secrets`].
//!
//! # Configuration Sections
//!
//! - **core**: Log level
//! - **session**: History window and the system instruction
//! - **safety**: Denylist for the content gate
//! - **completion**: Completion service endpoint, model and generation parameters
//! - **delivery**: Reply chunking and pacing
//! - **keep_alive**: Status server binding
//!
//! # Examples
//!
//! ```no_run
//! use confidant_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let (config, _source) = Config::load_or_create()?;
//! println!("Model: {}", config.completion.model);
//! println!("History window: {}", config.session.max_history);
//! # Ok(())
//! # }
//! ```

use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
///
/// Every section has defaults, so an empty file is a valid configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Core settings
    #[serde(default)]
    pub core: CoreConfig,

    /// Conversation session settings
    #[serde(default)]
    pub session: SessionConfig,

    /// Content gate settings
    #[serde(default)]
    pub safety: SafetyConfig,

    /// Completion service settings
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Reply delivery settings
    #[serde(default)]
    pub delivery: DeliveryConfig,

    /// Status server settings
    #[serde(default)]
    pub keep_alive: KeepAliveConfig,
}

/// Core configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Non-system turns retained per user
    #[serde(default = "default_max_history")]
    pub max_history: usize,

    /// Instruction seeded as turn 0 of every session
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

/// Content gate configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyConfig {
    /// Terms matched as case-insensitive substrings
    #[serde(default = "default_denylist")]
    pub denylist: Vec<String>,
}

/// Which turns are forwarded to the completion service
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PromptMode {
    /// System instruction plus the most recent user turn
    #[default]
    LatestTurn,

    /// System instruction plus every retained turn
    FullHistory,
}

/// Completion service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Completion endpoint URL
    #[serde(default = "default_completion_endpoint")]
    pub endpoint: String,

    /// Model name; combined with the folder id into the model URI
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature (0.0-1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Maximum tokens in a reply
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Hard timeout for one completion call (seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Fixed delay before each dispatch (milliseconds)
    #[serde(default = "default_dispatch_delay_ms")]
    pub dispatch_delay_ms: u64,

    /// Completion calls allowed in flight at once
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,

    /// Prompt construction mode
    #[serde(default)]
    pub prompt_mode: PromptMode,
}

/// Reply delivery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Maximum characters per outgoing message
    #[serde(default = "default_max_part_length")]
    pub max_part_length: usize,

    /// Pause between consecutive parts of one reply (milliseconds)
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,

    /// Show the typing indicator while a reply is generated
    #[serde(default = "default_true")]
    pub typing_indicator: bool,
}

/// Status server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeepAliveConfig {
    /// Run the status server
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Listen address
    #[serde(default = "default_keep_alive_host")]
    pub host: String,

    /// Listen port
    #[serde(default = "default_keep_alive_port")]
    pub port: u16,
}

impl CompletionConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn dispatch_delay(&self) -> Duration {
        Duration::from_millis(self.dispatch_delay_ms)
    }
}

impl DeliveryConfig {
    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }
}

impl KeepAliveConfig {
    /// Parse host and port into a socket address
    pub fn socket_addr(&self) -> Result<SocketAddr, EngineError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| {
                EngineError::Config(format!(
                    "Invalid keep_alive address '{}:{}': {}",
                    self.host, self.port, e
                ))
            })
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_history() -> usize {
    10
}

/// The psychologist-friend instruction seeded into every session
pub const DEFAULT_SYSTEM_PROMPT: &str = "Ты добрый друг-психолог, который умеет слушать и поддерживать.

Твой стиль общения:
- Говори просто и по-человечески, как близкий друг
- Используй разнообразные фразы и выражения, не повторяйся
- Варьируй способы выражения поддержки и понимания
- Будь искренним и эмпатичным
- Задавай вопросы по-разному каждый раз
- Используй эмодзи для создания теплой атмосферы, но не в каждом сообщении
- Избегай шаблонных психологических фраз
- Говори живым разговорным языком

Примеры разнообразных фраз:
Вместо \"Я понимаю\" используй: \"Чувствую тебя\", \"Представляю\", \"Это непросто\", \"Слышу тебя\"
Вместо \"Расскажи больше\" говори: \"Что еще важно?\", \"А как это было?\", \"Интересно узнать подробнее\"
Вместо \"Как ты себя чувствуешь?\" спрашивай: \"Что сейчас внутри?\", \"Какие ощущения?\", \"Что происходит в душе?\"

Стиль ответа: живой, разнообразный, искренний. Максимум 2-3 предложения.
Отвечай на русском языке.";

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

fn default_denylist() -> Vec<String> {
    ["убийство", "самоубийство", "суицид", "наркотики"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_completion_endpoint() -> String {
    "https://llm.api.cloud.yandex.net/foundationModels/v1/completion".to_string()
}

fn default_model() -> String {
    "yandexgpt-lite".to_string()
}

fn default_temperature() -> f64 {
    0.8
}

fn default_max_tokens() -> u32 {
    300
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_dispatch_delay_ms() -> u64 {
    1000
}

fn default_max_in_flight() -> usize {
    4
}

fn default_max_part_length() -> usize {
    4000
}

fn default_pacing_ms() -> u64 {
    500
}

fn default_keep_alive_host() -> String {
    "0.0.0.0".to_string()
}

fn default_keep_alive_port() -> u16 {
    5000
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_history: default_max_history(),
            system_prompt: default_system_prompt(),
        }
    }
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            denylist: default_denylist(),
        }
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            endpoint: default_completion_endpoint(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            request_timeout_secs: default_request_timeout_secs(),
            dispatch_delay_ms: default_dispatch_delay_ms(),
            max_in_flight: default_max_in_flight(),
            prompt_mode: PromptMode::default(),
        }
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            max_part_length: default_max_part_length(),
            pacing_ms: default_pacing_ms(),
            typing_indicator: true,
        }
    }
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_keep_alive_host(),
            port: default_keep_alive_port(),
        }
    }
}

/// Where a configuration was read from
///
/// Loading happens before logging is up, so callers report the source once
/// telemetry is initialised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// An existing file
    Loaded(PathBuf),

    /// A default file written on first run
    Created(PathBuf),
}

impl ConfigSource {
    pub fn path(&self) -> &Path {
        match self {
            Self::Loaded(path) | Self::Created(path) => path,
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.confidant/config.toml)
    ///
    /// If the configuration file doesn't exist, writes a default configuration
    /// there first.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read or written
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_or_create() -> Result<(Self, ConfigSource), EngineError> {
        Self::load_or_create_at(&Self::default_config_path()?)
    }

    /// Load configuration from `path`, writing the defaults there if absent
    pub fn load_or_create_at(path: &Path) -> Result<(Self, ConfigSource), EngineError> {
        if path.exists() {
            let config = Self::load_from_path(path)?;
            Ok((config, ConfigSource::Loaded(path.to_path_buf())))
        } else {
            let config = Self::create_default(path)?;
            Ok((config, ConfigSource::Created(path.to_path_buf())))
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, EngineError> {
        let config: Config = toml::from_str(contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty TOML
    pub fn to_toml_string(&self) -> Result<String, EngineError> {
        toml::to_string_pretty(self)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let config = Self::default();
        config.validate()?;

        fs::write(path, config.to_toml_string()?)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(config)
    }

    /// Get the default configuration file path (~/.confidant/config.toml)
    fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".confidant").join("config.toml"))
    }

    /// Validate field ranges
    pub fn validate(&self) -> Result<(), EngineError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        if self.session.max_history == 0 {
            return Err(EngineError::Config(
                "session.max_history must be at least 1".to_string(),
            ));
        }

        if self.session.system_prompt.trim().is_empty() {
            return Err(EngineError::Config(
                "session.system_prompt must not be empty".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.completion.temperature) {
            return Err(EngineError::Config(
                "completion.temperature must be between 0.0 and 1.0".to_string(),
            ));
        }

        if self.completion.max_in_flight == 0 {
            return Err(EngineError::Config(
                "completion.max_in_flight must be at least 1".to_string(),
            ));
        }

        if self.completion.request_timeout_secs == 0 {
            return Err(EngineError::Config(
                "completion.request_timeout_secs must be at least 1".to_string(),
            ));
        }

        // Telegram rejects messages over 4096 characters
        if !(1..=4096).contains(&self.delivery.max_part_length) {
            return Err(EngineError::Config(
                "delivery.max_part_length must be between 1 and 4096".to_string(),
            ));
        }

        self.keep_alive.socket_addr()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_creation() {
        let config = Config::default();

        assert_eq!(config.core.log_level, "info");
        assert_eq!(config.session.max_history, 10);
        assert_eq!(config.completion.model, "yandexgpt-lite");
        assert_eq!(config.completion.max_tokens, 300);
        assert_eq!(config.completion.request_timeout_secs, 30);
        assert_eq!(config.completion.prompt_mode, PromptMode::LatestTurn);
        assert_eq!(config.delivery.max_part_length, 4000);
        assert_eq!(config.keep_alive.port, 5000);
        assert_eq!(config.safety.denylist.len(), 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.delivery.pacing_ms, 500);
        assert!(config.keep_alive.enabled);
    }

    #[test]
    fn test_prompt_mode_parsing() {
        let config = Config::from_toml_str(
            r#"
[completion]
prompt_mode = "full_history"
"#,
        )
        .unwrap();
        assert_eq!(config.completion.prompt_mode, PromptMode::FullHistory);
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let err = Config::from_toml_str("[core]\nlog_level = \"loud\"").unwrap_err();
        assert!(matches!(err, EngineError::Config(msg) if msg.contains("loud")));
    }

    #[test]
    fn test_zero_history_rejected() {
        assert!(Config::from_toml_str("[session]\nmax_history = 0").is_err());
    }

    #[test]
    fn test_temperature_out_of_range_rejected() {
        assert!(Config::from_toml_str("[completion]\ntemperature = 1.5").is_err());
    }

    #[test]
    fn test_oversized_part_length_rejected() {
        assert!(Config::from_toml_str("[delivery]\nmax_part_length = 5000").is_err());
    }

    #[test]
    fn test_bad_keep_alive_host_rejected() {
        assert!(Config::from_toml_str("[keep_alive]\nhost = \"not an ip\"").is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_string = config.to_toml_string().unwrap();

        let deserialized = Config::from_toml_str(&toml_string).unwrap();
        assert_eq!(config.core.log_level, deserialized.core.log_level);
        assert_eq!(config.session.system_prompt, deserialized.session.system_prompt);
        assert_eq!(config.safety.denylist, deserialized.safety.denylist);
    }
}

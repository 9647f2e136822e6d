//! CampaignGenie configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main CampaignGenie configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level for the daemon log (trace, debug, info, warn, error);
    /// the --log-level CLI flag takes precedence
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// Storage configuration
    pub storage: StorageConfig,

    /// Consumer loop configuration
    pub consumer: ConsumerConfig,

    /// LLM provider configuration
    pub llm: LlmConfig,

    /// Yektanet panel configuration
    pub yektanet: YektanetConfig,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Checks that required environment variables are set.
    /// Call this early in startup to fail fast with clear error messages.
    pub fn validate(&self) -> Result<()> {
        if std::env::var(&self.llm.api_key_env).is_err() {
            return Err(eyre::eyre!(
                "LLM API key not found. Set the {} environment variable.",
                self.llm.api_key_env
            ));
        }
        if std::env::var(&self.yektanet.account_id_env).is_err() {
            return Err(eyre::eyre!(
                "Yektanet account id not found. Set the {} environment variable.",
                self.yektanet.account_id_env
            ));
        }
        if std::env::var(&self.yektanet.session_id_env).is_err() {
            return Err(eyre::eyre!(
                "Yektanet panel session not found. Set the {} environment variable.",
                self.yektanet.session_id_env
            ));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .campaigngenie.yml
        let local_config = PathBuf::from(".campaigngenie.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/campaigngenie/campaigngenie.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("campaigngenie").join("campaigngenie.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database path
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let base = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            path: base.join("campaigngenie").join("campaigngenie.db"),
        }
    }
}

/// Consumer loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumerConfig {
    /// Sleep between polls when the queue is empty
    #[serde(rename = "poll-interval-ms")]
    pub poll_interval_ms: u64,

    /// Sleep after an unexpected consumer error
    #[serde(rename = "error-backoff-ms")]
    pub error_backoff_ms: u64,

    /// Failed publication passes allowed before a task turns failed
    #[serde(rename = "max-ad-retries")]
    pub max_ad_retries: u32,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 10_000,
            error_backoff_ms: 10_000,
            max_ad_retries: 5,
        }
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name (currently only "openai" supported)
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl LlmConfig {
    /// Read the API key from the configured environment variable
    pub fn get_api_key(&self) -> Result<String, String> {
        std::env::var(&self.api_key_env)
            .map_err(|_| format!("environment variable {} is not set", self.api_key_env))
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            base_url: "https://api.openai.com".to_string(),
            max_tokens: 8192,
            timeout_ms: 300_000,
        }
    }
}

/// Yektanet panel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct YektanetConfig {
    /// Accounts service base URL (token minting)
    #[serde(rename = "accounts-url")]
    pub accounts_url: String,

    /// Advertiser API base URL
    #[serde(rename = "api-url")]
    pub api_url: String,

    /// Ad management service base URL
    #[serde(rename = "ad-management-url")]
    pub ad_management_url: String,

    /// Assistant service base URL (image generation)
    #[serde(rename = "assistant-url")]
    pub assistant_url: String,

    /// Environment variable containing the panel account id
    #[serde(rename = "account-id-env")]
    pub account_id_env: String,

    /// Environment variable containing the panel session id cookie
    #[serde(rename = "session-id-env")]
    pub session_id_env: String,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl YektanetConfig {
    /// Read the account id from the configured environment variable
    pub fn get_account_id(&self) -> Result<String, String> {
        std::env::var(&self.account_id_env)
            .map_err(|_| format!("environment variable {} is not set", self.account_id_env))
    }

    /// Read the panel session id from the configured environment variable
    pub fn get_session_id(&self) -> Result<String, String> {
        std::env::var(&self.session_id_env)
            .map_err(|_| format!("environment variable {} is not set", self.session_id_env))
    }
}

impl Default for YektanetConfig {
    fn default() -> Self {
        Self {
            accounts_url: "https://accounts.yektanet.com".to_string(),
            api_url: "https://api.yektanet.com".to_string(),
            ad_management_url: "https://ad-management.yektanet.com".to_string(),
            assistant_url: "https://assistant.yektanet.com".to_string(),
            account_id_env: "YEKTANET_ACCOUNT_ID".to_string(),
            session_id_env: "YEKTANET_SESSION_ID".to_string(),
            timeout_ms: 60_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.consumer.poll_interval_ms, 10_000);
        assert_eq!(config.consumer.max_ad_retries, 5);
        assert_eq!(config.yektanet.api_url, "https://api.yektanet.com");
    }

    #[test]
    fn test_partial_yaml_falls_back_to_defaults() {
        let yaml = r#"
consumer:
  poll-interval-ms: 500
llm:
  model: gpt-4o-mini
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.consumer.poll_interval_ms, 500);
        assert_eq!(config.consumer.error_backoff_ms, 10_000);
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.provider, "openai");
    }

    #[test]
    fn test_log_level_parses() {
        let config: Config = serde_yaml::from_str("log-level: debug\n").unwrap();
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert!(Config::default().log_level.is_none());
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.llm.max_tokens, Config::default().llm.max_tokens);
    }
}

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedConfig {
    pub api: ApiConfig,
    #[serde(default)]
    pub feed: FeedSettings,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedSettings {
    /// Recommendations requested per page; fixed for the whole session
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_matches_page_size")]
    pub matches_page_size: u32,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            matches_page_size: default_matches_page_size(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_token_env")]
    pub token_env: String,
    #[serde(default)]
    pub token_file: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_env: default_token_env(),
            token_file: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("banp-feed/{}", env!("CARGO_PKG_VERSION"))
}

fn default_page_size() -> u32 {
    5
}

fn default_matches_page_size() -> u32 {
    10
}

fn default_token_env() -> String {
    "BANP_TOKEN".to_string()
}

impl Default for FeedConfig {
    fn default() -> Self {
        FeedConfig {
            api: ApiConfig {
                base_url: "http://localhost:3333".to_string(),
                timeout_seconds: default_timeout_seconds(),
                user_agent: default_user_agent(),
            },
            feed: FeedSettings::default(),
            auth: AuthConfig::default(),
            logging: Some(LoggingConfig {
                level: "info".to_string(),
            }),
        }
    }
}

impl FeedConfig {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file: {path}"))?;
        let config: FeedConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse configuration file: {path}"))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_file(&self, path: &str) -> anyhow::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write configuration file: {path}"))?;
        Ok(())
    }

    /// Load `path`, falling back to defaults when it does not exist
    pub fn load_or_default(path: &str) -> anyhow::Result<Self> {
        if Path::new(path).exists() {
            Self::from_file(path)
        } else {
            log::warn!("Configuration file '{path}' not found, using default configuration");
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        Url::parse(&self.api.base_url)
            .with_context(|| format!("Invalid api.base_url: {}", self.api.base_url))?;
        if self.api.timeout_seconds == 0 {
            bail!("api.timeout_seconds must be at least 1");
        }
        if self.feed.page_size == 0 {
            bail!("feed.page_size must be at least 1");
        }
        if self.feed.matches_page_size == 0 {
            bail!("feed.matches_page_size must be at least 1");
        }
        Ok(())
    }

    pub fn log_level(&self) -> log::LevelFilter {
        self.logging
            .as_ref()
            .and_then(|logging| logging.level.parse().ok())
            .unwrap_or(log::LevelFilter::Info)
    }
}

//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use crate::application::errors::ConfigError;
use crate::application::services::Credentials;

/// GUILDS | GUILD_MODERATION | GUILD_EMOJIS | GUILD_VOICE_STATES | GUILD_MESSAGES |
/// GUILD_MESSAGE_REACTIONS | GUILD_MESSAGE_TYPING | DIRECT_MESSAGES |
/// DIRECT_MESSAGE_REACTIONS | MESSAGE_CONTENT
pub const DEFAULT_INTENTS: u64 = 48781;

/// Bot configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub bot: BotConfig,
    pub discord: DiscordConfig,
    pub modules: ModulesConfig,
    pub data: DataConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct BotConfig {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct DiscordConfig {
    pub token: Option<String>,
    pub client_id: Option<String>,
    pub google_api_key: Option<String>,
    #[serde(default = "default_intents")]
    pub intents: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ModulesConfig {
    pub directory: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct DataConfig {
    pub path: PathBuf,
}

fn default_intents() -> u64 {
    DEFAULT_INTENTS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bot: BotConfig {
                name: "modis".to_string(),
            },
            discord: DiscordConfig {
                token: None,
                client_id: None,
                google_api_key: None,
                intents: DEFAULT_INTENTS,
            },
            modules: ModulesConfig {
                directory: PathBuf::from("./modules"),
            },
            data: DataConfig {
                path: PathBuf::from("data.json"),
            },
        }
    }
}

impl Config {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read config: {}", e)))?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))
    }

    pub fn load_env() -> Self {
        let mut config = Config::default();
        config.apply_env();
        config
    }

    /// Override fields from environment variables
    pub fn apply_env(&mut self) {
        self.apply_vars(|key| std::env::var(key).ok());
    }

    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(token) = var("DISCORD_TOKEN") {
            self.discord.token = Some(token);
        }
        if let Some(client_id) = var("DISCORD_CLIENT_ID") {
            self.discord.client_id = Some(client_id);
        }
        if let Some(key) = var("GOOGLE_API_KEY") {
            self.discord.google_api_key = Some(key);
        }
        if let Some(dir) = var("MODIS_MODULES_DIR") {
            self.modules.directory = PathBuf::from(dir);
        }
    }

    /// Credentials for a run; the token is required, the rest may be empty
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        let token = self.discord.token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingField("discord.token".to_string()))?;

        Ok(Credentials {
            token,
            client_id: self.discord.client_id.clone().unwrap_or_default(),
            google_api_key: self.discord.google_api_key.clone().unwrap_or_default(),
        })
    }
}

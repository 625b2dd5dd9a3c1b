//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use crate::application::errors::ConfigError;

/// Bot configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub bot: BotConfig,
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    pub modules: ModulesConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct BotConfig {
    pub name: String,
    pub prefix: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ConnectionConfig {
    pub nick: String,
    pub ident: String,
    pub name: String,
    pub server: String,
    pub port: u16,
    pub host: String,
    #[serde(default)]
    pub channels: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct AuthConfig {
    #[serde(default)]
    pub owners: Vec<String>,
    #[serde(default)]
    pub admins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ModulesConfig {
    /// Where native modules live, one directory per module
    pub directory: PathBuf,
    /// Modules loaded at startup, in this order
    #[serde(default)]
    pub autoload: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bot: BotConfig {
                name: "brunobot".to_string(),
                prefix: "!".to_string(),
            },
            connection: ConnectionConfig {
                nick: "brunobot".to_string(),
                ident: "bruno".to_string(),
                name: "brunobot".to_string(),
                server: "irc.libera.chat".to_string(),
                port: 6667,
                host: "localhost".to_string(),
                channels: vec!["#brunobot".to_string()],
            },
            auth: AuthConfig::default(),
            modules: ModulesConfig {
                directory: PathBuf::from("./modules"),
                autoload: vec![
                    "typofixer".to_string(),
                    "seen".to_string(),
                    "remind".to_string(),
                ],
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

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self)
            .map_err(|e| ConfigError::Parse(format!("Failed to serialize config: {}", e)))
    }

    pub fn load_env() -> Self {
        // Load from environment variables
        let mut config = Config::default();

        if let Ok(nick) = std::env::var("BOT_NICK") {
            config.connection.nick = nick;
        }

        if let Ok(prefix) = std::env::var("BOT_PREFIX") {
            config.bot.prefix = prefix;
        }

        if let Ok(modules) = std::env::var("BOT_MODULES") {
            config.modules.autoload = modules
                .split(',')
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string)
                .collect();
        }

        config
    }

    /// Reject configurations the core cannot start with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bot.prefix.is_empty() {
            return Err(ConfigError::MissingField("bot.prefix".to_string()));
        }
        if self.connection.nick.is_empty() {
            return Err(ConfigError::MissingField("connection.nick".to_string()));
        }
        if self.connection.ident.is_empty() {
            return Err(ConfigError::MissingField("connection.ident".to_string()));
        }
        if self.connection.port == 0 {
            return Err(ConfigError::InvalidValue("connection.port must be non-zero".to_string()));
        }
        if let Some(bad) = self.modules.autoload.iter().find(|m| m.trim().is_empty()) {
            return Err(ConfigError::InvalidValue(format!("empty module name in autoload: {:?}", bad)));
        }
        Ok(())
    }
}

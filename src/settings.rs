use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::model::ModelConfig;

/// Layered configuration: built-in defaults, then an optional `Config` file
/// (`Config.toml`, `Config.json`, ...), then `SMARTCHAT__SECTION__KEY` variables.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub data: DataSettings,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub responses: ResponseSettings,
    #[serde(default)]
    pub server: ServerSettings,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct DataSettings {
    pub intents_file: PathBuf,
    pub history_file: PathBuf,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            intents_file: PathBuf::from("intents.json"),
            history_file: PathBuf::from("chat_history.csv"),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct ResponseSettings {
    /// Seed for response selection. Unset means a fresh seed per process.
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("Config")
    }

    pub fn load_from(name: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name(name).required(false))
            .add_source(Environment::with_prefix("SMARTCHAT").separator("__"))
            .build()?
            .try_deserialize()
    }
}

use crate::error::AppError;
use config::{Config as Cfg, File};
use serde::Deserialize;

/// Base settings every service in this repo shares: where to listen and how
/// long a storage call may wait for a connection.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_storage_timeout")]
    pub storage_timeout_seconds: u64,
}

fn default_port() -> u16 {
    8080
}

fn default_storage_timeout() -> u64 {
    30
}

impl Config {
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let config = Cfg::builder()
            .add_source(File::with_name("configuration").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_unset() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.storage_timeout_seconds, 30);
    }
}

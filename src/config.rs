use crate::error::{Error, Result};
use crate::utils::telegram_auth::{InitDataConfig, DEFAULT_MAX_AGE_SECONDS};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub telegram_bot_token: String,
    pub password_prefix: String,
    pub twa_expire_seconds: i64,
    pub shaple_url: String,
    pub shaple_service_key: String,
    pub twa_schema: String,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            telegram_bot_token: get_env("TELEGRAM_BOT_TOKEN")?,
            password_prefix: get_env("PWD_PREFIX")?,
            twa_expire_seconds: get_env_parse_or("TWA_EXPIRE", DEFAULT_MAX_AGE_SECONDS)?,
            shaple_url: get_env("SHAPLE_URL")?,
            shaple_service_key: get_env("SHAPLE_SERVICE_KEY")?,
            twa_schema: env::var("TWA_SCHEMA").unwrap_or_else(|_| "twa_auth".to_string()),
        })
    }

    pub fn init_data_config(&self) -> InitDataConfig {
        InitDataConfig::new(self.telegram_bot_token.clone()).with_max_age(self.twa_expire_seconds)
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => parse_value(name, &raw),
        _ => Ok(default),
    }
}

fn parse_value<T>(name: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e)))
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> Result<&'static Config> {
    CONFIG
        .get()
        .ok_or_else(|| Error::Config("Configuration has not been initialized".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_expire_window() {
        let value: i64 = parse_value("TWA_EXPIRE", " 600 ").unwrap();
        assert_eq!(value, 600);

        let disabled: i64 = parse_value("TWA_EXPIRE", "-1").unwrap();
        assert_eq!(disabled, -1);
    }

    #[test]
    fn rejects_non_numeric_expire_window() {
        let err = parse_value::<i64>("TWA_EXPIRE", "3h").unwrap_err();
        assert!(matches!(err, Error::Config(ref msg) if msg.contains("TWA_EXPIRE")));
    }

    #[test]
    fn init_data_config_carries_token_and_window() {
        let config = Config {
            server_address: "127.0.0.1:0".into(),
            telegram_bot_token: "TEST_BOT_TOKEN".into(),
            password_prefix: "pfx".into(),
            twa_expire_seconds: 0,
            shaple_url: "http://localhost".into(),
            shaple_service_key: "key".into(),
            twa_schema: "twa_auth".into(),
        };

        let init_data = config.init_data_config();
        assert_eq!(init_data.bot_token, "TEST_BOT_TOKEN");
        assert_eq!(init_data.max_age_seconds, 0);
    }
}

use std::{net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use url::Url;

use crate::{error::ConfigError, quiz::QuizSettings};

const DEFAULT_WEB_PORT: u16 = 5000;

#[derive(Debug, Clone, PartialEq)]
pub struct WebhookConfig {
    pub url: Url,
    pub addr: SocketAddr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub bot_token: String,
    pub database_url: String,
    pub log_level: String,
    /// Long polling is used when absent.
    pub webhook: Option<WebhookConfig>,
    pub web_addr: SocketAddr,
    pub dictionary_path: PathBuf,
    pub quiz: QuizSettings,
}

impl Config {
    /// Reads the process environment, after loading `.env` if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let bot_token = var("TELOXIDE_TOKEN")
            .or_else(|| var("TELEGRAM_BOT_TOKEN"))
            .ok_or(ConfigError::Missing("TELOXIDE_TOKEN"))?;
        let database_url = var("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let webhook = match (var("WEBHOOK_URL"), var("WEBHOOK_ADDR")) {
            (Some(url), Some(addr)) => Some(WebhookConfig {
                url: parse("WEBHOOK_URL", url)?,
                addr: parse("WEBHOOK_ADDR", addr)?,
            }),
            _ => None,
        };

        let web_addr = match var("WEB_ADDR") {
            Some(addr) => parse("WEB_ADDR", addr)?,
            None => {
                let port = match var("PORT") {
                    Some(port) => parse("PORT", port)?,
                    None => DEFAULT_WEB_PORT,
                };
                SocketAddr::from(([0, 0, 0, 0], port))
            }
        };

        let defaults = QuizSettings::default();
        let quiz = QuizSettings {
            open_period: seconds(var("QUIZ_OPEN_PERIOD_SECS"), "QUIZ_OPEN_PERIOD_SECS")?
                .unwrap_or(defaults.open_period),
            advance_delay: seconds(var("QUIZ_ADVANCE_DELAY_SECS"), "QUIZ_ADVANCE_DELAY_SECS")?
                .unwrap_or(defaults.advance_delay),
        };

        Ok(Self {
            bot_token,
            database_url,
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".to_owned()),
            webhook,
            web_addr,
            dictionary_path: var("DICTIONARY_PATH")
                .unwrap_or_else(|| "dict.json".to_owned())
                .into(),
            quiz,
        })
    }
}

fn parse<T: FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { var, value })
}

fn seconds(value: Option<String>, var: &'static str) -> Result<Option<Duration>, ConfigError> {
    let Some(value) = value else {
        return Ok(None);
    };
    match parse::<u64>(var, value.clone())? {
        0 => Err(ConfigError::Invalid { var, value }),
        secs => Ok(Some(Duration::from_secs(secs))),
    }
}

//! Bot configuration.

use crate::sources::PollingConfig;
use crate::types::ParseMode;
use std::time::Duration;
use thiserror::Error;

/// Configuration failed to load.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The token variable was not set.
    #[error("environment variable `{0}` is not set")]
    MissingToken(String),

    /// A numeric knob did not parse.
    #[error("environment variable `{name}` has invalid value `{value}`")]
    InvalidValue {
        /// The variable's name.
        name: String,
        /// The rejected value.
        value: String,
    },
}

/// Everything needed to run a bot.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// The bot token, `<bot_id>:<secret>`.
    pub token: String,
    /// Bot API server base URL.
    pub base_url: Option<String>,
    /// Long-poll timeout in seconds.
    pub poll_timeout: u64,
    /// Updates per `getUpdates` batch.
    pub poll_limit: u32,
    /// Update kinds to receive.
    pub allowed_updates: Option<Vec<String>>,
    /// Pause between reconnect attempts.
    pub reconnect_after: Duration,
    /// Consecutive failures at which polling gives up.
    pub max_reconnects: u32,
    /// Drop the backlog on startup.
    pub skip_updates: bool,
    /// Parse mode applied to plain text replies.
    pub parse_mode_default: Option<ParseMode>,
    /// Secret the webhook sink requires in the secret-token header.
    pub webhook_secret: Option<String>,
}

impl BotConfig {
    /// A config with default knobs for `token`.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            base_url: None,
            poll_timeout: 30,
            poll_limit: 100,
            allowed_updates: None,
            reconnect_after: Duration::from_secs(5),
            max_reconnects: 15,
            skip_updates: false,
            parse_mode_default: None,
            webhook_secret: None,
        }
    }

    /// Load from the environment (and a `.env` file, if present).
    ///
    /// Reads the token from `BOT_TOKEN` and the optional knobs
    /// `BOT_API_URL`, `BOT_POLL_TIMEOUT`, `BOT_POLL_LIMIT`,
    /// `BOT_SKIP_UPDATES`, `BOT_PARSE_MODE` and `BOT_WEBHOOK_SECRET`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_var("BOT_TOKEN")
    }

    /// Like [`from_env`](Self::from_env) with a custom token variable.
    pub fn from_env_var(token_var: &str) -> Result<Self, ConfigError> {
        // A missing .env file is fine; the real environment still counts.
        let _ = dotenvy::dotenv();

        let token = std::env::var(token_var)
            .map_err(|_| ConfigError::MissingToken(token_var.to_string()))?;
        let mut config = Self::new(token);

        if let Ok(url) = std::env::var("BOT_API_URL") {
            config.base_url = Some(url);
        }
        if let Ok(raw) = std::env::var("BOT_POLL_TIMEOUT") {
            config.poll_timeout = parse_var("BOT_POLL_TIMEOUT", &raw)?;
        }
        if let Ok(raw) = std::env::var("BOT_POLL_LIMIT") {
            config.poll_limit = parse_var("BOT_POLL_LIMIT", &raw)?;
        }
        if let Ok(raw) = std::env::var("BOT_SKIP_UPDATES") {
            config.skip_updates = matches!(raw.as_str(), "1" | "true" | "yes");
        }
        if let Ok(raw) = std::env::var("BOT_PARSE_MODE") {
            config.parse_mode_default = Some(parse_mode(&raw)?);
        }
        if let Ok(secret) = std::env::var("BOT_WEBHOOK_SECRET") {
            config.webhook_secret = Some(secret);
        }
        Ok(config)
    }

    /// The polling knobs derived from this config.
    pub fn polling(&self) -> PollingConfig {
        PollingConfig {
            timeout: Duration::from_secs(self.poll_timeout),
            limit: self.poll_limit,
            allowed_updates: self.allowed_updates.clone(),
            reconnect_after: self.reconnect_after,
            max_reconnects: self.max_reconnects,
            skip_updates: self.skip_updates,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T, ConfigError> {
    raw.parse().map_err(|_| ConfigError::InvalidValue {
        name: name.to_string(),
        value: raw.to_string(),
    })
}

fn parse_mode(raw: &str) -> Result<ParseMode, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "html" => Ok(ParseMode::Html),
        "markdown" => Ok(ParseMode::Markdown),
        "markdownv2" => Ok(ParseMode::MarkdownV2),
        _ => Err(ConfigError::InvalidValue {
            name: "BOT_PARSE_MODE".to_string(),
            value: raw.to_string(),
        }),
    }
}

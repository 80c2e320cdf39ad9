//! Bot API failure taxonomy.

use thiserror::Error;

/// Errors raised by Bot API calls.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The server asked us to slow down (HTTP 429).
    #[error("rate limited, retry after {retry_after}s")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after: u64,
    },

    /// A non-OK Bot API response that isn't a rate limit.
    #[error("telegram error {code}: {description}")]
    Telegram {
        /// The `error_code` field.
        code: i64,
        /// The `description` field.
        description: String,
        /// Set when a group migrated to a supergroup.
        migrate_to_chat_id: Option<i64>,
    },

    /// HTTP 401: the token was rejected. Never retried.
    #[error("bot token rejected by the server")]
    InvalidToken,

    /// The request did not complete in time.
    #[error("request timed out")]
    Timeout,

    /// Connection-level failure (DNS, TLS, reset).
    #[error("connection failed: {0}")]
    Connection(String),

    /// The response body was not the expected shape.
    #[error("malformed response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Whether retrying the same request may succeed.
    ///
    /// Rate limits are transient but carry their own backoff, so they are
    /// reported separately and excluded here.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Timeout | ApiError::Connection(_) => true,
            ApiError::Telegram { code, .. } => (500..600).contains(code),
            _ => false,
        }
    }
}

/// The token string failed validation.
#[derive(Error, Debug)]
#[error("malformed bot token: expected `<bot_id>:<secret>`")]
pub struct TokenError;

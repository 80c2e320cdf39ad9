//! # Bot API client
//!
//! A thin, typed client for the Telegram Bot API. The HTTP layer sits
//! behind the [`Transport`] trait so tests can swap in a scripted
//! transport; the default [`HttpTransport`] is a `reqwest` client that
//! retries once on transient failures and maps the well-known HTTP
//! statuses (401, 429) to structured [`ApiError`] variants.

mod error;

pub use error::{ApiError, TokenError};

use crate::types::Update;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::{fmt, future::Future, pin::Pin, sync::Arc, time::Duration};

/// Default Bot API server.
pub const DEFAULT_BASE_URL: &str = "https://api.telegram.org";

/// A validated bot token of the form `<bot_id>:<secret>`.
#[derive(Clone)]
pub struct Token(Arc<str>);

impl Token {
    /// Parse and validate a token string.
    pub fn new(raw: impl Into<String>) -> Result<Self, TokenError> {
        let raw = raw.into();
        let (id, secret) = raw.split_once(':').ok_or(TokenError)?;
        if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) || secret.is_empty() {
            return Err(TokenError);
        }
        Ok(Self(raw.into()))
    }

    /// The numeric bot id prefix.
    pub fn bot_id(&self) -> i64 {
        // Validated in `new`; an overlong id still parses as far as i64 allows.
        self.0
            .split(':')
            .next()
            .and_then(|id| id.parse().ok())
            .unwrap_or_default()
    }

    /// The full token for URL construction.
    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print the secret half.
        write!(f, "Token({}:***)", self.bot_id())
    }
}

/// The envelope every Bot API response arrives in.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the call succeeded.
    pub ok: bool,
    /// The payload, present when `ok` is true.
    pub result: Option<T>,
    /// Error code, present when `ok` is false.
    pub error_code: Option<i64>,
    /// Human-readable error description.
    pub description: Option<String>,
    /// Extra failure parameters.
    pub parameters: Option<ResponseParameters>,
}

/// The `parameters` object of a failed response.
#[derive(Debug, Deserialize)]
pub struct ResponseParameters {
    /// Seconds to wait, for 429 responses.
    pub retry_after: Option<u64>,
    /// The supergroup the chat migrated to.
    pub migrate_to_chat_id: Option<i64>,
}

/// How a single Bot API method call reaches the server.
///
/// `call` takes the method name and a JSON parameter object and returns
/// the raw `result` payload with the envelope already unwrapped.
pub trait Transport: Send + Sync + 'static {
    /// Execute one method call.
    fn call(
        &self,
        method: &str,
        params: Value,
        timeout: Duration,
    ) -> impl Future<Output = Result<Value, ApiError>> + Send;
}

/// Object-safe version of [`Transport`] for storage behind `Arc<dyn _>`.
pub trait DynTransport: Send + Sync + 'static {
    /// Execute one method call (dynamic dispatch version).
    fn call_dyn<'a>(
        &'a self,
        method: &'a str,
        params: Value,
        timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = Result<Value, ApiError>> + Send + 'a>>;
}

impl<T: Transport> DynTransport for T {
    fn call_dyn<'a>(
        &'a self,
        method: &'a str,
        params: Value,
        timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = Result<Value, ApiError>> + Send + 'a>> {
        Box::pin(self.call(method, params, timeout))
    }
}

/// The default `reqwest`-backed transport.
pub struct HttpTransport {
    client: reqwest::Client,
    base: String,
    token: Token,
}

impl HttpTransport {
    /// A transport against the public Bot API server.
    pub fn new(token: Token) -> Self {
        Self::with_base(token, DEFAULT_BASE_URL)
    }

    /// A transport against a custom server (local Bot API, test double).
    pub fn with_base(token: Token, base: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base: base.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    fn url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base, self.token.as_str(), method)
    }

    async fn call_once(
        &self,
        method: &str,
        params: &Value,
        timeout: Duration,
    ) -> Result<Value, ApiError> {
        let response = self
            .client
            .post(self.url(method))
            .timeout(timeout)
            .json(params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ApiError::Timeout
                } else {
                    ApiError::Connection(e.to_string())
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ApiError::InvalidToken);
        }

        let envelope: ApiResponse<Value> = response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        unwrap_envelope(envelope)
    }
}

fn unwrap_envelope(envelope: ApiResponse<Value>) -> Result<Value, ApiError> {
    if envelope.ok {
        return Ok(envelope.result.unwrap_or(Value::Null));
    }
    let code = envelope.error_code.unwrap_or(0);
    let parameters = envelope.parameters;
    if code == 401 {
        return Err(ApiError::InvalidToken);
    }
    if code == 429 {
        let retry_after = parameters.as_ref().and_then(|p| p.retry_after).unwrap_or(1);
        return Err(ApiError::RateLimited { retry_after });
    }
    Err(ApiError::Telegram {
        code,
        description: envelope
            .description
            .unwrap_or_else(|| "no description".to_string()),
        migrate_to_chat_id: parameters.and_then(|p| p.migrate_to_chat_id),
    })
}

impl Transport for HttpTransport {
    async fn call(
        &self,
        method: &str,
        params: Value,
        timeout: Duration,
    ) -> Result<Value, ApiError> {
        match self.call_once(method, &params, timeout).await {
            Err(err) if err.is_transient() => {
                tracing::debug!(method, error = %err, "transient api failure, retrying once");
                self.call_once(method, &params, timeout).await
            }
            other => other,
        }
    }
}

/// Parameters of `getUpdates`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GetUpdates {
    /// First update id to return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    /// Long-poll timeout in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    /// Maximum number of updates per batch (1..=100).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    /// Update kinds to receive; empty means server default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_updates: Option<Vec<String>>,
}

/// A handle to the Bot API, cheap to clone.
#[derive(Clone)]
pub struct Api {
    transport: Arc<dyn DynTransport>,
    token: Token,
    base: String,
    request_timeout: Duration,
}

impl fmt::Debug for Api {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Api")
            .field("token", &self.token)
            .field("base", &self.base)
            .finish()
    }
}

impl Api {
    /// An API handle against the public server.
    pub fn new(token: Token) -> Self {
        Self::with_base(token, DEFAULT_BASE_URL)
    }

    /// An API handle against a custom server.
    pub fn with_base(token: Token, base: impl Into<String>) -> Self {
        let base = base.into().trim_end_matches('/').to_string();
        Self {
            transport: Arc::new(HttpTransport::with_base(token.clone(), base.clone())),
            token,
            base,
            request_timeout: Duration::from_secs(75),
        }
    }

    /// An API handle over a custom transport.
    pub fn with_transport(token: Token, transport: Arc<dyn DynTransport>) -> Self {
        Self {
            transport,
            token,
            base: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(75),
        }
    }

    /// The token's numeric bot id.
    pub fn bot_id(&self) -> i64 {
        self.token.bot_id()
    }

    /// Call an arbitrary method with raw JSON parameters.
    pub async fn request_raw(&self, method: &str, params: Value) -> Result<Value, ApiError> {
        self.transport
            .call_dyn(method, params, self.request_timeout)
            .await
    }

    /// Call an arbitrary method and decode the result payload.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, ApiError> {
        let raw = self.request_raw(method, params).await?;
        serde_json::from_value(raw).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Long-poll for updates.
    pub async fn get_updates(&self, params: &GetUpdates) -> Result<Vec<Update>, ApiError> {
        let body = serde_json::to_value(params).map_err(|e| ApiError::Decode(e.to_string()))?;
        self.request("getUpdates", body).await
    }

    /// Send a text message. Extra parameters (`parse_mode`, markup) go in
    /// `extra` and are merged over the required fields.
    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        extra: Value,
    ) -> Result<Value, ApiError> {
        let mut params = serde_json::json!({ "chat_id": chat_id, "text": text });
        merge_params(&mut params, extra);
        self.request_raw("sendMessage", params).await
    }

    /// Answer a callback query, optionally with a toast text.
    pub async fn answer_callback_query(
        &self,
        callback_query_id: &str,
        extra: Value,
    ) -> Result<Value, ApiError> {
        let mut params = serde_json::json!({ "callback_query_id": callback_query_id });
        merge_params(&mut params, extra);
        self.request_raw("answerCallbackQuery", params).await
    }

    /// Answer an inline query with prepared results.
    pub async fn answer_inline_query(
        &self,
        inline_query_id: &str,
        results: Value,
        extra: Value,
    ) -> Result<Value, ApiError> {
        let mut params = serde_json::json!({
            "inline_query_id": inline_query_id,
            "results": results,
        });
        merge_params(&mut params, extra);
        self.request_raw("answerInlineQuery", params).await
    }

    /// The bot's own user object.
    pub async fn get_me(&self) -> Result<crate::types::User, ApiError> {
        self.request("getMe", Value::Object(Default::default()))
            .await
    }

    /// Remove an active webhook so long polling can take over.
    pub async fn delete_webhook(&self, drop_pending_updates: bool) -> Result<Value, ApiError> {
        self.request_raw(
            "deleteWebhook",
            serde_json::json!({ "drop_pending_updates": drop_pending_updates }),
        )
        .await
    }

    /// Download URL for a file path returned by `getFile`.
    pub fn file_url(&self, file_path: &str) -> String {
        format!(
            "{}/file/bot{}/{}",
            self.base,
            self.token.as_str(),
            file_path
        )
    }
}

fn merge_params(base: &mut Value, extra: Value) {
    if let (Value::Object(base), Value::Object(extra)) = (base, extra) {
        for (key, value) in extra {
            base.insert(key, value);
        }
    }
}

//! Webhook ingestion, transport-agnostic.
//!
//! Ferrogram does not ship an HTTP server; [`WebhookSink`] is the piece
//! you mount inside whatever server you already run. Hand it the value of
//! the secret-token header and the raw request body, and forward updates
//! from the returned channel into the dispatcher.

use crate::types::Update;
use tokio::sync::mpsc;

/// The header Telegram echoes the configured secret token in.
pub const SECRET_TOKEN_HEADER: &str = "X-Telegram-Bot-Api-Secret-Token";

/// What the embedding HTTP server should answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WebhookResponse {
    /// HTTP status code.
    pub status: u16,
}

impl WebhookResponse {
    const OK: Self = Self { status: 200 };
    const BAD_REQUEST: Self = Self { status: 400 };
    const FORBIDDEN: Self = Self { status: 403 };
    const GONE: Self = Self { status: 503 };
}

/// Validates and decodes incoming webhook requests.
pub struct WebhookSink {
    secret: Option<String>,
    tx: mpsc::Sender<Update>,
}

impl WebhookSink {
    /// A sink expecting `secret` in the secret-token header.
    ///
    /// Pass `None` to skip the check (e.g. when the embedding server
    /// already authenticates the route).
    pub fn new(secret: Option<String>, buffer: usize) -> (Self, mpsc::Receiver<Update>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self { secret, tx }, rx)
    }

    /// Handle one webhook request.
    ///
    /// The secret check runs before the body is touched: a mismatch is
    /// 403 regardless of payload. A body that isn't a valid update is
    /// 400. A full or closed channel is 503 so the server retries later.
    pub async fn handle(&self, secret_header: Option<&str>, body: &[u8]) -> WebhookResponse {
        if let Some(expected) = &self.secret {
            if secret_header != Some(expected.as_str()) {
                tracing::warn!("webhook request with missing or wrong secret token");
                return WebhookResponse::FORBIDDEN;
            }
        }

        let update: Update = match serde_json::from_slice(body) {
            Ok(update) => update,
            Err(err) => {
                tracing::warn!(error = %err, "undecodable webhook body");
                return WebhookResponse::BAD_REQUEST;
            }
        };

        match self.tx.send(update).await {
            Ok(()) => WebhookResponse::OK,
            Err(_) => {
                tracing::error!("webhook sink closed, dropping update");
                WebhookResponse::GONE
            }
        }
    }
}

//! Handler return values and the auto-reply policy.

use crate::{
    api::{Api, ApiError},
    types::{ParseMode, Update, UpdateKind},
};
use serde_json::{Map, Value, json};

/// What a handler asked the framework to send back.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Reply {
    /// Send nothing.
    #[default]
    None,
    /// A plain text reply.
    Text(String),
    /// A text reply with an explicit parse mode.
    Formatted {
        /// The reply text.
        text: String,
        /// The formatting mode.
        parse_mode: ParseMode,
    },
    /// Several text replies, sent in order.
    Texts(Vec<String>),
    /// Raw method parameters, merged over the kind's defaults.
    Params(Map<String, Value>),
    /// A photo reply by file id or URL.
    Photo {
        /// File id or HTTP URL.
        photo: String,
        /// Optional caption.
        caption: Option<String>,
    },
}

/// Conversion into a [`Reply`], used by the handler return machinery.
pub trait IntoReply {
    /// Convert self into a reply.
    fn into_reply(self) -> Reply;
}

impl IntoReply for Reply {
    fn into_reply(self) -> Reply {
        self
    }
}

impl IntoReply for () {
    fn into_reply(self) -> Reply {
        Reply::None
    }
}

impl IntoReply for String {
    fn into_reply(self) -> Reply {
        Reply::Text(self)
    }
}

impl IntoReply for &'static str {
    fn into_reply(self) -> Reply {
        Reply::Text(self.to_string())
    }
}

impl IntoReply for Vec<String> {
    fn into_reply(self) -> Reply {
        Reply::Texts(self)
    }
}

impl IntoReply for Map<String, Value> {
    fn into_reply(self) -> Reply {
        Reply::Params(self)
    }
}

impl<T: IntoReply> IntoReply for Option<T> {
    fn into_reply(self) -> Reply {
        match self {
            Some(value) => value.into_reply(),
            None => Reply::None,
        }
    }
}

/// Routes handler return values back to the chat they came from.
///
/// The policy picks the reply method from the update kind: messages get
/// `sendMessage`, callback queries get `answerCallbackQuery` (a toast),
/// inline queries get a single-article `answerInlineQuery`. A
/// [`Reply::Params`] value is merged over the kind's required fields, so
/// handlers can attach markup or override defaults without dropping to
/// raw API calls.
#[derive(Debug, Clone, Default)]
pub struct ReplyPolicy {
    /// Parse mode applied to plain [`Reply::Text`] replies.
    pub parse_mode: Option<ParseMode>,
}

impl ReplyPolicy {
    /// A policy with no default parse mode.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `parse_mode` to plain text replies.
    pub fn with_parse_mode(parse_mode: ParseMode) -> Self {
        Self {
            parse_mode: Some(parse_mode),
        }
    }

    /// Deliver `reply` in response to `update`.
    pub async fn apply(&self, reply: Reply, update: &Update, api: &Api) -> Result<(), ApiError> {
        match reply {
            Reply::None => Ok(()),
            Reply::Text(text) => {
                let extra = match self.parse_mode {
                    Some(mode) => json!({ "parse_mode": mode.as_str() }),
                    None => Value::Null,
                };
                self.send_text(&text, extra, update, api).await
            }
            Reply::Formatted { text, parse_mode } => {
                self.send_text(&text, json!({ "parse_mode": parse_mode.as_str() }), update, api)
                    .await
            }
            Reply::Texts(texts) => {
                for text in texts {
                    let extra = match self.parse_mode {
                        Some(mode) => json!({ "parse_mode": mode.as_str() }),
                        None => Value::Null,
                    };
                    self.send_text(&text, extra, update, api).await?;
                }
                Ok(())
            }
            Reply::Params(params) => self.send_params(params, update, api).await,
            Reply::Photo { photo, caption } => {
                let Some(chat) = update.chat() else {
                    tracing::debug!(kind = ?update.kind(), "photo reply has no destination chat");
                    return Ok(());
                };
                let mut params = json!({ "chat_id": chat.id, "photo": photo });
                if let (Value::Object(map), Some(caption)) = (&mut params, caption) {
                    map.insert("caption".to_string(), Value::String(caption));
                }
                api.request_raw("sendPhoto", params).await.map(drop)
            }
        }
    }

    async fn send_text(
        &self,
        text: &str,
        extra: Value,
        update: &Update,
        api: &Api,
    ) -> Result<(), ApiError> {
        match update.kind() {
            UpdateKind::CallbackQuery => {
                let Some(cb) = &update.callback_query else {
                    return Ok(());
                };
                api.answer_callback_query(&cb.id, json!({ "text": text }))
                    .await
                    .map(drop)
            }
            UpdateKind::InlineQuery => {
                let Some(inline) = &update.inline_query else {
                    return Ok(());
                };
                let results = json!([{
                    "type": "article",
                    "id": "0",
                    "title": text,
                    "input_message_content": { "message_text": text },
                }]);
                api.answer_inline_query(&inline.id, results, Value::Null)
                    .await
                    .map(drop)
            }
            _ => {
                let Some(chat) = update.chat() else {
                    tracing::debug!(kind = ?update.kind(), "text reply has no destination chat");
                    return Ok(());
                };
                api.send_message(chat.id, text, extra).await.map(drop)
            }
        }
    }

    async fn send_params(
        &self,
        params: Map<String, Value>,
        update: &Update,
        api: &Api,
    ) -> Result<(), ApiError> {
        match update.kind() {
            UpdateKind::CallbackQuery => {
                let Some(cb) = &update.callback_query else {
                    return Ok(());
                };
                api.answer_callback_query(&cb.id, Value::Object(params))
                    .await
                    .map(drop)
            }
            _ => {
                let Some(chat) = update.chat() else {
                    tracing::debug!(kind = ?update.kind(), "params reply has no destination chat");
                    return Ok(());
                };
                let mut merged = json!({ "chat_id": chat.id });
                if let Value::Object(map) = &mut merged {
                    for (key, value) in params {
                        map.insert(key, value);
                    }
                }
                api.request_raw("sendMessage", merged).await.map(drop)
            }
        }
    }
}

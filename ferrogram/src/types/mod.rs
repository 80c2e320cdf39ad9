//! Telegram data model.
//!
//! Only the objects and fields the dispatch engine consumes are modeled;
//! unknown deep structures (chat member states, reaction lists, boost
//! sources) are carried as raw JSON so decode/encode round-trips stay
//! lossless for everything we touch.

mod primitives;
mod update;

pub use primitives::{
    CallbackQuery, Chat, ChosenInlineResult, InlineQuery, Message, PhotoSize, Poll, PollAnswer,
    PollOption, User,
};
pub use update::{
    ChatBoostRemoved, ChatBoostUpdated, ChatJoinRequest, ChatMemberUpdated,
    MessageReactionCountUpdated, MessageReactionUpdated, PreCheckoutQuery, ShippingQuery, Update,
    UpdateKind,
};

use serde::{Deserialize, Serialize};

/// Text formatting mode for outgoing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParseMode {
    /// Telegram HTML subset.
    #[serde(rename = "HTML")]
    Html,
    /// Legacy Markdown.
    Markdown,
    /// MarkdownV2.
    MarkdownV2,
}

impl ParseMode {
    /// The wire name of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseMode::Html => "HTML",
            ParseMode::Markdown => "Markdown",
            ParseMode::MarkdownV2 => "MarkdownV2",
        }
    }
}

//! The update union and its discriminator.

use super::primitives::{
    CallbackQuery, Chat, ChosenInlineResult, InlineQuery, Message, Poll, PollAnswer, User,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A chat member's status change. The old/new member objects are carried
/// as raw JSON; the engine only routes on the envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMemberUpdated {
    /// The chat the change happened in.
    pub chat: Chat,
    /// The user who performed the change.
    pub from: User,
    /// Unix time of the change.
    pub date: i64,
    /// Previous member state.
    pub old_chat_member: Value,
    /// New member state.
    pub new_chat_member: Value,
}

/// A request to join a chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatJoinRequest {
    /// The chat the request targets.
    pub chat: Chat,
    /// The requesting user.
    pub from: User,
    /// Identifier of the requester's private chat with the bot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_chat_id: Option<i64>,
    /// Unix time of the request.
    pub date: i64,
}

/// An incoming pre-checkout query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreCheckoutQuery {
    /// Unique query identifier.
    pub id: String,
    /// The paying user.
    pub from: User,
    /// Three-letter ISO 4217 currency code.
    pub currency: String,
    /// Total price in the smallest currency unit.
    pub total_amount: i64,
    /// Bot-specified invoice payload.
    pub invoice_payload: String,
}

/// An incoming shipping query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingQuery {
    /// Unique query identifier.
    pub id: String,
    /// The user who sent the query.
    pub from: User,
    /// Bot-specified invoice payload.
    pub invoice_payload: String,
    /// Specified shipping address, as raw JSON.
    pub shipping_address: Value,
}

/// A change of reactions on a message by a specific actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageReactionUpdated {
    /// The chat containing the message.
    pub chat: Chat,
    /// The reacted-to message.
    pub message_id: i64,
    /// The reacting user, when not anonymous.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    /// Unix time of the change.
    pub date: i64,
    /// Previous reactions, as raw JSON.
    pub old_reaction: Value,
    /// New reactions, as raw JSON.
    pub new_reaction: Value,
}

/// Anonymous reaction count change on a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageReactionCountUpdated {
    /// The chat containing the message.
    pub chat: Chat,
    /// The message.
    pub message_id: i64,
    /// Unix time of the change.
    pub date: i64,
    /// Current reaction counts, as raw JSON.
    pub reactions: Value,
}

/// A chat boost was added or changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatBoostUpdated {
    /// The boosted chat.
    pub chat: Chat,
    /// Boost details, as raw JSON.
    pub boost: Value,
}

/// A chat boost was removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatBoostRemoved {
    /// The chat that lost the boost.
    pub chat: Chat,
    /// Identifier of the removed boost.
    pub boost_id: String,
    /// Unix time of the removal.
    pub remove_date: i64,
    /// Boost source, as raw JSON.
    pub source: Value,
}

/// The kind of payload an update carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateKind {
    /// New incoming message.
    Message,
    /// Edit of a known message.
    EditedMessage,
    /// New channel post.
    ChannelPost,
    /// Inline keyboard callback.
    CallbackQuery,
    /// Inline mode query.
    InlineQuery,
    /// Chosen inline result.
    ChosenInlineResult,
    /// Another user's member status changed.
    ChatMember,
    /// The bot's own member status changed.
    MyChatMember,
    /// Join request in a chat the bot administers.
    ChatJoinRequest,
    /// Poll state change.
    Poll,
    /// Poll answer change.
    PollAnswer,
    /// Pre-checkout query.
    PreCheckoutQuery,
    /// Shipping query.
    ShippingQuery,
    /// Message reaction change.
    MessageReaction,
    /// Anonymous message reaction count change.
    MessageReactionCount,
    /// Chat boost added or changed.
    ChatBoost,
    /// Chat boost removed.
    RemovedChatBoost,
    /// None of the modeled payloads present.
    Unknown,
}

impl UpdateKind {
    /// The wire name used in `allowed_updates`.
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateKind::Message => "message",
            UpdateKind::EditedMessage => "edited_message",
            UpdateKind::ChannelPost => "channel_post",
            UpdateKind::CallbackQuery => "callback_query",
            UpdateKind::InlineQuery => "inline_query",
            UpdateKind::ChosenInlineResult => "chosen_inline_result",
            UpdateKind::ChatMember => "chat_member",
            UpdateKind::MyChatMember => "my_chat_member",
            UpdateKind::ChatJoinRequest => "chat_join_request",
            UpdateKind::Poll => "poll",
            UpdateKind::PollAnswer => "poll_answer",
            UpdateKind::PreCheckoutQuery => "pre_checkout_query",
            UpdateKind::ShippingQuery => "shipping_query",
            UpdateKind::MessageReaction => "message_reaction",
            UpdateKind::MessageReactionCount => "message_reaction_count",
            UpdateKind::ChatBoost => "chat_boost",
            UpdateKind::RemovedChatBoost => "removed_chat_boost",
            UpdateKind::Unknown => "unknown",
        }
    }
}

/// A single event delivered by the Bot API.
///
/// Exactly one payload field is populated per update. `update_id` grows
/// monotonically per bot and drives the long-poll offset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Update {
    /// Monotonically increasing update identifier.
    pub update_id: i64,
    /// New incoming message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    /// Edit of a known message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edited_message: Option<Message>,
    /// New channel post.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_post: Option<Message>,
    /// Inline keyboard callback.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_query: Option<CallbackQuery>,
    /// Inline mode query.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_query: Option<InlineQuery>,
    /// Chosen inline result.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chosen_inline_result: Option<ChosenInlineResult>,
    /// Another user's member status changed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_member: Option<ChatMemberUpdated>,
    /// The bot's own member status changed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub my_chat_member: Option<ChatMemberUpdated>,
    /// Join request in a chat the bot administers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_join_request: Option<ChatJoinRequest>,
    /// Poll state change.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll: Option<Poll>,
    /// Poll answer change.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_answer: Option<PollAnswer>,
    /// Pre-checkout query.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_checkout_query: Option<PreCheckoutQuery>,
    /// Shipping query.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_query: Option<ShippingQuery>,
    /// Message reaction change.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_reaction: Option<MessageReactionUpdated>,
    /// Anonymous reaction count change.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_reaction_count: Option<MessageReactionCountUpdated>,
    /// Chat boost added or changed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_boost: Option<ChatBoostUpdated>,
    /// Chat boost removed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removed_chat_boost: Option<ChatBoostRemoved>,
}

impl Update {
    /// The discriminator of the populated payload.
    pub fn kind(&self) -> UpdateKind {
        if self.message.is_some() {
            UpdateKind::Message
        } else if self.edited_message.is_some() {
            UpdateKind::EditedMessage
        } else if self.channel_post.is_some() {
            UpdateKind::ChannelPost
        } else if self.callback_query.is_some() {
            UpdateKind::CallbackQuery
        } else if self.inline_query.is_some() {
            UpdateKind::InlineQuery
        } else if self.chosen_inline_result.is_some() {
            UpdateKind::ChosenInlineResult
        } else if self.chat_member.is_some() {
            UpdateKind::ChatMember
        } else if self.my_chat_member.is_some() {
            UpdateKind::MyChatMember
        } else if self.chat_join_request.is_some() {
            UpdateKind::ChatJoinRequest
        } else if self.poll.is_some() {
            UpdateKind::Poll
        } else if self.poll_answer.is_some() {
            UpdateKind::PollAnswer
        } else if self.pre_checkout_query.is_some() {
            UpdateKind::PreCheckoutQuery
        } else if self.shipping_query.is_some() {
            UpdateKind::ShippingQuery
        } else if self.message_reaction.is_some() {
            UpdateKind::MessageReaction
        } else if self.message_reaction_count.is_some() {
            UpdateKind::MessageReactionCount
        } else if self.chat_boost.is_some() {
            UpdateKind::ChatBoost
        } else if self.removed_chat_boost.is_some() {
            UpdateKind::RemovedChatBoost
        } else {
            UpdateKind::Unknown
        }
    }

    /// The message payload, for any of the message-bearing kinds.
    pub fn any_message(&self) -> Option<&Message> {
        self.message
            .as_ref()
            .or(self.edited_message.as_ref())
            .or(self.channel_post.as_ref())
    }

    /// Message text (or caption), when the payload has one.
    pub fn text(&self) -> Option<&str> {
        self.any_message().and_then(Message::text_or_caption)
    }

    /// The chat the update happened in, when there is one.
    pub fn chat(&self) -> Option<&Chat> {
        if let Some(message) = self.any_message() {
            return Some(&message.chat);
        }
        if let Some(cb) = &self.callback_query {
            return cb.message.as_ref().map(|m| &m.chat);
        }
        if let Some(member) = self.chat_member.as_ref().or(self.my_chat_member.as_ref()) {
            return Some(&member.chat);
        }
        if let Some(join) = &self.chat_join_request {
            return Some(&join.chat);
        }
        None
    }

    /// The user the update originates from, when there is one.
    pub fn from_user(&self) -> Option<&User> {
        if let Some(message) = self.any_message() {
            return message.from.as_ref();
        }
        if let Some(cb) = &self.callback_query {
            return Some(&cb.from);
        }
        if let Some(inline) = &self.inline_query {
            return Some(&inline.from);
        }
        if let Some(chosen) = &self.chosen_inline_result {
            return Some(&chosen.from);
        }
        if let Some(member) = self.chat_member.as_ref().or(self.my_chat_member.as_ref()) {
            return Some(&member.from);
        }
        if let Some(join) = &self.chat_join_request {
            return Some(&join.from);
        }
        if let Some(pre) = &self.pre_checkout_query {
            return Some(&pre.from);
        }
        if let Some(shipping) = &self.shipping_query {
            return Some(&shipping.from);
        }
        None
    }

    /// Callback data, for callback query updates.
    pub fn callback_data(&self) -> Option<&str> {
        self.callback_query.as_ref()?.data.as_deref()
    }
}

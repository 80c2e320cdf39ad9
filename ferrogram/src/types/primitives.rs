//! Users, chats, messages and query objects.

use serde::{Deserialize, Serialize};

/// A Telegram user or bot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier.
    pub id: i64,
    /// Whether this user is a bot.
    #[serde(default)]
    pub is_bot: bool,
    /// First name.
    pub first_name: String,
    /// Last name, if set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// Username, if set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// IETF language tag of the user's client.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
}

/// A chat: private, group, supergroup or channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    /// Unique identifier.
    pub id: i64,
    /// Type of the chat (`private`, `group`, `supergroup`, `channel`).
    #[serde(rename = "type")]
    pub kind: String,
    /// Title, for groups and channels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Username, for private chats and channels if available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// First name of the other party in a private chat.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
}

/// One size of a photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoSize {
    /// Identifier usable for downloading or resending.
    pub file_id: String,
    /// Stable identifier across bots.
    pub file_unique_id: String,
    /// Photo width.
    pub width: u32,
    /// Photo height.
    pub height: u32,
    /// File size in bytes, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
}

/// A message in a chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message identifier inside its chat.
    pub message_id: i64,
    /// Sender; empty for channel posts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<User>,
    /// The chat the message belongs to.
    pub chat: Chat,
    /// Unix send time.
    #[serde(default)]
    pub date: i64,
    /// Text, for text messages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Caption, for media messages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    /// Available photo sizes, for photo messages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<Vec<PhotoSize>>,
    /// The replied-to message, one level deep.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to_message: Option<Box<Message>>,
}

impl Message {
    /// Text or caption, whichever is present.
    pub fn text_or_caption(&self) -> Option<&str> {
        self.text.as_deref().or(self.caption.as_deref())
    }
}

/// An incoming callback query from an inline keyboard button.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallbackQuery {
    /// Unique query identifier.
    pub id: String,
    /// The user who pressed the button.
    pub from: User,
    /// The message the button was attached to, if available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    /// Data associated with the button.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// An incoming inline query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlineQuery {
    /// Unique query identifier.
    pub id: String,
    /// The querying user.
    pub from: User,
    /// Query text, up to 256 characters.
    pub query: String,
    /// Pagination offset controlled by the bot.
    #[serde(default)]
    pub offset: String,
}

/// An inline result the user chose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChosenInlineResult {
    /// Identifier of the chosen result.
    pub result_id: String,
    /// The user who chose it.
    pub from: User,
    /// The query that produced the result.
    pub query: String,
}

/// One answer option of a poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollOption {
    /// Option text.
    pub text: String,
    /// Number of voters.
    pub voter_count: u32,
}

/// A native poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poll {
    /// Unique poll identifier.
    pub id: String,
    /// The question.
    pub question: String,
    /// Answer options.
    pub options: Vec<PollOption>,
    /// Total number of voters.
    pub total_voter_count: u32,
    /// Whether the poll is closed.
    pub is_closed: bool,
    /// Whether the poll is anonymous.
    pub is_anonymous: bool,
}

/// A user's answer in a non-anonymous poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollAnswer {
    /// The poll being answered.
    pub poll_id: String,
    /// The answering user, if not an anonymous chat vote.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    /// Chosen option indexes; empty when the vote was retracted.
    pub option_ids: Vec<u32>,
}

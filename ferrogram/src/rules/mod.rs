//! # Standard rules
//!
//! Ready-made [`Rule`] implementations over [`Update`]: text matchers,
//! the markup pattern language, slash commands, callback payload
//! matchers and enum routers. All of them compose with the kernel's
//! `and`/`or`/`not` algebra, and the publishing rules write their parsed
//! values into the per-update [`Context`](ferrogram_core::Context) under
//! documented keys.

mod command;
mod enums;
mod markup;
mod payload;
mod text;

pub use command::{ArgError, Command};
pub use enums::{RuleEnum, TextEnum};
pub use markup::{Markup, MarkupError};
pub use payload::{PayloadEq, PayloadJsonEq};
pub use text::{HasText, Text};

use crate::types::Update;
use ferrogram_core::{Context, Rule};

/// Passes for updates originating from one of the listed user ids.
pub struct FromUser {
    ids: Vec<i64>,
}

impl FromUser {
    /// Match any of `ids`.
    pub fn new(ids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }

    /// Match a single user id.
    pub fn id(id: i64) -> Self {
        Self { ids: vec![id] }
    }
}

impl Rule<Update> for FromUser {
    async fn check(&self, event: &Update, _ctx: &Context) -> bool {
        event
            .from_user()
            .is_some_and(|user| self.ids.contains(&user.id))
    }
}

/// Passes for updates sent by a human user (a sender that is not a bot).
pub struct IsUser;

impl Rule<Update> for IsUser {
    async fn check(&self, event: &Update, _ctx: &Context) -> bool {
        event.from_user().is_some_and(|user| !user.is_bot)
    }
}

/// Passes for message updates carrying at least one photo.
pub struct HasPhoto;

impl Rule<Update> for HasPhoto {
    async fn check(&self, event: &Update, _ctx: &Context) -> bool {
        event
            .any_message()
            .and_then(|m| m.photo.as_ref())
            .is_some_and(|sizes| !sizes.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::message_update;

    #[tokio::test]
    async fn from_user_checks_sender_id() {
        let update = message_update(42, 7, "hi");
        let ctx = Context::new();
        assert!(FromUser::id(7).check(&update, &ctx).await);
        assert!(!FromUser::new([1, 2, 3]).check(&update, &ctx).await);
    }

    #[tokio::test]
    async fn is_user_rejects_bot_senders() {
        let mut update = message_update(1, 7, "hi");
        let ctx = Context::new();
        assert!(IsUser.check(&update, &ctx).await);

        if let Some(from) = update.message.as_mut().and_then(|m| m.from.as_mut()) {
            from.is_bot = true;
        }
        assert!(!IsUser.check(&update, &ctx).await);
    }

    #[tokio::test]
    async fn has_photo_requires_nonempty_sizes() {
        let mut update = message_update(1, 1, "caption");
        let ctx = Context::new();
        assert!(!HasPhoto.check(&update, &ctx).await);

        if let Some(message) = update.message.as_mut() {
            message.photo = Some(vec![crate::types::PhotoSize {
                file_id: "f".into(),
                file_unique_id: "u".into(),
                width: 10,
                height: 10,
                file_size: None,
            }]);
        }
        assert!(HasPhoto.check(&update, &ctx).await);
    }
}

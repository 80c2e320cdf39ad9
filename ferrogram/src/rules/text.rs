//! Plain text matchers.

use crate::types::Update;
use ferrogram_core::{Context, Rule};

/// Passes when the update carries any text or caption.
pub struct HasText;

impl Rule<Update> for HasText {
    async fn check(&self, event: &Update, _ctx: &Context) -> bool {
        event.text().is_some_and(|t| !t.is_empty())
    }
}

enum TextMode {
    Equals,
    StartsWith,
    Contains,
}

/// Matches the update text against fixed candidates.
///
/// Defaults to exact, case-sensitive equality against any of the
/// candidates. `starts_with` / `contains` relax the position,
/// `ignore_case` relaxes the casing.
pub struct Text {
    candidates: Vec<String>,
    mode: TextMode,
    ignore_case: bool,
}

impl Text {
    /// Exact match against one candidate.
    pub fn eq(text: impl Into<String>) -> Self {
        Self::any([text.into()])
    }

    /// Exact match against any of the candidates.
    pub fn any(candidates: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            candidates: candidates.into_iter().map(Into::into).collect(),
            mode: TextMode::Equals,
            ignore_case: false,
        }
    }

    /// Match when the text starts with any candidate.
    pub fn starts_with(self) -> Self {
        Self {
            mode: TextMode::StartsWith,
            ..self
        }
    }

    /// Match when the text contains any candidate.
    pub fn contains(self) -> Self {
        Self {
            mode: TextMode::Contains,
            ..self
        }
    }

    /// Compare case-insensitively.
    pub fn ignore_case(self) -> Self {
        Self {
            ignore_case: true,
            ..self
        }
    }

    fn matches(&self, text: &str) -> bool {
        let text = if self.ignore_case {
            text.to_lowercase()
        } else {
            text.to_string()
        };
        self.candidates.iter().any(|candidate| {
            let candidate = if self.ignore_case {
                candidate.to_lowercase()
            } else {
                candidate.clone()
            };
            match self.mode {
                TextMode::Equals => text == candidate,
                TextMode::StartsWith => text.starts_with(&candidate),
                TextMode::Contains => text.contains(&candidate),
            }
        })
    }
}

impl Rule<Update> for Text {
    async fn check(&self, event: &Update, _ctx: &Context) -> bool {
        event.text().is_some_and(|t| self.matches(t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::message_update;

    #[tokio::test]
    async fn exact_match_is_case_sensitive_by_default() {
        let ctx = Context::new();
        let update = message_update(1, 1, "Hello");
        assert!(Text::eq("Hello").check(&update, &ctx).await);
        assert!(!Text::eq("hello").check(&update, &ctx).await);
        assert!(Text::eq("hello").ignore_case().check(&update, &ctx).await);
    }

    #[tokio::test]
    async fn positional_modes() {
        let ctx = Context::new();
        let update = message_update(1, 1, "good morning all");
        assert!(Text::eq("good").starts_with().check(&update, &ctx).await);
        assert!(Text::eq("morning").contains().check(&update, &ctx).await);
        assert!(!Text::eq("morning").starts_with().check(&update, &ctx).await);
    }

    #[tokio::test]
    async fn any_matches_any_candidate() {
        let ctx = Context::new();
        let update = message_update(1, 1, "stop");
        assert!(Text::any(["halt", "stop"]).check(&update, &ctx).await);
        assert!(!Text::any(["halt", "cease"]).check(&update, &ctx).await);
    }
}

//! Enum routers: match one of several variants and publish which.

use crate::types::Update;
use ferrogram_core::{BoxRule, Context, DynRule, Rule};

/// Matches the update text against a closed set of variants and publishes
/// the matched variant under `enum_text`.
pub struct TextEnum {
    variants: Vec<String>,
    ignore_case: bool,
}

impl TextEnum {
    /// Match any of `variants`.
    pub fn new(variants: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            variants: variants.into_iter().map(Into::into).collect(),
            ignore_case: false,
        }
    }

    /// Compare case-insensitively; the canonical variant is published.
    pub fn ignore_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }
}

impl Rule<Update> for TextEnum {
    async fn check(&self, event: &Update, ctx: &Context) -> bool {
        let Some(text) = event.text() else {
            return false;
        };
        let found = self.variants.iter().find(|variant| {
            if self.ignore_case {
                variant.eq_ignore_ascii_case(text)
            } else {
                variant.as_str() == text
            }
        });
        match found {
            Some(variant) => {
                ctx.set("enum_text", variant.clone());
                true
            }
            None => false,
        }
    }
}

/// Tries tagged sub-rules in order; the first passing variant commits its
/// context writes and publishes its tag under `enum_variant`.
///
/// Like `or`, a rejected variant's writes are rolled back before the next
/// variant runs.
pub struct RuleEnum {
    key: String,
    variants: Vec<(String, BoxRule<Update>)>,
}

impl Default for RuleEnum {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleEnum {
    /// An empty router; an empty router never passes.
    pub fn new() -> Self {
        Self {
            key: "enum_variant".to_string(),
            variants: Vec::new(),
        }
    }

    /// Publish the winning tag under `key` instead of `enum_variant`.
    pub fn publish_as(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Add a tagged variant.
    pub fn variant(mut self, tag: impl Into<String>, rule: impl Rule<Update>) -> Self {
        self.variants.push((tag.into(), rule.boxed()));
        self
    }
}

impl Rule<Update> for RuleEnum {
    async fn check(&self, event: &Update, ctx: &Context) -> bool {
        for (tag, rule) in &self.variants {
            let snapshot = ctx.snapshot();
            if rule.check_dyn(event, ctx).await {
                ctx.set(self.key.clone(), tag.clone());
                return true;
            }
            ctx.restore(snapshot);
        }
        false
    }

    fn required_nodes(&self) -> Vec<ferrogram_core::NodeId> {
        self.variants
            .iter()
            .flat_map(|(_, rule)| rule.required_nodes_dyn())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{Markup, Text};
    use crate::testing::message_update;

    #[tokio::test]
    async fn text_enum_publishes_canonical_variant() {
        let rule = TextEnum::new(["Yes", "No"]).ignore_case();
        let ctx = Context::new();

        assert!(rule.check(&message_update(1, 1, "yes"), &ctx).await);
        assert_eq!(ctx.get::<String>("enum_text").unwrap().as_str(), "Yes");
        assert!(!rule.check(&message_update(1, 1, "maybe"), &ctx).await);
    }

    #[tokio::test]
    async fn rule_enum_takes_first_passing_variant() {
        let rule = RuleEnum::new()
            .variant("greeting", Text::any(["hi", "hello"]))
            .variant("number", Markup::new("<n:int>").unwrap());
        let ctx = Context::new();

        assert!(rule.check(&message_update(1, 1, "hello"), &ctx).await);
        assert_eq!(ctx.get::<String>("enum_variant").unwrap().as_str(), "greeting");

        let ctx = Context::new();
        assert!(rule.check(&message_update(1, 1, "42"), &ctx).await);
        assert_eq!(ctx.get::<String>("enum_variant").unwrap().as_str(), "number");
        assert_eq!(*ctx.get::<i64>("n").unwrap(), 42);
    }

    #[tokio::test]
    async fn losing_variant_writes_are_rolled_back() {
        // First variant publishes then fails its final clause.
        let poison = (|_: &Update, ctx: &Context| {
            ctx.set("leak", 1i32);
            false
        })
        .boxed();
        let rule = RuleEnum::new()
            .variant("poison", poison)
            .variant("plain", Text::eq("ok"));
        let ctx = Context::new();

        assert!(rule.check(&message_update(1, 1, "ok"), &ctx).await);
        assert!(!ctx.contains("leak"));
        assert_eq!(ctx.get::<String>("enum_variant").unwrap().as_str(), "plain");
    }
}

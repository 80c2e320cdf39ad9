//! Callback payload matchers.

use crate::types::Update;
use ferrogram_core::{Context, Rule};
use serde_json::Value;

/// Passes when the callback query's data equals a fixed string.
pub struct PayloadEq {
    expected: String,
}

impl PayloadEq {
    /// Match exactly `expected`.
    pub fn new(expected: impl Into<String>) -> Self {
        Self {
            expected: expected.into(),
        }
    }
}

impl Rule<Update> for PayloadEq {
    async fn check(&self, event: &Update, _ctx: &Context) -> bool {
        event.callback_data() == Some(self.expected.as_str())
    }
}

/// Passes when the callback data is JSON and the given object is a
/// (recursive) subset of it.
///
/// `{"action": "buy"}` matches `{"action": "buy", "item": 3}` but not
/// `{"action": "sell"}`. On a match the parsed payload is published under
/// `payload` as a [`Value`].
pub struct PayloadJsonEq {
    subset: Value,
}

impl PayloadJsonEq {
    /// Match payloads containing `subset`.
    pub fn new(subset: Value) -> Self {
        Self { subset }
    }
}

fn is_subset(subset: &Value, of: &Value) -> bool {
    match (subset, of) {
        (Value::Object(sub), Value::Object(sup)) => sub
            .iter()
            .all(|(key, value)| sup.get(key).is_some_and(|found| is_subset(value, found))),
        (a, b) => a == b,
    }
}

impl Rule<Update> for PayloadJsonEq {
    async fn check(&self, event: &Update, ctx: &Context) -> bool {
        let Some(data) = event.callback_data() else {
            return false;
        };
        let Ok(payload) = serde_json::from_str::<Value>(data) else {
            return false;
        };
        if is_subset(&self.subset, &payload) {
            ctx.set("payload", payload);
            true
        } else {
            false
        }
    }
}

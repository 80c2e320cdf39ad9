//! Slash command matching.

use crate::types::Update;
use ferrogram_core::{Context, Rule};
use thiserror::Error;

/// Why a command's arguments failed to parse.
#[derive(Error, Debug, PartialEq)]
pub enum ArgError {
    /// A declared argument was not supplied.
    #[error("missing argument `{name}`")]
    Missing {
        /// The argument's declared name.
        name: &'static str,
    },

    /// A supplied value failed its validator.
    #[error("invalid value `{value}` for argument `{name}`")]
    Invalid {
        /// The argument's declared name.
        name: &'static str,
        /// The rejected token.
        value: String,
    },

    /// More tokens were supplied than arguments declared.
    #[error("expected {expected} arguments, got {got}")]
    TooMany {
        /// Declared argument count.
        expected: usize,
        /// Supplied token count.
        got: usize,
    },
}

type Validator = Box<dyn Fn(&str) -> bool + Send + Sync>;

struct ArgSpec {
    name: &'static str,
    validator: Option<Validator>,
}

/// Matches `/name` (optionally `/name@botusername`) and parses the rest
/// of the line into arguments with a quote-aware tokenizer.
///
/// On a match the rule publishes `command` (the matched name, without the
/// slash), `args` (all tokens as `Vec<String>`), and each declared
/// argument under its own name as a `String`. Single- and double-quoted
/// tokens may contain spaces; the quotes are stripped.
pub struct Command {
    names: Vec<String>,
    username: Option<String>,
    args: Vec<ArgSpec>,
    allow_extra: bool,
}

impl Command {
    /// Match `/name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            names: vec![name.into()],
            username: None,
            args: Vec::new(),
            allow_extra: false,
        }
    }

    /// Match any of several command names (aliases).
    pub fn any(names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            username: None,
            args: Vec::new(),
            allow_extra: false,
        }
    }

    /// Accept (and require, in groups) a `@username` suffix.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Declare a positional argument published under `name`.
    pub fn arg(mut self, name: &'static str) -> Self {
        self.args.push(ArgSpec {
            name,
            validator: None,
        });
        self
    }

    /// Declare a validated positional argument.
    pub fn arg_with(
        mut self,
        name: &'static str,
        validator: impl Fn(&str) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.args.push(ArgSpec {
            name,
            validator: Some(Box::new(validator)),
        });
        self
    }

    /// Tolerate extra tokens beyond the declared arguments.
    pub fn allow_extra(mut self) -> Self {
        self.allow_extra = true;
        self
    }

    /// Parse `text` without a context: the matched name and tokens.
    pub fn parse(&self, text: &str) -> Option<Result<(String, Vec<String>), ArgError>> {
        let mut parts = text.splitn(2, char::is_whitespace);
        let head = parts.next()?;
        let rest = parts.next().unwrap_or("");

        let head = head.strip_prefix('/')?;
        let (name, at) = match head.split_once('@') {
            Some((name, at)) => (name, Some(at)),
            None => (head, None),
        };
        if !self.names.iter().any(|n| n == name) {
            return None;
        }
        if let (Some(at), Some(expected)) = (at, &self.username) {
            if !at.eq_ignore_ascii_case(expected) {
                return None;
            }
        } else if at.is_some() && self.username.is_none() {
            // Addressed to some bot, but we don't know our own name.
            return None;
        }

        let tokens = tokenize(rest);
        Some(self.validate(name, tokens))
    }

    fn validate(
        &self,
        name: &str,
        tokens: Vec<String>,
    ) -> Result<(String, Vec<String>), ArgError> {
        if tokens.len() > self.args.len() && !self.allow_extra && !self.args.is_empty() {
            return Err(ArgError::TooMany {
                expected: self.args.len(),
                got: tokens.len(),
            });
        }
        for (i, spec) in self.args.iter().enumerate() {
            let token = tokens.get(i).ok_or(ArgError::Missing { name: spec.name })?;
            if let Some(validator) = &spec.validator {
                if !validator(token) {
                    return Err(ArgError::Invalid {
                        name: spec.name,
                        value: token.clone(),
                    });
                }
            }
        }
        Ok((name.to_string(), tokens))
    }
}

fn tokenize(rest: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for c in rest.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '\'' || c == '"' => quote = Some(c),
            None if c.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            None => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

impl Rule<Update> for Command {
    async fn check(&self, event: &Update, ctx: &Context) -> bool {
        let Some(text) = event.text() else {
            return false;
        };
        match self.parse(text) {
            Some(Ok((name, tokens))) => {
                for (i, spec) in self.args.iter().enumerate() {
                    if let Some(token) = tokens.get(i) {
                        ctx.set(spec.name.to_string(), token.clone());
                    }
                }
                ctx.set("command", name);
                ctx.set("args", tokens);
                true
            }
            Some(Err(err)) => {
                tracing::debug!(command = %text, error = %err, "command arguments rejected");
                false
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::message_update;

    #[tokio::test]
    async fn matches_and_publishes_args() {
        let rule = Command::new("give").arg("amount").arg("who");
        let ctx = Context::new();
        let update = message_update(1, 1, "/give 5 alice");

        assert!(rule.check(&update, &ctx).await);
        assert_eq!(ctx.get::<String>("command").unwrap().as_str(), "give");
        assert_eq!(ctx.get::<String>("amount").unwrap().as_str(), "5");
        assert_eq!(ctx.get::<String>("who").unwrap().as_str(), "alice");
        assert_eq!(
            *ctx.get::<Vec<String>>("args").unwrap(),
            vec!["5".to_string(), "alice".to_string()]
        );
    }

    #[tokio::test]
    async fn quoted_tokens_keep_spaces() {
        let rule = Command::new("echo").arg("text");
        let ctx = Context::new();
        assert!(
            rule.check(&message_update(1, 1, "/echo 'one two'"), &ctx)
                .await
        );
        assert_eq!(ctx.get::<String>("text").unwrap().as_str(), "one two");
    }

    #[tokio::test]
    async fn username_suffix_is_checked() {
        let rule = Command::new("start").username("ferro_bot");
        let ctx = Context::new();
        assert!(
            rule.check(&message_update(1, 1, "/start@ferro_bot"), &ctx)
                .await
        );
        assert!(
            !rule
                .check(&message_update(1, 1, "/start@other_bot"), &ctx)
                .await
        );
        assert!(rule.check(&message_update(1, 1, "/start"), &ctx).await);
    }

    #[tokio::test]
    async fn validator_rejects_bad_values() {
        let rule = Command::new("give").arg_with("amount", |t| t.parse::<u32>().is_ok());
        let ctx = Context::new();
        assert!(rule.check(&message_update(1, 1, "/give 5"), &ctx).await);
        assert!(!rule.check(&message_update(1, 1, "/give lots"), &ctx).await);
    }

    #[test]
    fn parse_reports_arity_errors() {
        let rule = Command::new("give").arg("amount");
        assert_eq!(
            rule.parse("/give").unwrap().unwrap_err(),
            ArgError::Missing { name: "amount" }
        );
        assert_eq!(
            rule.parse("/give 1 2").unwrap().unwrap_err(),
            ArgError::TooMany {
                expected: 1,
                got: 2
            }
        );
        assert!(rule.parse("/steal 1").is_none());
    }
}

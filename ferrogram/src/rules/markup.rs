//! The markup pattern language.
//!
//! A markup pattern is literal text with `<name:kind>` placeholders, e.g.
//! `/give <amount:int> to <who:word>`. The pattern compiles to an anchored
//! regex; on a match the captured pieces are converted per their kind and
//! published into the context under their names.
//!
//! Kinds and the types they publish:
//!
//! | kind       | matches            | publishes |
//! |------------|--------------------|-----------|
//! | `int`      | `-?\d+`            | `i64`     |
//! | `float`    | `-?\d+(\.\d+)?`    | `f64`     |
//! | `char`     | one non-space char | `char`    |
//! | `word`     | `\S+`              | `String`  |
//! | `sentence` | `'...'` or `\S+`   | `String`  |
//! | `str` (default) | `.+` lazy     | `String`  |
//!
//! A `sentence` capture quoted with single quotes has the quotes stripped
//! and may contain spaces.

use crate::types::Update;
use ferrogram_core::{Context, Rule};
use regex::Regex;
use thiserror::Error;

/// A markup pattern failed to compile.
#[derive(Error, Debug)]
pub enum MarkupError {
    /// A `<...>` placeholder was malformed.
    #[error("malformed placeholder `{0}`")]
    BadPlaceholder(String),

    /// An unknown capture kind was named.
    #[error("unknown capture kind `{kind}` in placeholder `{name}`")]
    UnknownKind {
        /// Placeholder name.
        name: String,
        /// The offending kind.
        kind: String,
    },

    /// Two placeholders share a name.
    #[error("duplicate capture name `{0}`")]
    DuplicateName(String),

    /// The generated regex failed to compile.
    #[error("pattern did not compile: {0}")]
    Regex(#[from] regex::Error),
}

#[derive(Clone, Copy, PartialEq)]
enum Kind {
    Int,
    Float,
    Char,
    Word,
    Sentence,
    Str,
}

impl Kind {
    fn parse(name: &str, raw: &str) -> Result<Self, MarkupError> {
        match raw {
            "int" => Ok(Kind::Int),
            "float" => Ok(Kind::Float),
            "char" => Ok(Kind::Char),
            "word" => Ok(Kind::Word),
            "sentence" => Ok(Kind::Sentence),
            "str" => Ok(Kind::Str),
            other => Err(MarkupError::UnknownKind {
                name: name.to_string(),
                kind: other.to_string(),
            }),
        }
    }

    fn fragment(self) -> &'static str {
        match self {
            Kind::Int => r"-?\d+",
            Kind::Float => r"-?\d+(?:\.\d+)?",
            Kind::Char => r"\S",
            Kind::Word => r"\S+",
            Kind::Sentence => r"'[^']*'|\S+",
            Kind::Str => r".+?",
        }
    }
}

struct Capture {
    name: String,
    kind: Kind,
}

/// A compiled markup pattern rule.
pub struct Markup {
    regex: Regex,
    captures: Vec<Capture>,
}

impl Markup {
    /// Compile a pattern.
    pub fn new(pattern: &str) -> Result<Self, MarkupError> {
        let mut regex = String::from("^");
        let mut captures = Vec::new();
        let mut rest = pattern;

        while let Some(open) = rest.find('<') {
            regex.push_str(&regex::escape(&rest[..open]));
            let tail = &rest[open + 1..];
            let close = tail
                .find('>')
                .ok_or_else(|| MarkupError::BadPlaceholder(rest[open..].to_string()))?;
            let body = &tail[..close];

            let (name, kind) = match body.split_once(':') {
                Some((name, kind)) => (name, Kind::parse(name, kind)?),
                None => (body, Kind::Str),
            };
            if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(MarkupError::BadPlaceholder(format!("<{body}>")));
            }
            if captures.iter().any(|c: &Capture| c.name == name) {
                return Err(MarkupError::DuplicateName(name.to_string()));
            }

            regex.push_str(&format!("(?P<{name}>{})", kind.fragment()));
            captures.push(Capture {
                name: name.to_string(),
                kind,
            });
            rest = &tail[close + 1..];
        }
        regex.push_str(&regex::escape(rest));
        regex.push('$');

        Ok(Self {
            regex: Regex::new(&regex)?,
            captures,
        })
    }

    fn publish(&self, text: &str, ctx: &Context) -> bool {
        let Some(found) = self.regex.captures(text) else {
            return false;
        };
        for capture in &self.captures {
            let Some(value) = found.name(&capture.name) else {
                return false;
            };
            let raw = value.as_str();
            match capture.kind {
                Kind::Int => match raw.parse::<i64>() {
                    Ok(n) => ctx.set(capture.name.clone(), n),
                    Err(_) => return false,
                },
                Kind::Float => match raw.parse::<f64>() {
                    Ok(n) => ctx.set(capture.name.clone(), n),
                    Err(_) => return false,
                },
                Kind::Char => {
                    let mut chars = raw.chars();
                    match (chars.next(), chars.next()) {
                        (Some(c), None) => ctx.set(capture.name.clone(), c),
                        _ => return false,
                    }
                }
                Kind::Sentence => {
                    let stripped = raw
                        .strip_prefix('\'')
                        .and_then(|s| s.strip_suffix('\''))
                        .unwrap_or(raw);
                    ctx.set(capture.name.clone(), stripped.to_string());
                }
                Kind::Word | Kind::Str => ctx.set(capture.name.clone(), raw.to_string()),
            }
        }
        true
    }
}

impl Rule<Update> for Markup {
    async fn check(&self, event: &Update, ctx: &Context) -> bool {
        event.text().is_some_and(|text| self.publish(text, ctx))
    }
}

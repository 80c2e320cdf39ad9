//! # ferrogram
//!
//! An async Telegram bot framework built around four ideas:
//!
//! - **Views and rules.** Updates are routed to named [`View`]s; inside a
//!   view, handlers are gated by composable async [`Rule`]s with
//!   short-circuit `and`/`or`/`not` and transactional context writes.
//! - **Nodes.** Handlers and rules declare typed dependencies on a
//!   validated dependency graph; values are built per call, per event or
//!   per process, with teardown in reverse order.
//! - **Waiters.** A handler can pause and claim a future update ("the
//!   next message from this user"), which makes multi-step conversations
//!   plain sequential code.
//! - **Auto-reply.** Handler return values (`String`, `Vec<String>`,
//!   [`Reply`]) are routed back to the originating chat by a
//!   [`ReplyPolicy`].
//!
//! The crate splits into a runtime-free kernel ([`ferrogram_core`],
//! re-exported under [`kernel`]) and this engine crate: the Bot API client
//! ([`api`]), update sources ([`sources`]), the dispatch machinery
//! ([`dispatch`]), the node resolver ([`nodes`]), the waiter machine
//! ([`waiters`]) and the outer run loop ([`runner`]).
//!
//! ## Quick start
//!
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use ferrogram::prelude::*;
//!
//! ferrogram::logging::init();
//! let bot = Bot::new(BotConfig::from_env()?)?;
//!
//! let dispatcher = Dispatcher::new().view(
//!     View::message()
//!         .on(Command::new("ping"), |_cx: HandlerCx| async { "pong" })
//!         .on(
//!             Markup::new("/sum <a:int> <b:int>")?,
//!             |cx: HandlerCx| async move {
//!                 let a = cx.get::<i64>("a").unwrap_or_default();
//!                 let b = cx.get::<i64>("b").unwrap_or_default();
//!                 format!("{}", *a + *b)
//!             },
//!         ),
//! );
//!
//! bot.run(dispatcher).await?;
//! # Ok(())
//! # }
//! ```
//!
//! [`Rule`]: ferrogram_core::Rule
//! [`View`]: dispatch::View
//! [`Reply`]: dispatch::Reply
//! [`ReplyPolicy`]: dispatch::ReplyPolicy

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

pub mod api;
pub mod bot;
pub mod config;
pub mod dispatch;
pub mod logging;
pub mod nodes;
pub mod rules;
pub mod runner;
pub mod sources;
pub mod testing;
pub mod types;
pub mod waiters;

/// The runtime-free kernel crate, re-exported.
pub use ferrogram_core as kernel;

pub use api::{Api, ApiError, Token};
pub use bot::Bot;
pub use config::{BotConfig, ConfigError};
pub use dispatch::{Dispatcher, HandlerCx, Reply, ReplyPolicy, View};
pub use ferrogram_core::{BoxError, Context, GlobalCtx, Rule};
pub use runner::LoopWrapper;

/// Everything a typical bot needs in scope.
pub mod prelude {
    pub use crate::api::{Api, ApiError, Token};
    pub use crate::bot::Bot;
    pub use crate::config::BotConfig;
    pub use crate::dispatch::{
        Dispatcher, ErrorHandlerEntry, HandlerCx, HandlerEntry, Middleware, Reply, ReplyPolicy,
        View, extract,
    };
    pub use crate::rules::{
        Command, FromUser, HasPhoto, HasText, IsUser, Markup, PayloadEq, PayloadJsonEq, RuleEnum,
        Text, TextEnum,
    };
    pub use crate::runner::LoopWrapper;
    pub use crate::types::{Message, ParseMode, Update, UpdateKind, User};
    pub use crate::waiters::{
        CALLBACK_QUERY_FROM_USER, MESSAGE_FROM_USER, MESSAGE_IN_CHAT, WaitOptions, WaitResult,
        WaiterMachine,
    };
    pub use ferrogram_core::{
        BoxError, Context, GlobalCtx, NodeDescriptor, NodeGraphBuilder, NodeParts, Rule, Scope,
    };
}

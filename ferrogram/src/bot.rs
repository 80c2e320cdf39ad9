//! The top-level facade tying config, API and dispatcher together.

use crate::{
    api::{Api, Token, TokenError},
    config::BotConfig,
    dispatch::{Dispatcher, ReplyPolicy},
    runner::LoopWrapper,
    sources::{PollingError, WebhookSink},
    types::Update,
};
use tokio::sync::mpsc;

/// A configured bot: an [`Api`] handle plus its [`BotConfig`].
///
/// ```no_run
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// use ferrogram::prelude::*;
///
/// let bot = Bot::new(BotConfig::from_env()?)?;
/// let dispatcher = Dispatcher::new()
///     .view(View::message().on(Command::new("ping"), |_cx: HandlerCx| async { "pong" }));
/// bot.run(dispatcher).await?;
/// # Ok(())
/// # }
/// ```
pub struct Bot {
    api: Api,
    config: BotConfig,
}

impl Bot {
    /// Validate the token and build the API handle.
    pub fn new(config: BotConfig) -> Result<Self, TokenError> {
        let token = Token::new(config.token.clone())?;
        let api = match &config.base_url {
            Some(base) => Api::with_base(token, base.clone()),
            None => Api::new(token),
        };
        Ok(Self { api, config })
    }

    /// The Bot API handle.
    pub fn api(&self) -> &Api {
        &self.api
    }

    /// The configuration.
    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    /// A runner over `dispatcher` with Ctrl-C handling enabled.
    ///
    /// The config's default parse mode is applied unless the dispatcher
    /// already carries a policy with one.
    pub fn runner(&self, mut dispatcher: Dispatcher) -> LoopWrapper {
        if let Some(mode) = self.config.parse_mode_default
            && dispatcher.policy().parse_mode.is_none()
        {
            dispatcher = dispatcher.with_policy(ReplyPolicy::with_parse_mode(mode));
        }
        LoopWrapper::new(dispatcher).enable_ctrl_c()
    }

    /// Long-poll with this bot's config until stopped.
    pub async fn run(self, dispatcher: Dispatcher) -> Result<(), PollingError> {
        let polling = self.config.polling();
        self.runner(dispatcher).run_polling(self.api, polling).await
    }

    /// A webhook sink guarded by the config's secret, plus the update
    /// stream to feed into [`LoopWrapper::run_with_updates`].
    pub fn webhook_sink(&self, buffer: usize) -> (WebhookSink, mpsc::Receiver<Update>) {
        WebhookSink::new(self.config.webhook_secret.clone(), buffer)
    }
}

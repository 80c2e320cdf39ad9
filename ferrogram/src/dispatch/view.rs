//! Views: named routing tables of rule-gated handlers.

use crate::{
    api::Api,
    dispatch::{
        handler::{DynHandler, Handler, HandlerCx},
        middleware::{DynMiddleware, Middleware},
        reply::{Reply, ReplyPolicy},
    },
    nodes::NodeResolver,
    types::{Update, UpdateKind},
    waiters::WaiterMachine,
};
use ferrogram_core::{BoxError, BoxRule, Context, DynRule, GlobalCtx, NodeId, Rule};
use std::{any::Any, sync::Arc};

/// One rule-gated handler registration.
pub struct HandlerEntry {
    rule: Option<BoxRule<Update>>,
    needs: Vec<NodeId>,
    presets: Vec<(String, Arc<dyn Any + Send + Sync>)>,
    handler: Arc<dyn DynHandler>,
    is_final: bool,
}

impl HandlerEntry {
    /// An entry with no rule: it matches every update reaching it.
    pub fn new(handler: impl Handler) -> Self {
        Self {
            rule: None,
            needs: Vec::new(),
            presets: Vec::new(),
            handler: Arc::new(handler),
            is_final: true,
        }
    }

    /// Gate the entry behind `rule`. Multiple calls AND together.
    pub fn rule(mut self, rule: impl Rule<Update>) -> Self {
        self.rule = Some(match self.rule.take() {
            Some(existing) => existing.and(rule).boxed(),
            None => rule.boxed(),
        });
        self
    }

    /// Nodes the handler needs resolved beyond what its rule declares.
    pub fn needs(mut self, ids: impl IntoIterator<Item = &'static str>) -> Self {
        self.needs.extend(ids.into_iter().map(NodeId));
        self
    }

    /// Seed the context with `value` under `key` when this entry's rule
    /// passes, before the handler runs.
    pub fn preset<T: Any + Send + Sync>(mut self, key: impl Into<String>, value: T) -> Self {
        self.presets.push((key.into(), Arc::new(value)));
        self
    }

    /// Let later entries run even after this one handles the update.
    pub fn passthrough(mut self) -> Self {
        self.is_final = false;
        self
    }
}

/// A typed error handler registration.
pub struct ErrorHandlerEntry {
    matches: Box<dyn Fn(&BoxError) -> bool + Send + Sync>,
    rule: Option<BoxRule<Update>>,
    handler: Arc<dyn DynHandler>,
}

impl ErrorHandlerEntry {
    /// Handle errors downcastable to `E`.
    pub fn for_type<E>(handler: impl Handler) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            matches: Box::new(|err| err.downcast_ref::<E>().is_some()),
            rule: None,
            handler: Arc::new(handler),
        }
    }

    /// Handle every error.
    pub fn catch_all(handler: impl Handler) -> Self {
        Self {
            matches: Box::new(|_| true),
            rule: None,
            handler: Arc::new(handler),
        }
    }

    /// Additionally gate the entry behind a rule over the update.
    pub fn rule(mut self, rule: impl Rule<Update>) -> Self {
        self.rule = Some(match self.rule.take() {
            Some(existing) => existing.and(rule).boxed(),
            None => rule.boxed(),
        });
        self
    }
}

/// A named routing table.
///
/// The dispatcher offers each update to its views in registration order;
/// the first view whose filter passes processes the update. Within the
/// view, entries are tried top to bottom: an entry whose rule passes has
/// its nodes resolved and its handler called. Entries are final by
/// default - the first handled entry ends dispatch unless it was
/// registered as [`passthrough`](HandlerEntry::passthrough).
pub struct View {
    name: &'static str,
    filter: Option<BoxRule<Update>>,
    middlewares: Vec<Arc<dyn DynMiddleware>>,
    handlers: Vec<HandlerEntry>,
    error_handlers: Vec<ErrorHandlerEntry>,
}

impl View {
    /// An unfiltered view.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            filter: None,
            middlewares: Vec::new(),
            handlers: Vec::new(),
            error_handlers: Vec::new(),
        }
    }

    /// A view accepting only updates of `kind`.
    pub fn of_kind(name: &'static str, kind: UpdateKind) -> Self {
        Self::new(name).filter(move |update: &Update, _: &Context| update.kind() == kind)
    }

    /// A view over new incoming messages.
    pub fn message() -> Self {
        Self::of_kind("message", UpdateKind::Message)
    }

    /// A view over edited messages.
    pub fn edited_message() -> Self {
        Self::of_kind("edited_message", UpdateKind::EditedMessage)
    }

    /// A view over channel posts.
    pub fn channel_post() -> Self {
        Self::of_kind("channel_post", UpdateKind::ChannelPost)
    }

    /// A view over callback queries.
    pub fn callback_query() -> Self {
        Self::of_kind("callback_query", UpdateKind::CallbackQuery)
    }

    /// A view over inline queries.
    pub fn inline_query() -> Self {
        Self::of_kind("inline_query", UpdateKind::InlineQuery)
    }

    /// A view over member status changes of other users.
    pub fn chat_member() -> Self {
        Self::of_kind("chat_member", UpdateKind::ChatMember)
    }

    /// A view over join requests.
    pub fn chat_join_request() -> Self {
        Self::of_kind("chat_join_request", UpdateKind::ChatJoinRequest)
    }

    /// A catch-all view.
    pub fn any() -> Self {
        Self::new("any")
    }

    /// The view's name, for logs.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Gate the whole view behind `rule`. Multiple calls AND together.
    pub fn filter(mut self, rule: impl Rule<Update>) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(rule).boxed(),
            None => rule.boxed(),
        });
        self
    }

    /// Attach a middleware. Pre hooks run in registration order, post
    /// hooks in reverse.
    pub fn middleware(mut self, middleware: impl Middleware) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// Register a rule-gated handler.
    pub fn on(self, rule: impl Rule<Update>, handler: impl Handler) -> Self {
        self.entry(HandlerEntry::new(handler).rule(rule))
    }

    /// Register an unconditional handler (typically last).
    pub fn fallback(self, handler: impl Handler) -> Self {
        self.entry(HandlerEntry::new(handler))
    }

    /// Register a prepared entry.
    pub fn entry(mut self, entry: HandlerEntry) -> Self {
        self.handlers.push(entry);
        self
    }

    /// Register an error handler for errors of type `E`.
    pub fn on_error<E>(mut self, handler: impl Handler) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.error_handlers.push(ErrorHandlerEntry::for_type::<E>(handler));
        self
    }

    /// Register a catch-all error handler (tried after typed ones only if
    /// registered after them).
    pub fn on_any_error(mut self, handler: impl Handler) -> Self {
        self.error_handlers.push(ErrorHandlerEntry::catch_all(handler));
        self
    }

    /// Register a prepared error entry.
    pub fn error_entry(mut self, entry: ErrorHandlerEntry) -> Self {
        self.error_handlers.push(entry);
        self
    }

    /// Whether this view's filter accepts `update`. A passing filter's
    /// context writes commit; a failing one's are rolled back.
    pub(crate) async fn accepts(&self, update: &Update, ctx: &Context) -> bool {
        let Some(filter) = &self.filter else {
            return true;
        };
        let snapshot = ctx.snapshot();
        if filter.check_dyn(update, ctx).await {
            true
        } else {
            ctx.restore(snapshot);
            false
        }
    }

    /// Run the update through this view. Returns whether any handler ran.
    #[allow(clippy::too_many_arguments)]
    pub(crate) async fn process(
        &self,
        update: &Update,
        api: &Api,
        ctx: &Context,
        resolver: &NodeResolver,
        waiters: &Arc<WaiterMachine>,
        global: &GlobalCtx,
        policy: &ReplyPolicy,
    ) -> bool {
        for middleware in &self.middlewares {
            if !middleware.pre_dyn(update, ctx).await {
                tracing::debug!(view = self.name, update_id = update.update_id, "vetoed by middleware");
                return false;
            }
        }

        let mut replies: Vec<Reply> = Vec::new();
        let mut handled = false;

        for entry in &self.handlers {
            let snapshot = ctx.snapshot();

            // Nodes the rule declared, then the rule itself.
            let rule_frame = match &entry.rule {
                Some(rule) => {
                    let wanted = rule.required_nodes_dyn();
                    let frame = match resolver.resolve(&wanted, update, api, ctx).await {
                        Ok(frame) => frame,
                        Err(err) => {
                            ctx.restore(snapshot);
                            self.dispatch_error(err.into(), update, api, ctx, waiters, global, policy)
                                .await;
                            if entry.is_final {
                                handled = true;
                                break;
                            }
                            continue;
                        }
                    };
                    if !rule.check_dyn(update, ctx).await {
                        ctx.restore(snapshot);
                        frame.close().await;
                        continue;
                    }
                    Some(frame)
                }
                None => None,
            };

            // Nodes the handler declared beyond its rule.
            let needs_frame = if entry.needs.is_empty() {
                None
            } else {
                match resolver.resolve(&entry.needs, update, api, ctx).await {
                    Ok(frame) => Some(frame),
                    Err(err) => {
                        ctx.restore(snapshot);
                        if let Some(frame) = rule_frame {
                            frame.close().await;
                        }
                        self.dispatch_error(err.into(), update, api, ctx, waiters, global, policy)
                            .await;
                        if entry.is_final {
                            handled = true;
                            break;
                        }
                        continue;
                    }
                }
            };

            for (key, value) in &entry.presets {
                ctx.set_slot(key.clone(), Arc::clone(value));
            }

            let cx = HandlerCx {
                update: update.clone(),
                api: api.clone(),
                ctx: ctx.clone(),
                global: global.clone(),
                waiters: Arc::clone(waiters),
                error: None,
            };
            let outcome = entry.handler.call_dyn(cx).await;

            if let Some(frame) = needs_frame {
                frame.close().await;
            }
            if let Some(frame) = rule_frame {
                frame.close().await;
            }

            handled = true;
            match outcome {
                Ok(reply) => {
                    if let Err(err) = policy.apply(reply.clone(), update, api).await {
                        tracing::error!(view = self.name, error = %err, "reply delivery failed");
                    }
                    replies.push(reply);
                }
                Err(err) => {
                    self.dispatch_error(err, update, api, ctx, waiters, global, policy)
                        .await;
                }
            }

            if entry.is_final {
                break;
            }
        }

        for middleware in self.middlewares.iter().rev() {
            middleware.post_dyn(update, ctx, &replies).await;
        }
        handled
    }

    #[allow(clippy::too_many_arguments)]
    async fn dispatch_error(
        &self,
        err: BoxError,
        update: &Update,
        api: &Api,
        ctx: &Context,
        waiters: &Arc<WaiterMachine>,
        global: &GlobalCtx,
        policy: &ReplyPolicy,
    ) {
        for entry in &self.error_handlers {
            if !(entry.matches)(&err) {
                continue;
            }
            if let Some(rule) = &entry.rule {
                let snapshot = ctx.snapshot();
                if !rule.check_dyn(update, ctx).await {
                    ctx.restore(snapshot);
                    continue;
                }
            }

            let cx = HandlerCx {
                update: update.clone(),
                api: api.clone(),
                ctx: ctx.clone(),
                global: global.clone(),
                waiters: Arc::clone(waiters),
                error: Some(Arc::new(err)),
            };
            match entry.handler.call_dyn(cx).await {
                Ok(reply) => {
                    if let Err(send_err) = policy.apply(reply, update, api).await {
                        tracing::error!(view = self.name, error = %send_err, "error reply delivery failed");
                    }
                }
                Err(inner) => {
                    tracing::error!(view = self.name, error = %inner, "error handler itself failed");
                }
            }
            return;
        }
        tracing::error!(view = self.name, update_id = update.update_id, error = %err, "unhandled handler error");
    }
}

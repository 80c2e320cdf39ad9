//! The dispatcher: updates in, views and waiters out.

use crate::{
    api::Api,
    dispatch::{reply::ReplyPolicy, view::View},
    nodes::NodeResolver,
    types::Update,
    waiters::WaiterMachine,
};
use ferrogram_core::{Context, GlobalCtx, NodeGraph};
use std::sync::Arc;

/// Routes each update to the waiter machine, then the first matching
/// view.
///
/// Waiters take precedence: an update claimed by (or consumed as a near
/// miss of) a waiter never reaches the views. Otherwise the update gets
/// a fresh [`Context`] seeded with the raw update under `raw_update`,
/// and the first view whose filter passes processes it. When the view is
/// done the context's per-event node sessions are torn down.
pub struct Dispatcher {
    views: Vec<View>,
    waiters: Arc<WaiterMachine>,
    resolver: NodeResolver,
    policy: ReplyPolicy,
    global: GlobalCtx,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    /// A dispatcher with no views and an empty node graph.
    pub fn new() -> Self {
        Self {
            views: Vec::new(),
            waiters: Arc::new(WaiterMachine::new()),
            resolver: NodeResolver::empty(),
            policy: ReplyPolicy::new(),
            global: GlobalCtx::new(),
        }
    }

    /// Use `graph` for node resolution.
    pub fn with_graph(mut self, graph: NodeGraph) -> Self {
        self.resolver = NodeResolver::new(Arc::new(graph));
        self
    }

    /// Use `policy` for handler return values.
    pub fn with_policy(mut self, policy: ReplyPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Use `global` as the process-wide context.
    pub fn with_global(mut self, global: GlobalCtx) -> Self {
        self.global = global;
        self
    }

    /// Append a view. Views are tried in registration order.
    pub fn view(mut self, view: View) -> Self {
        self.views.push(view);
        self
    }

    /// The waiter machine, for wiring into handlers or tests.
    pub fn waiters(&self) -> Arc<WaiterMachine> {
        Arc::clone(&self.waiters)
    }

    /// The process-wide context.
    pub fn global(&self) -> &GlobalCtx {
        &self.global
    }

    /// The reply policy.
    pub fn policy(&self) -> &ReplyPolicy {
        &self.policy
    }

    /// Feed one update through the machine. Returns whether anything
    /// consumed it.
    pub async fn feed(&self, api: &Api, update: Update) -> bool {
        if self.waiters.process(&update, api, &self.policy).await {
            tracing::debug!(update_id = update.update_id, "consumed by waiter");
            return true;
        }

        let ctx = Context::new();
        ctx.set("raw_update", update.clone());

        let mut handled = false;
        for view in &self.views {
            if view.accepts(&update, &ctx).await {
                tracing::debug!(update_id = update.update_id, view = view.name(), "routing update");
                handled = view
                    .process(
                        &update,
                        api,
                        &ctx,
                        &self.resolver,
                        &self.waiters,
                        &self.global,
                        &self.policy,
                    )
                    .await;
                break;
            }
        }
        if !handled {
            tracing::trace!(update_id = update.update_id, kind = ?update.kind(), "update not handled");
        }

        ctx.node_cache().close_all().await;
        handled
    }

    /// Cancel pending waiters and tear down global node sessions.
    pub async fn shutdown(&self) {
        self.waiters.cancel_all();
        self.resolver.shutdown().await;
    }
}

//! View middleware: pre/post hooks around handler dispatch.

use crate::{dispatch::reply::Reply, types::Update};
use ferrogram_core::Context;
use std::{future::Future, pin::Pin};

/// Wraps a view's handler dispatch.
///
/// `pre` runs before any handler of the view; returning `false` vetoes
/// the update - no handler and no `post` hook of this view runs. `post`
/// runs after dispatch with every reply the view produced, including the
/// empty list when no handler matched.
pub trait Middleware: Send + Sync + 'static {
    /// Runs before dispatch. `false` vetoes the update.
    fn pre(&self, update: &Update, ctx: &Context) -> impl Future<Output = bool> + Send {
        let _ = (update, ctx);
        std::future::ready(true)
    }

    /// Runs after dispatch with the view's replies.
    fn post(
        &self,
        update: &Update,
        ctx: &Context,
        replies: &[Reply],
    ) -> impl Future<Output = ()> + Send {
        let _ = (update, ctx, replies);
        std::future::ready(())
    }
}

/// Object-safe version of [`Middleware`] for storage in views.
pub trait DynMiddleware: Send + Sync + 'static {
    /// `pre` hook (dynamic dispatch version).
    fn pre_dyn<'a>(
        &'a self,
        update: &'a Update,
        ctx: &'a Context,
    ) -> Pin<Box<dyn Future<Output = bool> + Send + 'a>>;

    /// `post` hook (dynamic dispatch version).
    fn post_dyn<'a>(
        &'a self,
        update: &'a Update,
        ctx: &'a Context,
        replies: &'a [Reply],
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>>;
}

impl<T: Middleware> DynMiddleware for T {
    fn pre_dyn<'a>(
        &'a self,
        update: &'a Update,
        ctx: &'a Context,
    ) -> Pin<Box<dyn Future<Output = bool> + Send + 'a>> {
        Box::pin(self.pre(update, ctx))
    }

    fn post_dyn<'a>(
        &'a self,
        update: &'a Update,
        ctx: &'a Context,
        replies: &'a [Reply],
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(self.post(update, ctx, replies))
    }
}

//! # Dispatch
//!
//! The routing core: [`Dispatcher`] feeds updates to the waiter machine
//! and then to [`View`]s, where rule-gated [`Handler`]s run with their
//! node dependencies resolved. Handler return values are routed back to
//! the chat by the [`ReplyPolicy`]; handler errors are routed to typed
//! error handlers.

mod dispatcher;
mod handler;
mod middleware;
mod reply;
mod view;

pub use dispatcher::Dispatcher;
pub use handler::{
    DynHandler, Extract, ExtractError, FromCx, Handler, HandlerCx, HandlerResult,
    IntoHandlerResult, extract,
};
pub use middleware::{DynMiddleware, Middleware};
pub use reply::{IntoReply, Reply, ReplyPolicy};
pub use view::{ErrorHandlerEntry, HandlerEntry, View};

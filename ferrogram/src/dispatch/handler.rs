//! The handler seam: call context, return conversions, extractors.

use crate::{
    api::Api,
    dispatch::reply::{IntoReply, Reply},
    types::{CallbackQuery, Message, Update},
    waiters::WaiterMachine,
};
use ferrogram_core::{BoxError, Context, GlobalCtx};
use std::{future::Future, marker::PhantomData, pin::Pin, sync::Arc};
use thiserror::Error;

/// Everything a handler gets to work with.
#[derive(Clone)]
pub struct HandlerCx {
    /// The update being handled.
    pub update: Update,
    /// The Bot API handle.
    pub api: Api,
    /// The per-update context (rule captures, node values).
    pub ctx: Context,
    /// The process-wide context.
    pub global: GlobalCtx,
    /// The waiter machine, for funnels.
    pub waiters: Arc<WaiterMachine>,
    /// The error being dispatched, inside error handlers.
    pub error: Option<Arc<BoxError>>,
}

impl HandlerCx {
    /// Shorthand for the update's text or caption.
    pub fn text(&self) -> Option<&str> {
        self.update.text()
    }

    /// Shorthand for the update's chat id.
    pub fn chat_id(&self) -> Option<i64> {
        self.update.chat().map(|chat| chat.id)
    }

    /// A typed value from the per-update context.
    pub fn get<T: Send + Sync + 'static>(&self, key: &str) -> Option<Arc<T>> {
        self.ctx.get(key)
    }
}

/// What a handler returns: a reply to route, or an error to dispatch.
pub type HandlerResult = Result<Reply, BoxError>;

/// An async update handler.
///
/// Closures `Fn(HandlerCx) -> impl Future` implement `Handler` for any
/// return type convertible via [`IntoHandlerResult`]; functions over
/// extractor arguments are adapted with [`extract`].
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a `Handler`",
    note = "handlers are async functions of `HandlerCx` (or of extractor arguments, wrapped in `extract`) returning a reply-convertible value"
)]
pub trait Handler: Send + Sync + 'static {
    /// Handle one update.
    fn call(&self, cx: HandlerCx) -> impl Future<Output = HandlerResult> + Send;
}

/// Object-safe version of [`Handler`] for storage in view tables.
pub trait DynHandler: Send + Sync + 'static {
    /// Handle one update (dynamic dispatch version).
    fn call_dyn(&self, cx: HandlerCx) -> Pin<Box<dyn Future<Output = HandlerResult> + Send + '_>>;
}

impl<T: Handler> DynHandler for T {
    fn call_dyn(&self, cx: HandlerCx) -> Pin<Box<dyn Future<Output = HandlerResult> + Send + '_>> {
        Box::pin(self.call(cx))
    }
}

/// Conversion of handler return values into [`HandlerResult`].
pub trait IntoHandlerResult {
    /// Perform the conversion.
    fn into_handler_result(self) -> HandlerResult;
}

macro_rules! impl_into_handler_result {
    ($($ty:ty),* $(,)?) => {$(
        impl IntoHandlerResult for $ty {
            fn into_handler_result(self) -> HandlerResult {
                Ok(self.into_reply())
            }
        }
    )*};
}

impl_into_handler_result!(
    Reply,
    (),
    String,
    &'static str,
    Vec<String>,
    serde_json::Map<String, serde_json::Value>,
);

impl<T: IntoReply> IntoHandlerResult for Option<T> {
    fn into_handler_result(self) -> HandlerResult {
        Ok(self.into_reply())
    }
}

impl<T: IntoReply, E: Into<BoxError>> IntoHandlerResult for Result<T, E> {
    fn into_handler_result(self) -> HandlerResult {
        self.map(IntoReply::into_reply).map_err(Into::into)
    }
}

impl<F, Fut, R> Handler for F
where
    F: Fn(HandlerCx) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoHandlerResult,
{
    async fn call(&self, cx: HandlerCx) -> HandlerResult {
        (self)(cx).await.into_handler_result()
    }
}

/// An extractor argument failed to materialize.
#[derive(Error, Debug)]
#[error("cannot extract `{what}` from this update")]
pub struct ExtractError {
    /// What the extractor was looking for.
    pub what: &'static str,
}

/// Pulls a typed argument out of the call context.
///
/// Extraction failures surface as handler errors and go through the
/// view's error dispatch like any other failure.
pub trait FromCx: Sized {
    /// Extract the value.
    fn from_cx(cx: &HandlerCx) -> Result<Self, ExtractError>;
}

impl FromCx for HandlerCx {
    fn from_cx(cx: &HandlerCx) -> Result<Self, ExtractError> {
        Ok(cx.clone())
    }
}

impl FromCx for Update {
    fn from_cx(cx: &HandlerCx) -> Result<Self, ExtractError> {
        Ok(cx.update.clone())
    }
}

impl FromCx for Api {
    fn from_cx(cx: &HandlerCx) -> Result<Self, ExtractError> {
        Ok(cx.api.clone())
    }
}

impl FromCx for Context {
    fn from_cx(cx: &HandlerCx) -> Result<Self, ExtractError> {
        Ok(cx.ctx.clone())
    }
}

impl FromCx for GlobalCtx {
    fn from_cx(cx: &HandlerCx) -> Result<Self, ExtractError> {
        Ok(cx.global.clone())
    }
}

impl FromCx for Arc<WaiterMachine> {
    fn from_cx(cx: &HandlerCx) -> Result<Self, ExtractError> {
        Ok(Arc::clone(&cx.waiters))
    }
}

impl FromCx for Message {
    fn from_cx(cx: &HandlerCx) -> Result<Self, ExtractError> {
        cx.update
            .any_message()
            .cloned()
            .ok_or(ExtractError { what: "Message" })
    }
}

impl FromCx for CallbackQuery {
    fn from_cx(cx: &HandlerCx) -> Result<Self, ExtractError> {
        cx.update.callback_query.clone().ok_or(ExtractError {
            what: "CallbackQuery",
        })
    }
}

/// Adapter turning a function over [`FromCx`] arguments into a
/// [`Handler`].
///
/// ```ignore
/// view.on(Command::new("whoami"), extract(|message: Message| async move {
///     format!("you are {}", message.from.map(|u| u.id).unwrap_or(0))
/// }));
/// ```
pub struct Extract<F, Args> {
    f: F,
    _args: PhantomData<fn(Args)>,
}

/// Wrap a function over extractor arguments. See [`Extract`].
pub fn extract<F, Args>(f: F) -> Extract<F, Args> {
    Extract {
        f,
        _args: PhantomData,
    }
}

macro_rules! impl_extract_handler {
    ($($arg:ident),*) => {
        #[allow(non_snake_case)]
        impl<F, Fut, R, $($arg,)*> Handler for Extract<F, ($($arg,)*)>
        where
            F: Fn($($arg),*) -> Fut + Send + Sync + 'static,
            Fut: Future<Output = R> + Send + 'static,
            R: IntoHandlerResult,
            $($arg: FromCx + Send + Sync + 'static,)*
        {
            async fn call(&self, cx: HandlerCx) -> HandlerResult {
                $(let $arg = $arg::from_cx(&cx)?;)*
                let _ = cx;
                (self.f)($($arg),*).await.into_handler_result()
            }
        }
    };
}

impl_extract_handler!(A);
impl_extract_handler!(A, B);
impl_extract_handler!(A, B, C);
impl_extract_handler!(A, B, C, D);
impl_extract_handler!(A, B, C, D, E);
impl_extract_handler!(A, B, C, D, E, G);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{callback_update, handler_cx, message_update};

    #[tokio::test]
    async fn closure_handler_returns_are_converted() {
        let text = |_cx: HandlerCx| async { "pong" };
        let unit = |_cx: HandlerCx| async {};
        let cx = handler_cx(message_update(1, 1, "/ping"));

        assert_eq!(text.call(cx.clone()).await.unwrap(), Reply::Text("pong".into()));
        assert_eq!(unit.call(cx).await.unwrap(), Reply::None);
    }

    #[tokio::test]
    async fn fallible_handler_errors_pass_through() {
        let failing = |_cx: HandlerCx| async {
            Err::<Reply, std::io::Error>(std::io::Error::other("db down"))
        };
        let cx = handler_cx(message_update(1, 1, "x"));
        let err = failing.call(cx).await.unwrap_err();
        assert!(err.downcast_ref::<std::io::Error>().is_some());
    }

    #[tokio::test]
    async fn extractors_pull_typed_arguments() {
        let handler = extract(|message: Message, _api: Api| async move {
            message.text.unwrap_or_default()
        });
        let cx = handler_cx(message_update(1, 1, "hello"));
        assert_eq!(handler.call(cx).await.unwrap(), Reply::Text("hello".into()));
    }

    #[tokio::test]
    async fn failed_extraction_is_a_handler_error() {
        let handler = extract(|message: Message| async move { message.text.unwrap_or_default() });
        let cx = handler_cx(callback_update(1, "data"));
        let err = handler.call(cx).await.unwrap_err();
        assert!(err.downcast_ref::<ExtractError>().is_some());
    }
}

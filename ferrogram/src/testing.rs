//! Test doubles and fixture builders.
//!
//! The [`MockTransport`] records every method call and replays queued
//! responses, so dispatch behavior can be asserted without a network.
//! The fixture builders produce minimal but well-formed updates.

use crate::{
    api::{Api, ApiError, Token, Transport},
    dispatch::HandlerCx,
    types::{CallbackQuery, Chat, Message, Update, User},
    waiters::WaiterMachine,
};
use ferrogram_core::{Context, GlobalCtx};
use serde_json::Value;
use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
    time::Duration,
};

/// The calls a [`MockTransport`] received, in order.
pub type RecordedCalls = Arc<Mutex<Vec<(String, Value)>>>;

/// A scripted [`Transport`].
///
/// Responses queued per method are replayed in order; a method with an
/// empty queue answers `Ok(true)`.
#[derive(Default)]
pub struct MockTransport {
    calls: RecordedCalls,
    queued: Mutex<HashMap<String, VecDeque<Result<Value, ApiError>>>>,
}

impl MockTransport {
    /// An empty transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// The recorded calls handle.
    pub fn calls(&self) -> RecordedCalls {
        Arc::clone(&self.calls)
    }

    /// Queue the next response for `method`.
    pub fn queue(&self, method: &str, response: Result<Value, ApiError>) {
        self.queued
            .lock()
            .expect("mock queue lock")
            .entry(method.to_string())
            .or_default()
            .push_back(response);
    }
}

impl Transport for MockTransport {
    async fn call(
        &self,
        method: &str,
        params: Value,
        _timeout: Duration,
    ) -> Result<Value, ApiError> {
        self.calls
            .lock()
            .expect("mock calls lock")
            .push((method.to_string(), params));
        let queued = self
            .queued
            .lock()
            .expect("mock queue lock")
            .get_mut(method)
            .and_then(VecDeque::pop_front);
        queued.unwrap_or(Ok(Value::Bool(true)))
    }
}

/// An [`Api`] over a fresh [`MockTransport`], plus its call log.
pub fn mock_api() -> (Api, RecordedCalls) {
    let transport = MockTransport::new();
    let calls = transport.calls();
    let token = Token::new("42:TEST").expect("static test token");
    (Api::with_transport(token, Arc::new(transport)), calls)
}

/// An [`Api`] over a prepared transport.
pub fn mock_api_with(transport: MockTransport) -> (Api, RecordedCalls) {
    let calls = transport.calls();
    let token = Token::new("42:TEST").expect("static test token");
    (Api::with_transport(token, Arc::new(transport)), calls)
}

/// A private-chat text message update.
pub fn message_update(update_id: i64, from_user_id: i64, text: &str) -> Update {
    Update {
        update_id,
        message: Some(Message {
            message_id: update_id,
            from: Some(user(from_user_id)),
            chat: Chat {
                id: from_user_id,
                kind: "private".to_string(),
                title: None,
                username: None,
                first_name: Some(format!("user{from_user_id}")),
            },
            date: 1_700_000_000,
            text: Some(text.to_string()),
            caption: None,
            photo: None,
            reply_to_message: None,
        }),
        ..Update::default()
    }
}

/// A callback query update carrying `data`.
pub fn callback_update(from_user_id: i64, data: &str) -> Update {
    Update {
        update_id: 1,
        callback_query: Some(CallbackQuery {
            id: format!("cb{from_user_id}"),
            from: user(from_user_id),
            message: None,
            data: Some(data.to_string()),
        }),
        ..Update::default()
    }
}

/// A minimal user object.
pub fn user(id: i64) -> User {
    User {
        id,
        is_bot: false,
        first_name: format!("user{id}"),
        last_name: None,
        username: None,
        language_code: None,
    }
}

/// A handler call context over a mock API and empty state.
pub fn handler_cx(update: Update) -> HandlerCx {
    let (api, _) = mock_api();
    HandlerCx {
        update,
        api,
        ctx: Context::new(),
        global: GlobalCtx::new(),
        waiters: Arc::new(WaiterMachine::new()),
        error: None,
    }
}

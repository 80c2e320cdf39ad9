//! Shared fixtures for the integration tests.

use ferrogram::dispatch::{Middleware, Reply};
use ferrogram::types::Update;
use ferrogram_core::Context;
use std::sync::{Arc, Mutex};

/// Middleware that records its hook invocations and can veto.
#[derive(Clone, Default)]
pub struct RecordingMiddleware {
    pub veto: bool,
    pub pre_seen: Arc<Mutex<Vec<i64>>>,
    pub post_replies: Arc<Mutex<Vec<Vec<Reply>>>>,
}

impl RecordingMiddleware {
    pub fn passing() -> Self {
        Self::default()
    }

    pub fn vetoing() -> Self {
        Self {
            veto: true,
            ..Self::default()
        }
    }
}

impl Middleware for RecordingMiddleware {
    async fn pre(&self, update: &Update, _ctx: &Context) -> bool {
        self.pre_seen.lock().unwrap().push(update.update_id);
        !self.veto
    }

    async fn post(&self, _update: &Update, _ctx: &Context, replies: &[Reply]) {
        self.post_replies.lock().unwrap().push(replies.to_vec());
    }
}

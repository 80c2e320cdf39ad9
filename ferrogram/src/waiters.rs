//! # Waiter machine
//!
//! Waiters let a handler pause mid-conversation and claim a future
//! update: "the next message from this user", "the next callback in this
//! chat". A waiter registers under one or more `(hasher, key)` pairs; an
//! incoming update is hashed by every active hasher and, when a bucket
//! matches, the waiter's release rule decides whether the update is
//! delivered to it.
//!
//! An update that lands in a waiter's bucket is consumed by the machine
//! either way: a failed release runs the waiter's miss handler (if any)
//! instead of falling through to the views. This is what makes funnels
//! airtight - a user inside a funnel cannot trigger unrelated handlers.
//!
//! Delivery claims the waiter atomically, so a waiter registered under
//! several keys resolves exactly once and its other registrations are
//! swept out. Deadlines are enforced by a spawned timer that claims the
//! waiter with [`WaitResult::Timeout`].

use crate::{
    api::Api,
    dispatch::{Reply, ReplyPolicy},
    types::Update,
};
use ferrogram_core::{BoxError, BoxRule, Context, DynRule, Rule};
use std::{
    collections::HashMap,
    fmt,
    future::Future,
    pin::Pin,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};
use tokio::sync::oneshot;

/// A bucket key produced by a hasher.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// Numeric key (user id, chat id).
    Int(i64),
    /// String key (callback query id, custom).
    Str(String),
}

/// Identifier of a hasher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HasherId(pub &'static str);

impl fmt::Display for HasherId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Projects an update onto a bucket key.
///
/// A hasher that returns `None` for an update simply doesn't apply to it.
#[derive(Clone, Copy)]
pub struct Hasher {
    /// The hasher's identity; buckets are keyed by `(id, key)`.
    pub id: HasherId,
    /// The projection function.
    pub hash: fn(&Update) -> Option<Key>,
}

/// Buckets messages by their sender.
pub const MESSAGE_FROM_USER: Hasher = Hasher {
    id: HasherId("message_from_user"),
    hash: |update| {
        update
            .any_message()?
            .from
            .as_ref()
            .map(|user| Key::Int(user.id))
    },
};

/// Buckets messages by their chat.
pub const MESSAGE_IN_CHAT: Hasher = Hasher {
    id: HasherId("message_in_chat"),
    hash: |update| update.any_message().map(|m| Key::Int(m.chat.id)),
};

/// Buckets callback queries by the pressing user.
pub const CALLBACK_QUERY_FROM_USER: Hasher = Hasher {
    id: HasherId("callback_query_from_user"),
    hash: |update| update.callback_query.as_ref().map(|cb| Key::Int(cb.from.id)),
};

/// How a wait ended.
#[derive(Debug)]
pub enum WaitResult {
    /// An update passed the release rule.
    Delivered {
        /// The hasher whose bucket matched.
        hasher: HasherId,
        /// The delivered update.
        update: Update,
        /// Context populated by the release rule (captures, tags).
        context: Context,
    },
    /// The deadline elapsed first.
    Timeout,
    /// The machine was shut down or the waiter was cancelled.
    Cancelled,
}

/// Future returned by a miss handler.
pub type MissFuture = Pin<Box<dyn Future<Output = Result<Reply, BoxError>> + Send>>;

/// Runs when an update lands in a waiter's bucket but fails the release
/// rule. Its reply is delivered through the machine's reply policy.
pub type MissHandler = Arc<dyn Fn(Update, Api, Context) -> MissFuture + Send + Sync>;

/// Options of a single wait.
#[derive(Default, Clone)]
pub struct WaitOptions {
    /// Handler for near-miss updates.
    pub miss: Option<MissHandler>,
    /// Give up after this long.
    pub deadline: Option<Duration>,
}

impl WaitOptions {
    /// No miss handler, no deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a miss handler.
    pub fn on_miss<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(Update, Api, Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Reply, BoxError>> + Send + 'static,
    {
        self.miss = Some(Arc::new(move |update, api, ctx| {
            Box::pin(handler(update, api, ctx)) as MissFuture
        }));
        self
    }

    /// Give up after `deadline`.
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

struct Waiter {
    claimed: AtomicBool,
    tx: Mutex<Option<oneshot::Sender<WaitResult>>>,
    release: BoxRule<Update>,
    miss: Option<MissHandler>,
    base_ctx: Context,
    keys: Vec<(HasherId, Key)>,
}

impl Waiter {
    /// Claim the waiter; only the first caller gets the sender.
    fn claim(&self) -> Option<oneshot::Sender<WaitResult>> {
        if self.claimed.swap(true, Ordering::SeqCst) {
            return None;
        }
        self.tx.lock().expect("waiter tx lock").take()
    }
}

#[derive(Default)]
struct Registry {
    buckets: HashMap<(HasherId, Key), Vec<Arc<Waiter>>>,
    hashers: HashMap<HasherId, fn(&Update) -> Option<Key>>,
}

/// The waiter registry. One per dispatcher, shared with handlers.
#[derive(Default)]
pub struct WaiterMachine {
    registry: Mutex<Registry>,
}

impl WaiterMachine {
    /// An empty machine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for the next update that lands in any of `hashers`' buckets
    /// (keyed off `anchor`) and passes `release`.
    pub async fn wait(
        self: &Arc<Self>,
        hashers: &[Hasher],
        anchor: &Update,
        release: impl Rule<Update>,
        base_ctx: &Context,
        options: WaitOptions,
    ) -> WaitResult {
        let keys: Vec<(Hasher, Key)> = hashers
            .iter()
            .filter_map(|hasher| (hasher.hash)(anchor).map(|key| (*hasher, key)))
            .collect();
        self.wait_many(keys, release, base_ctx, options).await
    }

    /// Wait under explicit `(hasher, key)` pairs.
    ///
    /// The waiter resolves exactly once even when several buckets could
    /// deliver; the remaining registrations are removed on resolution.
    pub async fn wait_many(
        self: &Arc<Self>,
        keys: Vec<(Hasher, Key)>,
        release: impl Rule<Update>,
        base_ctx: &Context,
        options: WaitOptions,
    ) -> WaitResult {
        if keys.is_empty() {
            tracing::warn!("wait registered with no keys; cancelling immediately");
            return WaitResult::Cancelled;
        }

        let (tx, rx) = oneshot::channel();
        let waiter = Arc::new(Waiter {
            claimed: AtomicBool::new(false),
            tx: Mutex::new(Some(tx)),
            release: release.boxed(),
            miss: options.miss,
            base_ctx: base_ctx.copy(),
            keys: keys.iter().map(|(h, k)| (h.id, k.clone())).collect(),
        });

        {
            let mut registry = self.registry.lock().expect("waiter registry lock");
            for (hasher, key) in &keys {
                registry.hashers.insert(hasher.id, hasher.hash);
                registry
                    .buckets
                    .entry((hasher.id, key.clone()))
                    .or_default()
                    .push(Arc::clone(&waiter));
            }
        }

        if let Some(deadline) = options.deadline {
            let machine = Arc::clone(self);
            let timed = Arc::clone(&waiter);
            tokio::spawn(async move {
                tokio::time::sleep(deadline).await;
                if let Some(tx) = timed.claim() {
                    machine.remove(&timed);
                    let _ = tx.send(WaitResult::Timeout);
                }
            });
        }

        rx.await.unwrap_or(WaitResult::Cancelled)
    }

    /// Offer `update` to the machine.
    ///
    /// Returns `true` when a waiter's bucket matched - the update is then
    /// consumed and must not reach the views, whether it was delivered or
    /// handled as a miss.
    pub async fn process(self: &Arc<Self>, update: &Update, api: &Api, policy: &ReplyPolicy) -> bool {
        let candidates: Vec<(HasherId, Arc<Waiter>)> = {
            let registry = self.registry.lock().expect("waiter registry lock");
            let mut out = Vec::new();
            for (&id, hash) in &registry.hashers {
                let Some(key) = hash(update) else { continue };
                if let Some(bucket) = registry.buckets.get(&(id, key)) {
                    for waiter in bucket {
                        if !waiter.claimed.load(Ordering::SeqCst) {
                            out.push((id, Arc::clone(waiter)));
                        }
                    }
                }
            }
            out
        };
        if candidates.is_empty() {
            return false;
        }

        let mut missed: Vec<Arc<Waiter>> = Vec::new();
        for (hasher, waiter) in candidates {
            let eval_ctx = waiter.base_ctx.copy();
            if waiter.release.check_dyn(update, &eval_ctx).await {
                if let Some(tx) = waiter.claim() {
                    self.remove(&waiter);
                    tracing::debug!(update_id = update.update_id, %hasher, "waiter released");
                    let _ = tx.send(WaitResult::Delivered {
                        hasher,
                        update: update.clone(),
                        context: eval_ctx,
                    });
                }
            } else if !missed.iter().any(|seen| Arc::ptr_eq(seen, &waiter)) {
                missed.push(waiter);
            }
        }

        // The bucket matched, so the update is consumed either way. Every
        // waiter still waiting after the deliveries gets its miss handler.
        for waiter in missed {
            if waiter.claimed.load(Ordering::SeqCst) {
                continue;
            }
            let Some(miss) = &waiter.miss else { continue };
            let ctx = waiter.base_ctx.copy();
            match miss(update.clone(), api.clone(), ctx).await {
                Ok(reply) => {
                    if let Err(err) = policy.apply(reply, update, api).await {
                        tracing::error!(error = %err, "miss handler reply failed");
                    }
                }
                Err(err) => tracing::error!(error = %err, "miss handler failed"),
            }
        }
        true
    }

    /// Resolve every pending waiter with [`WaitResult::Cancelled`].
    pub fn cancel_all(&self) {
        let waiters: Vec<Arc<Waiter>> = {
            let mut registry = self.registry.lock().expect("waiter registry lock");
            registry.hashers.clear();
            registry
                .buckets
                .drain()
                .flat_map(|(_, bucket)| bucket)
                .collect()
        };
        for waiter in waiters {
            if let Some(tx) = waiter.claim() {
                let _ = tx.send(WaitResult::Cancelled);
            }
        }
    }

    /// Number of live registrations across all buckets.
    pub fn pending(&self) -> usize {
        let registry = self.registry.lock().expect("waiter registry lock");
        registry.buckets.values().map(Vec::len).sum()
    }

    fn remove(&self, waiter: &Arc<Waiter>) {
        let mut registry = self.registry.lock().expect("waiter registry lock");
        for (hasher, key) in &waiter.keys {
            if let Some(bucket) = registry.buckets.get_mut(&(*hasher, key.clone())) {
                bucket.retain(|other| !Arc::ptr_eq(other, waiter));
                if bucket.is_empty() {
                    registry.buckets.remove(&(*hasher, key.clone()));
                }
            }
        }
    }
}

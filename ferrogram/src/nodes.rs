//! # Node resolver
//!
//! The async side of the node system: walks a compiled
//! [`NodeGraph`] in dependency order and materializes [`NodeSession`]s
//! according to each node's [`Scope`].
//!
//! - `PerCall` nodes are rebuilt for every resolution frame and torn down
//!   when the frame's [`ResolvedNodes`] handle is closed.
//! - `PerEvent` nodes are cached on the update's context and torn down by
//!   the dispatcher when the update completes.
//! - `Global` nodes are built at most once per process behind a per-node
//!   async lock and torn down at shutdown, in reverse build order.
//!
//! Producers receive the current [`Update`] and [`Api`] handle as typed
//! seeds, plus the values of their declared dependencies. Resolved values
//! are also injected into the context under the node's id, so rules and
//! extractors can read them without touching the cache.

use crate::{api::Api, types::Update};
use ferrogram_core::{
    Context, NodeError,
    node::{NodeCache, NodeEnv, NodeGraph, NodeId, NodeSession, Scope},
};
use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex},
};
use tokio::sync::Mutex as AsyncMutex;

type GlobalCell = Arc<AsyncMutex<Option<Arc<NodeSession>>>>;

/// Process-wide cache of `Global`-scoped sessions.
///
/// Each node gets its own async lock so two updates racing to build the
/// same global node serialize on that node only.
#[derive(Default)]
struct GlobalNodeCache {
    cells: Mutex<HashMap<NodeId, GlobalCell>>,
    order: Mutex<Vec<NodeId>>,
}

impl GlobalNodeCache {
    fn cell(&self, id: NodeId) -> GlobalCell {
        let mut cells = self.cells.lock().expect("global node cells lock");
        Arc::clone(cells.entry(id).or_default())
    }

    fn record_built(&self, id: NodeId) {
        self.order.lock().expect("global node order lock").push(id);
    }

    async fn close_all(&self) {
        let ids: Vec<NodeId> = {
            let mut order = self.order.lock().expect("global node order lock");
            order.drain(..).rev().collect()
        };
        for id in ids {
            let cell = self.cell(id);
            let session = cell.lock().await.take();
            if let Some(session) = session {
                session.finalize().await;
            }
        }
    }
}

/// Resolves node values for rules and handlers against a fixed graph.
#[derive(Clone)]
pub struct NodeResolver {
    graph: Arc<NodeGraph>,
    global: Arc<GlobalNodeCache>,
}

impl NodeResolver {
    /// A resolver over `graph`.
    pub fn new(graph: Arc<NodeGraph>) -> Self {
        Self {
            graph,
            global: Arc::default(),
        }
    }

    /// A resolver with nothing registered; any request is an error.
    pub fn empty() -> Self {
        Self::new(Arc::new(NodeGraph::empty()))
    }

    /// The underlying graph.
    pub fn graph(&self) -> &NodeGraph {
        &self.graph
    }

    /// Resolve `wanted` and their transitive dependencies.
    ///
    /// Built values are injected into `ctx` under their node ids. On
    /// failure, sessions created by this frame are finalized in reverse
    /// and per-event entries are evicted from the context cache; global
    /// sessions that finished building stay cached.
    pub async fn resolve(
        &self,
        wanted: &[NodeId],
        update: &Update,
        api: &Api,
        ctx: &Context,
    ) -> Result<ResolvedNodes, NodeError> {
        let order = self.graph.build_order(wanted)?;
        let mut values: HashMap<NodeId, ferrogram_core::NodeValue> = HashMap::new();
        let mut frame = ResolvedNodes::default();

        for id in order {
            let descriptor = self.graph.get(id).ok_or(NodeError::UnknownNode(id.0))?;
            let scope = descriptor.scope();

            let session = match scope {
                Scope::PerEvent => {
                    if let Some(cached) = ctx.node_cache().get(id) {
                        cached
                    } else {
                        match self.build(id, update, api, ctx, &values).await {
                            Ok(session) => {
                                ctx.node_cache().insert(Arc::clone(&session));
                                frame.per_event.push(Arc::clone(&session));
                                session
                            }
                            Err(err) => {
                                self.unwind(&frame, ctx.node_cache()).await;
                                return Err(err);
                            }
                        }
                    }
                }
                Scope::Global => {
                    let cell = self.global.cell(id);
                    let mut slot = cell.lock().await;
                    if let Some(cached) = slot.as_ref() {
                        Arc::clone(cached)
                    } else {
                        match self.build(id, update, api, ctx, &values).await {
                            Ok(session) => {
                                *slot = Some(Arc::clone(&session));
                                self.global.record_built(id);
                                session
                            }
                            Err(err) => {
                                drop(slot);
                                self.unwind(&frame, ctx.node_cache()).await;
                                return Err(err);
                            }
                        }
                    }
                }
                Scope::PerCall => match self.build(id, update, api, ctx, &values).await {
                    Ok(session) => {
                        frame.per_call.push(Arc::clone(&session));
                        session
                    }
                    Err(err) => {
                        self.unwind(&frame, ctx.node_cache()).await;
                        return Err(err);
                    }
                },
            };

            ctx.set_slot(id.name(), session.value());
            values.insert(id, session.value());
        }

        Ok(frame)
    }

    async fn build(
        &self,
        id: NodeId,
        update: &Update,
        api: &Api,
        ctx: &Context,
        values: &HashMap<NodeId, ferrogram_core::NodeValue>,
    ) -> Result<Arc<NodeSession>, NodeError> {
        let descriptor = self.graph.get(id).ok_or(NodeError::UnknownNode(id.0))?;

        let mut env = NodeEnv::new(ctx.clone());
        env.add_seed(Arc::new(update.clone()));
        env.add_seed(Arc::new(api.clone()));
        for &dep in descriptor.deps() {
            if let Some(value) = values.get(&dep) {
                env.add_dep(dep, Arc::clone(value));
            }
        }

        tracing::trace!(node = %id, scope = ?descriptor.scope(), "building node");
        let parts = (descriptor.producer())(env)
            .await
            .map_err(|e| NodeError::build(id.0, e))?;
        Ok(Arc::new(NodeSession::new(id, descriptor.scope(), parts)))
    }

    async fn unwind(&self, frame: &ResolvedNodes, cache: &NodeCache) {
        for session in frame.per_call.iter().rev() {
            session.finalize().await;
        }
        for session in frame.per_event.iter().rev() {
            cache.remove(session.id());
            session.finalize().await;
        }
    }

    /// Finalize every global session, most recently built first.
    pub async fn shutdown(&self) {
        self.global.close_all().await;
    }
}

/// Sessions created by one resolution frame.
///
/// Closing the frame finalizes its `PerCall` sessions in reverse build
/// order; `PerEvent` sessions stay alive on the context cache.
#[derive(Default)]
pub struct ResolvedNodes {
    per_call: Vec<Arc<NodeSession>>,
    per_event: Vec<Arc<NodeSession>>,
}

impl ResolvedNodes {
    /// Tear down the frame's per-call sessions.
    pub async fn close(self) {
        for session in self.per_call.into_iter().rev() {
            session.finalize().await;
        }
    }
}

impl fmt::Debug for ResolvedNodes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedNodes")
            .field("per_call", &self.per_call)
            .field("per_event", &self.per_event)
            .finish()
    }
}

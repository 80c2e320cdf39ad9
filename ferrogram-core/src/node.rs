//! # Node graph
//!
//! Nodes are typed dependency-injection recipes: each node declares the
//! nodes it depends on, a scope for its value's lifetime, and an async
//! producer that yields the value plus an optional finalizer (the
//! generator-with-teardown shape of scoped resources such as a database
//! connection).
//!
//! This module holds the declarative side: descriptors, the compiled
//! [`NodeGraph`] (cycles and unknown dependencies are rejected at build
//! time), live [`NodeSession`]s and the per-event [`NodeCache`]. The async
//! resolver that walks the graph lives in the engine crate.

use crate::{context::Context, error::BoxError, error::NodeError};
use std::{
    any::{Any, TypeId},
    collections::{HashMap, HashSet},
    fmt,
    future::Future,
    pin::Pin,
    sync::{Arc, Mutex},
};

/// Identifier of a node in the graph.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct NodeId(pub &'static str);

impl NodeId {
    /// The raw name.
    pub fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Lifetime of a node's value.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Scope {
    /// Rebuilt for every resolution frame; torn down when the frame ends.
    PerCall,
    /// Built at most once per update; torn down when the update completes.
    PerEvent,
    /// Built at most once per process; torn down at shutdown.
    Global,
}

/// A type-erased node value.
pub type NodeValue = Arc<dyn Any + Send + Sync>;

/// Future returned by a finalizer.
pub type FinalizeFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// One-shot teardown step of a built node.
pub type Finalizer = Box<dyn FnOnce() -> FinalizeFuture + Send>;

/// Future returned by a node producer.
pub type ProducerFuture = Pin<Box<dyn Future<Output = Result<NodeParts, BoxError>> + Send>>;

/// The producer function of a node.
pub type Producer = Arc<dyn Fn(NodeEnv) -> ProducerFuture + Send + Sync>;

/// What a producer yields: the value and an optional teardown step.
pub struct NodeParts {
    /// The produced value.
    pub value: NodeValue,
    /// Teardown to run when the session closes.
    pub finalizer: Option<Finalizer>,
}

impl NodeParts {
    /// A plain value with no teardown.
    pub fn value<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            value: Arc::new(value),
            finalizer: None,
        }
    }

    /// A value with a teardown step.
    pub fn with_finalizer<T, F, Fut>(value: T, finalizer: F) -> Self
    where
        T: Any + Send + Sync,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            value: Arc::new(value),
            finalizer: Some(Box::new(move || Box::pin(finalizer()) as FinalizeFuture)),
        }
    }
}

/// Environment handed to a producer: seeded values (the update, the API
/// handle), this node's resolved dependencies, and the shared context.
pub struct NodeEnv {
    seeds: HashMap<TypeId, NodeValue>,
    deps: HashMap<NodeId, NodeValue>,
    ctx: Context,
}

impl NodeEnv {
    /// Create an environment with the given shared context.
    pub fn new(ctx: Context) -> Self {
        Self {
            seeds: HashMap::new(),
            deps: HashMap::new(),
            ctx,
        }
    }

    /// Seed a value, retrievable by its concrete type.
    pub fn add_seed<T: Any + Send + Sync>(&mut self, value: Arc<T>) {
        self.seeds.insert(TypeId::of::<T>(), value);
    }

    /// Attach a resolved dependency value.
    pub fn add_dep(&mut self, id: NodeId, value: NodeValue) {
        self.deps.insert(id, value);
    }

    /// A seeded value by type.
    pub fn seed<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.seeds.get(&TypeId::of::<T>())?.clone().downcast().ok()
    }

    /// A resolved dependency by id, downcast to `T`.
    pub fn dep<T: Any + Send + Sync>(&self, id: NodeId) -> Option<Arc<T>> {
        self.deps.get(&id)?.clone().downcast().ok()
    }

    /// The update's shared context.
    pub fn ctx(&self) -> &Context {
        &self.ctx
    }
}

/// Declarative recipe for one node.
pub struct NodeDescriptor {
    id: NodeId,
    scope: Scope,
    deps: Vec<NodeId>,
    producer: Producer,
}

impl NodeDescriptor {
    /// Create a descriptor with the given producer.
    pub fn new<F, Fut>(id: &'static str, scope: Scope, producer: F) -> Self
    where
        F: Fn(NodeEnv) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<NodeParts, BoxError>> + Send + 'static,
    {
        Self {
            id: NodeId(id),
            scope,
            deps: Vec::new(),
            producer: Arc::new(move |env| Box::pin(producer(env)) as ProducerFuture),
        }
    }

    /// Declare a dependency on another node.
    pub fn dependency(mut self, id: &'static str) -> Self {
        self.deps.push(NodeId(id));
        self
    }

    /// The node's id.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The node's scope.
    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// The declared dependencies, in order.
    pub fn deps(&self) -> &[NodeId] {
        &self.deps
    }

    /// The producer function.
    pub fn producer(&self) -> Producer {
        Arc::clone(&self.producer)
    }
}

/// One resolved instance of a node.
///
/// Holds the produced value and the finalize continuation; `finalize` runs
/// the continuation exactly once no matter how many times it is called.
pub struct NodeSession {
    id: NodeId,
    scope: Scope,
    value: NodeValue,
    finalizer: Mutex<Option<Finalizer>>,
}

impl NodeSession {
    /// Create a session from producer output.
    pub fn new(id: NodeId, scope: Scope, parts: NodeParts) -> Self {
        Self {
            id,
            scope,
            value: parts.value,
            finalizer: Mutex::new(parts.finalizer),
        }
    }

    /// The owning node's id.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The owning node's scope.
    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// The type-erased value.
    pub fn value(&self) -> NodeValue {
        Arc::clone(&self.value)
    }

    /// The value downcast to `T`.
    pub fn value_as<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.value).downcast().ok()
    }

    /// Run the teardown step. Idempotent: only the first call runs it.
    pub async fn finalize(&self) {
        let finalizer = self.finalizer.lock().expect("session lock").take();
        if let Some(finalizer) = finalizer {
            finalizer().await;
        }
    }
}

impl fmt::Debug for NodeSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeSession")
            .field("id", &self.id)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Builder for a [`NodeGraph`].
///
/// Collects descriptors, then `build()` validates the whole graph at once
/// so forward references between nodes are allowed.
#[derive(Default)]
pub struct NodeGraphBuilder {
    nodes: Vec<NodeDescriptor>,
}

impl NodeGraphBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a descriptor.
    pub fn node(mut self, descriptor: NodeDescriptor) -> Self {
        self.nodes.push(descriptor);
        self
    }

    /// Validate and freeze the graph.
    ///
    /// Rejects duplicate ids, dependencies on unregistered nodes, and
    /// dependency cycles (reported with the full cycle path).
    pub fn build(self) -> Result<NodeGraph, NodeError> {
        let mut nodes: HashMap<NodeId, NodeDescriptor> = HashMap::with_capacity(self.nodes.len());
        for descriptor in self.nodes {
            let id = descriptor.id();
            if nodes.insert(id, descriptor).is_some() {
                return Err(NodeError::DuplicateNode(id.0));
            }
        }
        let graph = NodeGraph { nodes };
        for descriptor in graph.nodes.values() {
            for dep in descriptor.deps() {
                if !graph.nodes.contains_key(dep) {
                    return Err(NodeError::UnknownDependency {
                        id: descriptor.id().0,
                        dep: dep.0,
                    });
                }
            }
        }
        graph.check_cycles()?;
        Ok(graph)
    }
}

/// A validated, immutable dependency graph of node descriptors.
pub struct NodeGraph {
    nodes: HashMap<NodeId, NodeDescriptor>,
}

impl fmt::Debug for NodeGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeGraph")
            .field("nodes", &self.nodes.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl NodeGraph {
    /// An empty graph.
    pub fn empty() -> Self {
        Self {
            nodes: HashMap::new(),
        }
    }

    /// Look up a descriptor.
    pub fn get(&self, id: NodeId) -> Option<&NodeDescriptor> {
        self.nodes.get(&id)
    }

    /// Whether the graph knows `id`.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Number of registered nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Dependency-first build order for the transitive closure of `roots`.
    ///
    /// Every node appears once, after all of its dependencies.
    pub fn build_order(&self, roots: &[NodeId]) -> Result<Vec<NodeId>, NodeError> {
        let mut order = Vec::new();
        let mut seen = HashSet::new();
        for &root in roots {
            self.visit(root, &mut seen, &mut order)?;
        }
        Ok(order)
    }

    fn visit(
        &self,
        id: NodeId,
        seen: &mut HashSet<NodeId>,
        order: &mut Vec<NodeId>,
    ) -> Result<(), NodeError> {
        if seen.contains(&id) {
            return Ok(());
        }
        let descriptor = self.get(id).ok_or(NodeError::UnknownNode(id.0))?;
        seen.insert(id);
        for &dep in descriptor.deps() {
            self.visit(dep, seen, order)?;
        }
        order.push(id);
        Ok(())
    }

    fn check_cycles(&self) -> Result<(), NodeError> {
        let mut done = HashSet::new();
        let mut stack = Vec::new();
        for &id in self.nodes.keys() {
            self.walk(id, &mut done, &mut stack)?;
        }
        Ok(())
    }

    fn walk(
        &self,
        id: NodeId,
        done: &mut HashSet<NodeId>,
        stack: &mut Vec<NodeId>,
    ) -> Result<(), NodeError> {
        if done.contains(&id) {
            return Ok(());
        }
        if let Some(pos) = stack.iter().position(|&s| s == id) {
            let mut path: Vec<&str> = stack[pos..].iter().map(|n| n.0).collect();
            path.push(id.0);
            return Err(NodeError::CyclicDependency {
                path: path.join(" -> "),
            });
        }
        stack.push(id);
        if let Some(descriptor) = self.get(id) {
            for &dep in descriptor.deps() {
                self.walk(dep, done, stack)?;
            }
        }
        stack.pop();
        done.insert(id);
        Ok(())
    }
}

/// Per-event cache of built node sessions, attached to the update's
/// [`Context`]. Insertion order is kept so teardown can run in reverse.
#[derive(Clone, Default)]
pub struct NodeCache {
    inner: Arc<Mutex<CacheInner>>,
}

#[derive(Default)]
struct CacheInner {
    sessions: HashMap<NodeId, Arc<NodeSession>>,
    order: Vec<NodeId>,
}

impl NodeCache {
    /// A cached session, if the node was already built for this event.
    pub fn get(&self, id: NodeId) -> Option<Arc<NodeSession>> {
        self.inner.lock().expect("node cache lock").sessions.get(&id).cloned()
    }

    /// Cache a freshly built session.
    pub fn insert(&self, session: Arc<NodeSession>) {
        let id = session.id();
        let mut inner = self.inner.lock().expect("node cache lock");
        if inner.sessions.insert(id, session).is_none() {
            inner.order.push(id);
        }
    }

    /// Remove one session (unwind path of a failed resolve).
    pub fn remove(&self, id: NodeId) -> Option<Arc<NodeSession>> {
        let mut inner = self.inner.lock().expect("node cache lock");
        inner.order.retain(|&o| o != id);
        inner.sessions.remove(&id)
    }

    /// Take every cached session, most recently built first.
    pub fn drain_reverse(&self) -> Vec<Arc<NodeSession>> {
        let mut inner = self.inner.lock().expect("node cache lock");
        let mut out = Vec::with_capacity(inner.order.len());
        while let Some(id) = inner.order.pop() {
            if let Some(session) = inner.sessions.remove(&id) {
                out.push(session);
            }
        }
        out
    }

    /// Finalize every cached session, most recently built first.
    pub async fn close_all(&self) {
        for session in self.drain_reverse() {
            session.finalize().await;
        }
    }
}

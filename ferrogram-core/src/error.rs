//! Error types for the Ferrogram kernel.
//!
//! This module provides a structured error hierarchy using `thiserror`:
//!
//! - [`ContextError`] - Failures of the global context registry
//! - [`NodeError`] - Node graph compilation and build failures

use thiserror::Error;

/// A boxed error type for dynamic error handling.
///
/// Handler bodies and node producers report failures through this type;
/// the dispatcher routes them to per-error-type handlers via downcasting.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised by the context layer.
#[derive(Error, Debug)]
pub enum ContextError {
    /// A `const` key of the global context was written a second time.
    #[error("global context key `{0}` is const and already initialized")]
    ImmutableKey(String),
}

/// Errors raised while compiling or building the node graph.
#[derive(Error, Debug)]
pub enum NodeError {
    /// Two descriptors were registered under the same id.
    #[error("node `{0}` is registered twice")]
    DuplicateNode(&'static str),

    /// A descriptor depends on an id that is not in the graph.
    #[error("node `{id}` depends on unknown node `{dep}`")]
    UnknownDependency {
        /// The dependent node.
        id: &'static str,
        /// The missing dependency.
        dep: &'static str,
    },

    /// A node was requested that is not in the graph.
    #[error("unknown node `{0}`")]
    UnknownNode(&'static str),

    /// The declared dependencies form a cycle.
    #[error("cyclic node dependency: {path}")]
    CyclicDependency {
        /// The cycle, rendered as `a -> b -> a`.
        path: String,
    },

    /// A producer failed while building a node.
    #[error("building node `{id}` failed: {source}")]
    Build {
        /// The node whose producer failed.
        id: &'static str,
        /// The producer's error.
        #[source]
        source: BoxError,
    },
}

impl NodeError {
    /// Wrap a producer failure for the given node id.
    pub fn build(id: &'static str, source: impl Into<BoxError>) -> Self {
        NodeError::Build {
            id,
            source: source.into(),
        }
    }
}

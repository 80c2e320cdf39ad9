//! # ferrogram-core
//!
//! Runtime-free kernel of the Ferrogram bot framework.
//!
//! This crate has minimal dependencies and is designed to be imported by
//! rule libraries and extensions that don't need the full engine. It
//! provides the four building blocks the dispatch engine is assembled
//! from:
//!
//! ## Context ([`Context`], [`GlobalCtx`])
//!
//! The per-update key-value scratchpad shared by rules, middleware, node
//! producers and handlers, plus the process-wide registry with `const`
//! keys.
//!
//! ## Rule algebra ([`Rule`])
//!
//! Composable async predicates with short-circuit `and`/`or`/`not`,
//! prerequisite chains, and transactional context writes: a boolean
//! branch that is not taken leaves nothing behind.
//!
//! ## Node graph ([`NodeGraph`])
//!
//! Declarative dependency-injection recipes with scoped lifetimes
//! (`per_call`, `per_event`, `global`) and teardown steps. The graph is
//! validated at build time; cycles are a static error.
//!
//! ## Errors
//!
//! - [`ContextError`] - global context violations
//! - [`NodeError`] - graph compilation and node build failures
//! - [`BoxError`] - the dynamic error type crossing handler seams

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod context;
mod error;
mod global;
pub mod node;
mod rules;

pub use context::{Context, Snapshot};
pub use error::{BoxError, ContextError, NodeError};
pub use global::GlobalCtx;
pub use node::{
    Finalizer, NodeCache, NodeDescriptor, NodeEnv, NodeGraph, NodeGraphBuilder, NodeId, NodeParts,
    NodeSession, NodeValue, Scope,
};
pub use rules::{And, BoxRule, DynRule, Not, Or, Requires, Rule};

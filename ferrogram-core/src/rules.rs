//! # Rule algebra
//!
//! A [`Rule`] is a composable async predicate over an event. Rules gate
//! handlers: a handler runs only when its whole rule chain evaluates true.
//!
//! Rules compose with [`and`], [`or`] and [`not`] using strict
//! left-to-right, short-circuit evaluation: `a.and(b)` never checks `b`
//! when `a` is false, `a.or(b)` never checks `b` when `a` is true.
//!
//! Rules may publish named values into the shared [`Context`] (regex
//! captures, parsed command arguments, a chosen enum tag). Publication is
//! transactional: a branch's writes are committed only when that branch's
//! truth value is the one the combinator returns, so a rejected `or`
//! branch can never leak partial writes.
//!
//! [`and`]: Rule::and
//! [`or`]: Rule::or
//! [`not`]: Rule::not

use crate::{context::Context, node::NodeId};
use std::{future::Future, pin::Pin};

/// A composable async predicate over events of type `E`.
///
/// Implementors may declare node dependencies through
/// [`required_nodes`](Rule::required_nodes); the dispatcher resolves those
/// nodes and injects their values into the context before `check` runs.
///
/// Plain closures `Fn(&E, &Context) -> bool` implement `Rule<E>` directly.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a `Rule<{E}>`",
    label = "missing `Rule` implementation",
    note = "Rules must implement `check` for the event type `{E}`."
)]
pub trait Rule<E>: Send + Sync + 'static {
    /// Evaluate the predicate against `event`.
    ///
    /// Side effects go through `ctx`; they are kept or rolled back by the
    /// enclosing combinator.
    fn check(&self, event: &E, ctx: &Context) -> impl Future<Output = bool> + Send;

    /// Node ids this rule needs resolved before [`check`](Rule::check).
    fn required_nodes(&self) -> Vec<NodeId> {
        Vec::new()
    }

    /// Short-circuit conjunction: checks `other` only when `self` passes.
    fn and<B>(self, other: B) -> And<Self, B>
    where
        Self: Sized,
        B: Rule<E>,
    {
        And { a: self, b: other }
    }

    /// Short-circuit disjunction: checks `other` only when `self` fails.
    fn or<B>(self, other: B) -> Or<Self, B>
    where
        Self: Sized,
        B: Rule<E>,
    {
        Or { a: self, b: other }
    }

    /// Negation. The inner rule's context writes are always rolled back.
    fn not(self) -> Not<Self>
    where
        Self: Sized,
    {
        Not { inner: self }
    }

    /// Prerequisite chain: `requires([r1, r2])` is `r1 & r2 & self`.
    fn requires(self, prerequisites: Vec<BoxRule<E>>) -> Requires<Self, E>
    where
        Self: Sized,
        E: Send + Sync + 'static,
    {
        Requires {
            prerequisites,
            inner: self,
        }
    }

    /// Erase the concrete type for storage in handler tables.
    fn boxed(self) -> BoxRule<E>
    where
        Self: Sized,
        E: Send + Sync + 'static,
    {
        Box::new(self)
    }
}

/// Object-safe version of [`Rule`] for storage in collections.
pub trait DynRule<E>: Send + Sync + 'static {
    /// Evaluate the predicate (dynamic dispatch version).
    fn check_dyn<'a>(
        &'a self,
        event: &'a E,
        ctx: &'a Context,
    ) -> Pin<Box<dyn Future<Output = bool> + Send + 'a>>;

    /// Node ids this rule needs resolved (dynamic dispatch version).
    fn required_nodes_dyn(&self) -> Vec<NodeId>;
}

impl<E, T> DynRule<E> for T
where
    T: Rule<E>,
    E: Send + Sync + 'static,
{
    fn check_dyn<'a>(
        &'a self,
        event: &'a E,
        ctx: &'a Context,
    ) -> Pin<Box<dyn Future<Output = bool> + Send + 'a>> {
        Box::pin(self.check(event, ctx))
    }

    fn required_nodes_dyn(&self) -> Vec<NodeId> {
        self.required_nodes()
    }
}

/// A boxed, type-erased rule.
pub type BoxRule<E> = Box<dyn DynRule<E>>;

impl<E: Send + Sync + 'static> Rule<E> for BoxRule<E> {
    async fn check(&self, event: &E, ctx: &Context) -> bool {
        // Dispatch through the trait object; plain method syntax would
        // pick the blanket `DynRule` impl on the `Box` itself and recurse.
        (**self).check_dyn(event, ctx).await
    }

    fn required_nodes(&self) -> Vec<NodeId> {
        (**self).required_nodes_dyn()
    }
}

// Blanket impl for plain sync closures.
impl<E, F> Rule<E> for F
where
    E: Send + Sync + 'static,
    F: Fn(&E, &Context) -> bool + Send + Sync + 'static,
{
    fn check(&self, event: &E, ctx: &Context) -> impl Future<Output = bool> + Send {
        std::future::ready((self)(event, ctx))
    }
}

/// Short-circuit AND of two rules. See [`Rule::and`].
pub struct And<A, B> {
    a: A,
    b: B,
}

impl<E, A, B> Rule<E> for And<A, B>
where
    E: Send + Sync + 'static,
    A: Rule<E>,
    B: Rule<E>,
{
    async fn check(&self, event: &E, ctx: &Context) -> bool {
        let snapshot = ctx.snapshot();
        if !self.a.check(event, ctx).await {
            ctx.restore(snapshot);
            return false;
        }
        if !self.b.check(event, ctx).await {
            // The chain as a whole failed; neither operand's writes commit.
            ctx.restore(snapshot);
            return false;
        }
        true
    }

    fn required_nodes(&self) -> Vec<NodeId> {
        let mut ids = self.a.required_nodes();
        ids.extend(self.b.required_nodes());
        ids
    }
}

/// Short-circuit OR of two rules. See [`Rule::or`].
pub struct Or<A, B> {
    a: A,
    b: B,
}

impl<E, A, B> Rule<E> for Or<A, B>
where
    E: Send + Sync + 'static,
    A: Rule<E>,
    B: Rule<E>,
{
    async fn check(&self, event: &E, ctx: &Context) -> bool {
        let snapshot = ctx.snapshot();
        if self.a.check(event, ctx).await {
            return true;
        }
        ctx.restore(snapshot);
        let snapshot = ctx.snapshot();
        if self.b.check(event, ctx).await {
            return true;
        }
        ctx.restore(snapshot);
        false
    }

    fn required_nodes(&self) -> Vec<NodeId> {
        let mut ids = self.a.required_nodes();
        ids.extend(self.b.required_nodes());
        ids
    }
}

/// Negation of a rule. See [`Rule::not`].
pub struct Not<A> {
    inner: A,
}

impl<E, A> Rule<E> for Not<A>
where
    E: Send + Sync + 'static,
    A: Rule<E>,
{
    async fn check(&self, event: &E, ctx: &Context) -> bool {
        let snapshot = ctx.snapshot();
        let passed = self.inner.check(event, ctx).await;
        // An inverted result never commits the inner rule's writes.
        ctx.restore(snapshot);
        !passed
    }

    fn required_nodes(&self) -> Vec<NodeId> {
        self.inner.required_nodes()
    }
}

/// Prerequisite chain. See [`Rule::requires`].
pub struct Requires<A, E> {
    prerequisites: Vec<BoxRule<E>>,
    inner: A,
}

impl<E, A> Rule<E> for Requires<A, E>
where
    E: Send + Sync + 'static,
    A: Rule<E>,
{
    async fn check(&self, event: &E, ctx: &Context) -> bool {
        let snapshot = ctx.snapshot();
        for rule in &self.prerequisites {
            if !rule.check_dyn(event, ctx).await {
                ctx.restore(snapshot);
                return false;
            }
        }
        if !self.inner.check(event, ctx).await {
            ctx.restore(snapshot);
            return false;
        }
        true
    }

    fn required_nodes(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self
            .prerequisites
            .iter()
            .flat_map(|r| r.required_nodes_dyn())
            .collect();
        ids.extend(self.inner.required_nodes());
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    fn counting(
        result: bool,
        counter: Arc<AtomicUsize>,
    ) -> impl Rule<String> + use<> {
        move |_: &String, _: &Context| {
            counter.fetch_add(1, Ordering::SeqCst);
            result
        }
    }

    fn publishing(result: bool, key: &'static str) -> impl Rule<String> + use<> {
        move |_: &String, ctx: &Context| {
            ctx.set(key, 1i32);
            result
        }
    }

    #[tokio::test]
    async fn and_short_circuits() {
        let calls = Arc::new(AtomicUsize::new(0));
        let rule = counting(false, calls.clone()).and(counting(true, calls.clone()));

        let ctx = Context::new();
        assert!(!rule.check(&"e".to_string(), &ctx).await);
        // Right operand never ran.
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn or_short_circuits() {
        let calls = Arc::new(AtomicUsize::new(0));
        let rule = counting(true, calls.clone()).or(counting(true, calls.clone()));

        let ctx = Context::new();
        assert!(rule.check(&"e".to_string(), &ctx).await);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_or_branch_leaks_no_writes() {
        let rule = publishing(false, "left").or(publishing(true, "right"));

        let ctx = Context::new();
        assert!(rule.check(&"e".to_string(), &ctx).await);
        assert!(!ctx.contains("left"));
        assert!(ctx.contains("right"));
    }

    #[tokio::test]
    async fn failed_and_chain_leaks_no_writes() {
        let rule = publishing(true, "first").and(publishing(false, "second"));

        let ctx = Context::new();
        assert!(!rule.check(&"e".to_string(), &ctx).await);
        assert!(!ctx.contains("first"));
        assert!(!ctx.contains("second"));
    }

    #[tokio::test]
    async fn passing_chain_commits_writes() {
        let rule = publishing(true, "first").and(publishing(true, "second"));

        let ctx = Context::new();
        assert!(rule.check(&"e".to_string(), &ctx).await);
        assert!(ctx.contains("first"));
        assert!(ctx.contains("second"));
    }

    #[tokio::test]
    async fn not_inverts_and_rolls_back() {
        let ctx = Context::new();
        assert!(!publishing(true, "inner").not().check(&"e".to_string(), &ctx).await);
        assert!(!ctx.contains("inner"));

        assert!(publishing(false, "inner").not().check(&"e".to_string(), &ctx).await);
        assert!(!ctx.contains("inner"));
    }

    #[tokio::test]
    async fn boxed_rules_delegate_to_the_inner_rule() {
        let rule: BoxRule<String> = publishing(true, "inner").boxed();

        let ctx = Context::new();
        assert!(rule.check(&"e".to_string(), &ctx).await);
        assert!(ctx.contains("inner"));
        assert!(rule.required_nodes().is_empty());
    }

    #[tokio::test]
    async fn boxed_rules_compose_with_combinators() {
        let boxed: BoxRule<String> = publishing(true, "left").boxed();
        let rule = boxed.and(publishing(true, "right"));

        let ctx = Context::new();
        assert!(rule.check(&"e".to_string(), &ctx).await);
        assert!(ctx.contains("left"));
        assert!(ctx.contains("right"));
    }

    #[tokio::test]
    async fn requires_runs_prerequisites_first() {
        let order: Arc<std::sync::Mutex<Vec<&'static str>>> = Arc::default();

        let o1 = order.clone();
        let pre: BoxRule<String> = (move |_: &String, _: &Context| {
            o1.lock().unwrap().push("pre");
            true
        })
        .boxed();

        let o2 = order.clone();
        let rule = (move |_: &String, _: &Context| {
            o2.lock().unwrap().push("self");
            true
        })
        .requires(vec![pre]);

        let ctx = Context::new();
        assert!(rule.check(&"e".to_string(), &ctx).await);
        assert_eq!(*order.lock().unwrap(), vec!["pre", "self"]);
    }

    #[tokio::test]
    async fn failing_prerequisite_skips_inner() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pre: BoxRule<String> = (|_: &String, _: &Context| false).boxed();
        let rule = counting(true, calls.clone()).requires(vec![pre]);

        let ctx = Context::new();
        assert!(!rule.check(&"e".to_string(), &ctx).await);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}

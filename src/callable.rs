//! Callable bindings: the sync/async variant tag, the context map used to
//! resolve a callable's receiver, and the `Compiler` collaborator that
//! turns source text into a [`Callable`] (§6.1 — out of scope for the
//! core, consumed only through this trait).

use crate::node::NodeId;
use crate::value::Value;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::rc::Rc;

/// The arguments passed positionally to a callable at dispatch time.
pub type Args = [Option<Value>];

/// An opaque receiver made available to a callable at dispatch time,
/// resolved from the [`Context`] map by `NodeId` first, then by `Name`
/// (§4.4, §9 *Receiver/context*).
pub type Receiver = Rc<dyn std::any::Any>;

/// A plain synchronous node function.
pub type SyncFn = Rc<dyn Fn(&Args, Option<&Receiver>) -> Result<Value, String>>;

/// An asynchronous node function. The core `.await`s its result before
/// dispatching the next node (§4.4, §5).
pub type AsyncFn =
    Rc<dyn Fn(&Args, Option<&Receiver>) -> BoxFuture<'static, Result<Value, String>>>;

/// A generator node function. Recognized by the dispatcher's variant
/// check but never invoked — generator execution is a non-goal (§4.4).
pub type GeneratorFn = Rc<dyn Fn(&Args, Option<&Receiver>) -> Result<Value, String>>;

/// An async-generator node function. Recognized but never invoked, for
/// the same reason as [`GeneratorFn`].
pub type AsyncGeneratorFn =
    Rc<dyn Fn(&Args, Option<&Receiver>) -> BoxFuture<'static, Result<Value, String>>>;

/// A node's bound callable, tagged by the variant the dispatcher must use
/// to invoke it (§4.4, §9 *Reflective callable classification*).
///
/// This tagged enum is the strongly-typed replacement for what the
/// source models via runtime constructor identity: the tag is decided
/// once, at binding time, rather than re-inspected on every dispatch.
#[derive(Clone)]
pub enum Callable {
    /// Dispatched inline; the call runs to completion before the next
    /// node is considered.
    Sync(SyncFn),
    /// Dispatched with `.await`; the driver suspends until it resolves.
    Async(AsyncFn),
    /// Recognized, never executed by the core.
    Generator(GeneratorFn),
    /// Recognized, never executed by the core.
    AsyncGenerator(AsyncGeneratorFn),
}

impl Callable {
    /// Whether this callable is dispatched by `.await`ing it.
    pub fn is_async(&self) -> bool {
        matches!(self, Callable::Async(_) | Callable::AsyncGenerator(_))
    }

    /// Whether the core actually dispatches this variant (§4.4: only
    /// `Sync` and `Async` are; the generator variants are inert).
    pub fn is_dispatchable(&self) -> bool {
        matches!(self, Callable::Sync(_) | Callable::Async(_))
    }
}

impl std::fmt::Debug for Callable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let variant = match self {
            Callable::Sync(_) => "Sync",
            Callable::Async(_) => "Async",
            Callable::Generator(_) => "Generator",
            Callable::AsyncGenerator(_) => "AsyncGenerator",
        };
        f.debug_tuple("Callable").field(&variant).finish()
    }
}

/// The code-to-callable compiler (§6.1), an external collaborator.
///
/// The core never implements this itself: compiling user-supplied source
/// text into native code is explicitly out of scope (§1). What the core
/// does own is the heuristic in [`classify`] that decides *which* factory
/// to call, preserving the source's dispatch semantics regardless of how
/// the caller's compiler is implemented.
pub trait Compiler {
    /// Compile a plain (non-generator, non-async) function body.
    fn plain(&self, args: &[String], body: &str) -> Result<Callable, String>;
    /// Compile an async function body (contains `await`, no `yield`).
    fn asynchronous(&self, args: &[String], body: &str) -> Result<Callable, String>;
    /// Compile a generator function body (contains `yield`, no `await`).
    fn generator(&self, args: &[String], body: &str) -> Result<Callable, String>;
    /// Compile an async-generator function body (contains both).
    fn async_generator(&self, args: &[String], body: &str) -> Result<Callable, String>;
}

/// Join multi-line source the way `set_node_func` accepts it: either a
/// single string, or a list of statements joined with `;` (§6.1).
pub fn join_source_lines<S: AsRef<str>>(lines: &[S]) -> String {
    lines
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(";")
}

/// Classify source code into one of the four [`Compiler`] factories,
/// using the `await`/`yield` heuristic of §6.1, then compile it.
pub fn compile(compiler: &dyn Compiler, args: &[String], code: &str) -> Result<Callable, String> {
    let has_await = code.contains("await");
    let has_yield = code.contains("yield");
    match (has_await, has_yield) {
        (false, false) => compiler.plain(args, code),
        (true, false) => compiler.asynchronous(args, code),
        (false, true) => compiler.generator(args, code),
        (true, true) => compiler.async_generator(args, code),
    }
}

/// A binding's declared argument names and the [`Callable`] itself.
#[derive(Clone)]
pub struct Binding {
    /// The callable's ordered argument names.
    pub args: Vec<String>,
    /// The callable to dispatch.
    pub callable: Callable,
}

/// Resolve argument names when none are supplied: `["arg0", .., "arg{n-1}"]`
/// for an arity of `n > 0`, or an empty list for `n == 0` (§4.2,
/// `set_func`).
pub fn synthesize_arg_names(arity: usize) -> Vec<String> {
    (0..arity).map(|i| format!("arg{i}")).collect()
}

/// The context map consulted at dispatch time to resolve a callable's
/// receiver: by [`NodeId`] first, then by `Name` (§3, §9).
#[derive(Clone, Default)]
pub struct Context {
    by_node: HashMap<NodeId, Receiver>,
    by_name: HashMap<String, Receiver>,
}

impl Context {
    /// An empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a receiver for a specific node id.
    pub fn set_for_node(&mut self, node_id: NodeId, receiver: Receiver) {
        self.by_node.insert(node_id, receiver);
    }

    /// Register a receiver for a name, used by any node bound to it that
    /// has no node-specific entry.
    pub fn set_for_name(&mut self, name: impl Into<String>, receiver: Receiver) {
        self.by_name.insert(name.into(), receiver);
    }

    /// Resolve the receiver for a dispatch: `context[nodeId]` if present,
    /// else `context[name]`, else `None` (§4.4).
    pub fn resolve(&self, node_id: &NodeId, name: &str) -> Option<&Receiver> {
        self.by_node
            .get(node_id)
            .or_else(|| self.by_name.get(name))
    }
}

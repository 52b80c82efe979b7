//! The top-level [`Dflow`] engine: wires the graph store, scheduler,
//! dispatcher and sub-graph executor together (§4.6).

use crate::callable::{Callable, Compiler, Context};
use crate::dispatch::{self, Dispatched};
use crate::error::DflowError;
use crate::id::{pin_to_pin_id, Pin, PinId};
use crate::node::{Node, NodeId};
use crate::pipe::Pipe;
use crate::schedule;
use crate::store::{GraphTemplate, Store};
use crate::subgraph;
use crate::value::Value;
use std::collections::HashMap;

/// The state an engine instance moves through across its lifetime (§4.5
/// *State machine*).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    /// Freshly constructed, nothing inserted yet.
    Constructed,
    /// At least one `insert`/`add_node`/`add_pipe` has succeeded.
    Ready,
    /// Inside a `run`/`run_async` call.
    Running,
    /// The most recent run finished without error.
    Completed,
    /// The most recent run aborted with an error. Terminal for that run
    /// only — the instance remains usable for a subsequent run.
    Failed,
}

/// A dataflow engine: a named graph of nodes and pipes, with its own
/// output cache, callable bindings, sub-graph templates and context.
pub struct Dflow {
    pub(crate) store: Store,
    pub(crate) subgraph_instances: HashMap<NodeId, Box<Dflow>>,
    state: State,
}

impl Dflow {
    /// A new, empty engine named `name` (§4.5 state machine:
    /// `Constructed`).
    pub fn new(name: impl Into<String>) -> Self {
        Dflow {
            store: Store::new(name),
            subgraph_instances: HashMap::new(),
            state: State::Constructed,
        }
    }

    /// The engine's name.
    pub fn name(&self) -> &str {
        &self.store.name
    }

    /// The engine's current lifecycle state.
    pub fn state(&self) -> State {
        self.state
    }

    /// Mutable access to the context map consulted at dispatch time.
    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.store.context
    }

    // -- graph store passthrough (§4.2) --------------------------------

    /// §4.2 `add_node`.
    pub fn add_node(&mut self, name: impl Into<String>, id: impl Into<NodeId>) -> NodeId {
        let id = self.store.add_node(name, id);
        self.mark_ready();
        id
    }

    /// §4.2 `del_node`.
    pub fn del_node(&mut self, id: &NodeId) {
        self.store.del_node(id);
        self.subgraph_instances.remove(id);
    }

    /// §4.2 `add_pipe`.
    pub fn add_pipe(&mut self, pipe: Pipe) -> Result<(), DflowError> {
        self.store.add_pipe(pipe)?;
        self.mark_ready();
        Ok(())
    }

    /// §4.2 `del_pipe`.
    pub fn del_pipe(&mut self, to: &Pin) {
        self.store.del_pipe(to);
    }

    /// §4.2 bulk `delete`.
    pub fn delete(&mut self, node_ids: &[NodeId], pipe_targets: &[Pin]) -> (Vec<Node>, Vec<Pipe>) {
        for id in node_ids {
            self.subgraph_instances.remove(id);
        }
        self.store.delete(node_ids, pipe_targets)
    }

    /// §4.2 bulk `insert`.
    pub fn insert(&mut self, nodes: Vec<Node>, pipes: Vec<Pipe>) -> Result<(), DflowError> {
        self.store.insert(nodes, pipes)?;
        self.mark_ready();
        Ok(())
    }

    /// §4.2 `set_func`: bind an already-compiled callable with a known
    /// arity (used to synthesize argument names when `args` is `None`).
    pub fn set_func(
        &mut self,
        name: impl Into<String>,
        callable: Callable,
        args: Option<Vec<String>>,
        arity: usize,
    ) -> Result<(), DflowError> {
        self.store.set_func(name, callable, args, arity)
    }

    /// §4.2 `set_node_func`: compile `code` (§6.1 heuristic) via the
    /// caller-supplied [`Compiler`] and bind the result.
    pub fn set_node_func(
        &mut self,
        name: impl Into<String>,
        args: Vec<String>,
        code: &str,
        compiler: &dyn Compiler,
    ) -> Result<(), DflowError> {
        self.store.set_node_func(name, args, code, compiler)
    }

    /// §4.2 `set_node_arg`.
    pub fn set_node_arg(&mut self, name: impl Into<String>) -> Result<(), DflowError> {
        self.store.set_node_arg(name)
    }

    /// §4.2 `set_node_out`.
    pub fn set_node_out(&mut self, name: impl Into<String>) -> Result<(), DflowError> {
        self.store.set_node_out(name)
    }

    /// §4.2 `set_node_graph`: register a sub-graph template.
    pub fn set_node_graph(
        &mut self,
        name: impl Into<String>,
        args: Vec<String>,
        outs: Vec<String>,
        nodes: Vec<Node>,
        pipes: Vec<Pipe>,
    ) -> Result<(), DflowError> {
        self.store.set_node_graph(
            name,
            GraphTemplate {
                args,
                outs,
                nodes,
                pipes,
            },
        )
    }

    /// §4.2 `pipe_of_target`.
    pub fn pipe_of_target(&self, id: &PinId) -> Option<Pipe> {
        self.store.pipe_of_target(id)
    }

    /// §4.2 `arg_values`.
    pub fn arg_values(&self, node_id: &NodeId) -> Result<Vec<Option<Value>>, DflowError> {
        self.store.arg_values(node_id)
    }

    /// Read a value out of the output cache at an explicit pin.
    pub fn output_at(&self, pin: &Pin) -> Option<&Value> {
        self.store.output(&pin_to_pin_id(pin))
    }

    /// Read a node's position-0 output.
    pub fn output(&self, node_id: &NodeId) -> Option<&Value> {
        self.output_at(&Pin::new(node_id.clone()))
    }

    fn mark_ready(&mut self) {
        if self.state == State::Constructed {
            self.state = State::Ready;
        }
    }

    // -- scheduling / async introspection -------------------------------

    /// The node list in scheduled (level, then insertion) order.
    fn scheduled_order(&self) -> Vec<(NodeId, String)> {
        let pipes = self.store.pipe_list();
        schedule::schedule(&self.store.nodes, &pipes)
            .into_iter()
            .map(|node| (node.id.clone(), node.name.clone()))
            .collect()
    }

    /// Whether this engine (including its sub-graph templates and any
    /// already-materialized instances) contains an async node,
    /// transitively (§5 *Suspension points*).
    ///
    /// Materialized instances are checked exactly, against their real
    /// inherited bindings. Templates not yet instantiated are checked
    /// against this engine's *current* bindings, simulating what they
    /// would inherit if materialized right now — a best-effort forecast,
    /// not a guarantee if bindings change before the template is
    /// actually instantiated.
    pub fn has_async_nodes(&self) -> bool {
        for node in &self.store.nodes {
            if let Some(binding) = self.store.bindings.get(&node.name) {
                if binding.callable.is_async() {
                    return true;
                }
            }
        }
        if self
            .subgraph_instances
            .values()
            .any(|child| child.has_async_nodes())
        {
            return true;
        }
        self.store
            .graphs
            .values()
            .any(|template| template_has_async_node(template, &self.store.bindings))
    }

    // -- run --------------------------------------------------------------

    /// Run the graph synchronously (§4.6). Intended for graphs where
    /// [`Dflow::has_async_nodes`] is `false`; dispatching an `Async`
    /// callable on this path logs an error and skips the node rather
    /// than blocking (see [`dispatch::dispatch_sync`]).
    pub fn run(&mut self) -> Result<(), DflowError> {
        self.state = State::Running;
        let order = self.scheduled_order();
        for (node_id, name) in order {
            if let Err(err) = self.run_node_sync(&node_id, &name) {
                self.state = State::Failed;
                return Err(err);
            }
        }
        self.state = State::Completed;
        Ok(())
    }

    fn run_node_sync(&mut self, node_id: &NodeId, name: &str) -> Result<(), DflowError> {
        let is_graph = subgraph::materialize(&mut self.subgraph_instances, &self.store, node_id, name)?
            .is_some();
        match dispatch::dispatch_sync(&mut self.store, node_id, name)? {
            Dispatched::Ran | Dispatched::Unbound | Dispatched::Inert | Dispatched::AsyncSkipped => {}
        }
        if is_graph {
            self.run_subgraph_sync(node_id, name)?;
        }
        Ok(())
    }

    fn run_subgraph_sync(&mut self, graph_id: &NodeId, graph_name: &str) -> Result<(), DflowError> {
        let Some(child) = self.subgraph_instances.get_mut(graph_id) else {
            return Ok(());
        };
        subgraph::inject_args(&self.store, child, graph_id)?;
        child
            .run()
            .map_err(|err| err.wrap_subgraph(graph_id, graph_name))?;
        subgraph::extract_outputs(&mut self.store, &child.store, graph_id);
        Ok(())
    }

    /// Run the graph asynchronously (§4.6, §5): every `Async` callable,
    /// and every sub-graph transitively containing one, is `.await`ed in
    /// place before the driver proceeds to the next node.
    pub async fn run_async(&mut self) -> Result<(), DflowError> {
        self.state = State::Running;
        let order = self.scheduled_order();
        for (node_id, name) in order {
            if let Err(err) = self.run_node_async(&node_id, &name).await {
                self.state = State::Failed;
                return Err(err);
            }
        }
        self.state = State::Completed;
        Ok(())
    }

    async fn run_node_async(&mut self, node_id: &NodeId, name: &str) -> Result<(), DflowError> {
        let is_graph = subgraph::materialize(&mut self.subgraph_instances, &self.store, node_id, name)?
            .is_some();
        match dispatch::dispatch_async(&mut self.store, node_id, name).await? {
            Dispatched::Ran | Dispatched::Unbound | Dispatched::Inert | Dispatched::AsyncSkipped => {}
        }
        if is_graph {
            self.run_subgraph_async(node_id, name).await?;
        }
        Ok(())
    }

    async fn run_subgraph_async(
        &mut self,
        graph_id: &NodeId,
        graph_name: &str,
    ) -> Result<(), DflowError> {
        let Some(child) = self.subgraph_instances.get_mut(graph_id) else {
            return Ok(());
        };
        subgraph::inject_args(&self.store, child, graph_id)?;
        Box::pin(child.run_async())
            .await
            .map_err(|err| err.wrap_subgraph(graph_id, graph_name))?;
        subgraph::extract_outputs(&mut self.store, &child.store, graph_id);
        Ok(())
    }

    // -- misc (§6.3) --------------------------------------------------------

    /// The one-line summary of §6.3.
    pub fn summary(&self) -> String {
        format!(
            "Dflow name={} args={} nodes={} pipes={} outs={}",
            self.store.name,
            self.store.arg_names.len(),
            self.store.nodes.len(),
            self.store.pipes.len(),
            self.store.out_names.len(),
        )
    }
}

fn template_has_async_node(
    template: &GraphTemplate,
    inherited: &HashMap<String, crate::callable::Binding>,
) -> bool {
    let is_marker =
        |name: &str| template.args.iter().any(|a| a == name) || template.outs.iter().any(|o| o == name);
    template.nodes.iter().any(|node| {
        !is_marker(&node.name)
            && inherited
                .get(&node.name)
                .is_some_and(|binding| binding.callable.is_async())
    })
}

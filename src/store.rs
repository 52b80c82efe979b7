//! The graph store (§4.2): the authoritative in-memory model owned by a
//! [`crate::Dflow`].

use crate::callable::{synthesize_arg_names, Binding, Callable, Context};
use crate::error::DflowError;
use crate::id::{pin_id_to_pin, pin_to_pin_id, Pin, PinId};
use crate::node::{Node, NodeId};
use crate::pipe::Pipe;
use crate::value::Value;
use std::collections::{HashMap, HashSet};

/// A sub-graph template registered by `set_node_graph` (§3, §4.5).
#[derive(Clone)]
pub struct GraphTemplate {
    /// The template's formal argument names, in order.
    pub args: Vec<String>,
    /// The template's formal output names, in order.
    pub outs: Vec<String>,
    /// The nested nodes.
    pub nodes: Vec<Node>,
    /// The nested pipes.
    pub pipes: Vec<Pipe>,
}

/// The authoritative model: nodes, pipes, declared bindings, I/O markers,
/// the output cache, and the context map.
#[derive(Default)]
pub struct Store {
    pub(crate) name: String,
    pub(crate) nodes: Vec<Node>,
    node_index: HashMap<NodeId, usize>,
    /// Target `PinId` -> source `PinId`, per the single-writer-per-input
    /// invariant of §3.
    pub(crate) pipes: HashMap<PinId, PinId>,
    /// `Name` -> callable binding, populated by `set_func`/`set_node_func`.
    pub(crate) bindings: HashMap<String, Binding>,
    /// `Name` -> sub-graph template, populated by `set_node_graph`.
    pub(crate) graphs: HashMap<String, GraphTemplate>,
    /// Names registered as formal arguments of *this* graph, in order.
    pub(crate) arg_names: Vec<String>,
    /// Names registered as formal outputs of *this* graph, in order.
    pub(crate) out_names: Vec<String>,
    /// The union of `arg_names` and `out_names`, for O(1) membership.
    io_markers: HashSet<String>,
    /// `PinId -> Value`, populated during a run.
    pub(crate) output_cache: HashMap<PinId, Value>,
    pub(crate) context: Context,
}

impl Store {
    /// A new, empty store named `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Store {
            name: name.into(),
            ..Default::default()
        }
    }

    /// §4.2 `add_node`: insert `(id, name)`. No validation that `name` is
    /// bound to anything yet.
    pub fn add_node(&mut self, name: impl Into<String>, id: impl Into<NodeId>) -> NodeId {
        let id = id.into();
        self.node_index.insert(id.clone(), self.nodes.len());
        self.nodes.push(Node::new(id.clone(), name.into()));
        id
    }

    /// The index of `id` in `self.nodes`, if present.
    fn index_of(&self, id: &NodeId) -> Option<usize> {
        self.node_index.get(id).copied()
    }

    /// Whether a node with this id currently exists.
    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.index_of(id).is_some()
    }

    /// Look up a node by id.
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.index_of(id).map(|i| &self.nodes[i])
    }

    /// §4.2 `del_node`: remove the node and every pipe referencing it.
    pub fn del_node(&mut self, id: &NodeId) {
        let Some(index) = self.index_of(id) else {
            return;
        };
        self.nodes.remove(index);
        self.reindex();
        self.pipes.retain(|to, from| {
            pin_id_to_pin(to).node_id != *id && pin_id_to_pin(from).node_id != *id
        });
    }

    /// Recompute `node_index` from scratch after `self.nodes` shifted.
    fn reindex(&mut self) {
        self.node_index.clear();
        for (i, node) in self.nodes.iter().enumerate() {
            self.node_index.insert(node.id.clone(), i);
        }
    }

    /// §4.2 `add_pipe`: reject if either endpoint is absent, otherwise
    /// store `pin_to_pin_id(to) -> pin_to_pin_id(from)`, overwriting any
    /// existing source for `to` (§3, single-writer-per-input-pin).
    pub fn add_pipe(&mut self, pipe: Pipe) -> Result<(), DflowError> {
        if !self.contains_node(&pipe.from.node_id) || !self.contains_node(&pipe.to.node_id) {
            return Err(DflowError::BrokenPipe { pipe });
        }
        let to = pin_to_pin_id(&pipe.to);
        let from = pin_to_pin_id(&pipe.from);
        self.pipes.insert(to, from);
        Ok(())
    }

    /// §4.2 `del_pipe`: remove the mapping whose key is
    /// `pin_to_pin_id(to)`.
    pub fn del_pipe(&mut self, to: &Pin) {
        self.pipes.remove(&pin_to_pin_id(to));
    }

    /// The full list of pipes, reconstructed from the target/source map.
    pub fn pipe_list(&self) -> Vec<Pipe> {
        self.pipes
            .iter()
            .map(|(to, from)| Pipe {
                from: pin_id_to_pin(from),
                to: pin_id_to_pin(to),
            })
            .collect()
    }

    /// §4.2 `pipe_of_target`: the unique pipe whose `to` has this
    /// `PinId`, if any.
    pub fn pipe_of_target(&self, id: &PinId) -> Option<Pipe> {
        self.pipes.get(id).map(|from| Pipe {
            from: pin_id_to_pin(from),
            to: pin_id_to_pin(id),
        })
    }

    /// §4.2 bulk `delete`: remove the listed nodes, then collect and
    /// remove every pipe whose source or target is now missing, plus the
    /// listed pipes. Returns everything removed.
    pub fn delete(&mut self, node_ids: &[NodeId], pipe_targets: &[Pin]) -> (Vec<Node>, Vec<Pipe>) {
        let mut removed_nodes = Vec::new();
        for id in node_ids {
            if let Some(index) = self.index_of(id) {
                removed_nodes.push(self.nodes.remove(index));
                self.reindex();
            }
        }

        let mut removed_pipes = Vec::new();
        self.pipes.retain(|to, from| {
            let to_pin = pin_id_to_pin(to);
            let from_pin = pin_id_to_pin(from);
            let dangling =
                !self.node_index.contains_key(&to_pin.node_id) || !self.node_index.contains_key(&from_pin.node_id);
            if dangling {
                removed_pipes.push(Pipe {
                    from: from_pin,
                    to: to_pin,
                });
            }
            !dangling
        });

        for to in pipe_targets {
            let key = pin_to_pin_id(to);
            if let Some(from) = self.pipes.remove(&key) {
                removed_pipes.push(Pipe {
                    from: pin_id_to_pin(&from),
                    to: to.clone(),
                });
            }
        }

        (removed_nodes, removed_pipes)
    }

    /// §4.2 bulk `insert`: nodes first, then pipes (propagating
    /// `BrokenPipe`).
    pub fn insert(&mut self, nodes: Vec<Node>, pipes: Vec<Pipe>) -> Result<(), DflowError> {
        for node in nodes {
            self.node_index.insert(node.id.clone(), self.nodes.len());
            self.nodes.push(node);
        }
        for pipe in pipes {
            self.add_pipe(pipe)?;
        }
        Ok(())
    }

    /// §4.2 `set_func`: bind an already-compiled callable, synthesizing
    /// argument names from its arity when none are given.
    pub fn set_func(
        &mut self,
        name: impl Into<String>,
        callable: Callable,
        args: Option<Vec<String>>,
        arity: usize,
    ) -> Result<(), DflowError> {
        let name = name.into();
        self.reject_callable_override(&name)?;
        let args = args.unwrap_or_else(|| synthesize_arg_names(arity));
        self.bindings.insert(name, Binding { args, callable });
        Ok(())
    }

    /// §4.2 `set_node_func`: compile `code` via the heuristic in
    /// [`crate::callable::compile`] and bind the result.
    pub fn set_node_func(
        &mut self,
        name: impl Into<String>,
        args: Vec<String>,
        code: &str,
        compiler: &dyn crate::callable::Compiler,
    ) -> Result<(), DflowError> {
        let name = name.into();
        self.reject_callable_override(&name)?;
        let callable =
            crate::callable::compile(compiler, &args, code).map_err(|message| {
                DflowError::NodeExecution {
                    node_id: NodeId::from(name.as_str()),
                    node_name: name.clone(),
                    node_error_message: message,
                }
            })?;
        self.bindings.insert(name, Binding { args, callable });
        Ok(())
    }

    /// §4.2 `set_node_arg`: register `name` as a formal input marker.
    pub fn set_node_arg(&mut self, name: impl Into<String>) -> Result<(), DflowError> {
        let name = name.into();
        self.reject_marker_override(&name)?;
        self.io_markers.insert(name.clone());
        self.arg_names.push(name);
        Ok(())
    }

    /// §4.2 `set_node_out`: register `name` as a formal output marker.
    /// I/O markers are a category distinct from callable bindings and
    /// sub-graph templates (§3): the `["out"]` argument-name list is
    /// recorded for introspection, but an output-marker node is never
    /// itself dispatched — §4.5's output-extraction step reads the
    /// marker's inbound pipe directly rather than the marker's own
    /// output-cache slot.
    pub fn set_node_out(&mut self, name: impl Into<String>) -> Result<(), DflowError> {
        let name = name.into();
        self.reject_marker_override(&name)?;
        self.io_markers.insert(name.clone());
        self.out_names.push(name);
        Ok(())
    }

    /// The `["out"]` argument-name list recorded for every output
    /// marker (§4.2).
    pub fn out_arg_names(&self) -> Vec<String> {
        vec!["out".to_string()]
    }

    /// §4.2 `set_node_graph`: register a sub-graph template.
    pub fn set_node_graph(
        &mut self,
        name: impl Into<String>,
        template: GraphTemplate,
    ) -> Result<(), DflowError> {
        let name = name.into();
        self.reject_graph_override(&name)?;
        self.graphs.insert(name, template);
        Ok(())
    }

    /// §3, §9 open question (b): a `Name` may carry both a callable
    /// binding and a sub-graph template at once (the dispatcher runs
    /// both); what it may not do is collide with an I/O marker, or with
    /// another binding already in its own category.
    fn reject_callable_override(&self, name: &str) -> Result<(), DflowError> {
        if self.bindings.contains_key(name) || self.io_markers.contains(name) {
            return Err(DflowError::NodeOverride {
                node_name: name.to_string(),
            });
        }
        Ok(())
    }

    /// The sub-graph-template counterpart of
    /// [`Store::reject_callable_override`].
    fn reject_graph_override(&self, name: &str) -> Result<(), DflowError> {
        if self.graphs.contains_key(name) || self.io_markers.contains(name) {
            return Err(DflowError::NodeOverride {
                node_name: name.to_string(),
            });
        }
        Ok(())
    }

    /// §3: an I/O marker name is unique across every category.
    fn reject_marker_override(&self, name: &str) -> Result<(), DflowError> {
        if self.bindings.contains_key(name)
            || self.graphs.contains_key(name)
            || self.io_markers.contains(name)
        {
            return Err(DflowError::NodeOverride {
                node_name: name.to_string(),
            });
        }
        Ok(())
    }

    /// Whether `name` is an I/O marker (formal argument or output) of
    /// *this* graph.
    pub fn is_io_marker(&self, name: &str) -> bool {
        self.io_markers.contains(name)
    }

    /// The callable binding for `name`, if any.
    pub fn binding(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(name)
    }

    /// The sub-graph template for `name`, if any.
    pub fn graph_template(&self, name: &str) -> Option<&GraphTemplate> {
        self.graphs.get(name)
    }

    /// §4.2 `arg_values`: for each declared argument position of the
    /// node's bound name, the upstream output-cache value if an inbound
    /// pipe exists, else `None`. `NodeNotFound` if `node_id` is absent.
    pub fn arg_values(&self, node_id: &NodeId) -> Result<Vec<Option<Value>>, DflowError> {
        let node = self.node(node_id).ok_or_else(|| DflowError::NodeNotFound {
            node_id: node_id.clone(),
        })?;
        let arity = self
            .bindings
            .get(&node.name)
            .map(|b| b.args.len())
            .or_else(|| self.graphs.get(&node.name).map(|t| t.args.len()))
            .unwrap_or(0);
        Ok((0..arity)
            .map(|position| {
                let target = pin_to_pin_id(&Pin::at(node_id.clone(), position));
                self.pipe_of_target(&target)
                    .and_then(|pipe| self.output_cache.get(&pin_to_pin_id(&pipe.from)).cloned())
            })
            .collect())
    }

    /// Write `value` to the output cache at the bare `NodeId` pin (the
    /// node's position-0 output, §4.4).
    pub fn write_output(&mut self, node_id: &NodeId, value: Value) {
        self.output_cache
            .insert(pin_to_pin_id(&Pin::new(node_id.clone())), value);
    }

    /// Read a value out of the output cache by `PinId`.
    pub fn output(&self, pin_id: &PinId) -> Option<&Value> {
        self.output_cache.get(pin_id)
    }

    /// Seed the output cache at an explicit pin, used by the sub-graph
    /// executor to inject argument values into input-marker nodes
    /// (§4.5 step 2).
    pub fn seed_output(&mut self, pin: &Pin, value: Value) {
        self.output_cache.insert(pin_to_pin_id(pin), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_pipe_rejects_missing_endpoint() {
        let mut store = Store::new("g");
        store.add_node("f", "a");
        let pipe = Pipe::new(Pin::new("missing"), Pin::new("a"));
        let err = store.add_pipe(pipe.clone()).unwrap_err();
        assert_eq!(err, DflowError::BrokenPipe { pipe });
    }

    #[test]
    fn del_node_removes_dependent_pipes() {
        let mut store = Store::new("g");
        store.add_node("f", "a");
        store.add_node("f", "b");
        store.add_pipe(Pipe::new(Pin::new("a"), Pin::new("b"))).unwrap();
        store.del_node(&NodeId::from("a"));
        assert!(store.pipe_list().is_empty());
    }

    #[test]
    fn name_override_is_rejected() {
        let mut store = Store::new("g");
        store
            .set_func("f", Callable::Sync(std::rc::Rc::new(|_, _| Ok(Value::Null))), None, 0)
            .unwrap();
        let err = store
            .set_func("f", Callable::Sync(std::rc::Rc::new(|_, _| Ok(Value::Null))), None, 0)
            .unwrap_err();
        assert_eq!(
            err,
            DflowError::NodeOverride {
                node_name: "f".to_string()
            }
        );
    }

    #[test]
    fn arg_values_substitutes_none_for_missing_pipe() {
        let mut store = Store::new("g");
        store
            .set_func(
                "sum",
                Callable::Sync(std::rc::Rc::new(|_, _| Ok(Value::Null))),
                Some(vec!["a".into(), "b".into()]),
                2,
            )
            .unwrap();
        store.add_node("sum", "n1");
        let values = store.arg_values(&NodeId::from("n1")).unwrap();
        assert_eq!(values, vec![None, None]);
    }

    #[test]
    fn arg_values_not_found_for_missing_node() {
        let store = Store::new("g");
        let err = store.arg_values(&NodeId::from("missing")).unwrap_err();
        assert_eq!(
            err,
            DflowError::NodeNotFound {
                node_id: NodeId::from("missing")
            }
        );
    }

    #[test]
    fn arg_values_uses_graph_template_arity_when_no_callable_is_bound() {
        let mut store = Store::new("g");
        store
            .set_node_graph(
                "graph",
                GraphTemplate {
                    args: vec!["input".to_string()],
                    outs: vec!["output".to_string()],
                    nodes: vec![],
                    pipes: vec![],
                },
            )
            .unwrap();
        store.add_node("graph", "n1");
        store.add_node("whatever", "upstream");
        store
            .add_pipe(Pipe::new(Pin::new("upstream"), Pin::new("n1")))
            .unwrap();
        store.write_output(&NodeId::from("upstream"), Value::from(7.0));

        let values = store.arg_values(&NodeId::from("n1")).unwrap();
        assert_eq!(values, vec![Some(Value::from(7.0))]);
    }

    #[test]
    fn callable_and_graph_may_share_a_name() {
        let mut store = Store::new("g");
        store
            .set_func("f", Callable::Sync(std::rc::Rc::new(|_, _| Ok(Value::Null))), None, 0)
            .unwrap();
        store
            .set_node_graph(
                "f",
                GraphTemplate {
                    args: vec![],
                    outs: vec![],
                    nodes: vec![],
                    pipes: vec![],
                },
            )
            .unwrap();
        assert!(store.binding("f").is_some());
        assert!(store.graph_template("f").is_some());
    }

    #[test]
    fn marker_name_cannot_collide_with_a_callable() {
        let mut store = Store::new("g");
        store
            .set_func("f", Callable::Sync(std::rc::Rc::new(|_, _| Ok(Value::Null))), None, 0)
            .unwrap();
        let err = store.set_node_arg("f").unwrap_err();
        assert_eq!(
            err,
            DflowError::NodeOverride {
                node_name: "f".to_string()
            }
        );
    }

    #[test]
    fn delete_collects_dangling_pipes() {
        let mut store = Store::new("g");
        store.add_node("f", "a");
        store.add_node("f", "b");
        store.add_node("f", "c");
        store.add_pipe(Pipe::new(Pin::new("a"), Pin::new("b"))).unwrap();
        store.add_pipe(Pipe::new(Pin::new("b"), Pin::new("c"))).unwrap();
        let (nodes, pipes) = store.delete(&[NodeId::from("b")], &[]);
        assert_eq!(nodes.len(), 1);
        assert_eq!(pipes.len(), 2);
        assert!(store.pipe_list().is_empty());
    }
}

//! The sub-graph executor (§4.5): lazy materialization, function
//! inheritance, argument injection and output extraction.

use crate::error::DflowError;
use crate::id::{pin_to_pin_id, Pin};
use crate::node::NodeId;
use crate::store::{GraphTemplate, Store};
use crate::Dflow;
use std::collections::HashMap;

/// Lazily materialize the sub-graph instance bound to `node_id` if
/// `name` resolves to a template and none exists yet (§4.4 step 1, §4.5:
/// idempotent).
pub(crate) fn materialize(
    instances: &mut HashMap<NodeId, Box<Dflow>>,
    store: &Store,
    node_id: &NodeId,
    name: &str,
) -> Result<Option<()>, DflowError> {
    if instances.contains_key(node_id) {
        return Ok(Some(()));
    }
    let Some(template) = store.graph_template(name) else {
        return Ok(None);
    };
    log::debug!("materializing sub-graph instance for node `{node_id}` ({name})");
    let child = build_instance(name, template, store)?;
    instances.insert(node_id.clone(), Box::new(child));
    Ok(Some(()))
}

/// Build a fresh child engine from a template, inheriting every parent
/// binding whose name is not one of the child's own I/O markers (§4.5
/// *Function inheritance*). The snapshot is copied by value: the child's
/// `HashMap` is independent of the parent's from this point on, so later
/// parent mutations cannot reach it (§8 invariant 6).
///
/// `Store::set_node_graph` performs no validation of a template's own
/// `nodes`/`pipes` against each other, so a template registered with a
/// pipe referencing a nonexistent nested node surfaces as a `BrokenPipe`
/// here, at first materialization, rather than panicking (§7).
fn build_instance(name: &str, template: &GraphTemplate, parent: &Store) -> Result<Dflow, DflowError> {
    let mut child = Dflow::new(name);
    for arg in &template.args {
        let _ = child.store.set_node_arg(arg.clone());
    }
    for out in &template.outs {
        let _ = child.store.set_node_out(out.clone());
    }
    for (inherited_name, binding) in &parent.bindings {
        if child.store.is_io_marker(inherited_name) {
            continue;
        }
        child
            .store
            .bindings
            .insert(inherited_name.clone(), binding.clone());
    }
    child.store.context = parent.context.clone();
    child
        .store
        .insert(template.nodes.clone(), template.pipes.clone())?;
    Ok(child)
}

/// §4.5 steps 1-2: compute the parent-side argument values for
/// `graph_id` and seed the child's output cache at every input-marker
/// node whose name matches a formal argument.
///
/// Per the spec's literal wording, the value for argument `position` is
/// seeded at `pin_to_pin_id([subId, position])` — the marker node's
/// pin *at that argument's index* — not always the marker's bare
/// (position-0) pin. A nested pipe sourcing from that marker must
/// therefore address it as `Pin::at(subId, position)` whenever
/// `position != 0`.
pub(crate) fn inject_args(
    parent: &Store,
    child: &mut Dflow,
    graph_id: &NodeId,
) -> Result<(), DflowError> {
    let arg_values = parent.arg_values(graph_id)?;
    let arg_names = child.store.arg_names.clone();
    let nodes = child.store.nodes.clone();
    for node in nodes {
        if let Some(position) = arg_names.iter().position(|a| *a == node.name) {
            if let Some(value) = arg_values.get(position).cloned().flatten() {
                child.store.seed_output(&Pin::at(node.id.clone(), position), value);
            }
        }
    }
    Ok(())
}

/// §4.5 step 4: for each output-marker node, follow its unique inbound
/// pipe and copy the child's cached value at that pipe's source into the
/// parent's output cache at `pin_to_pin_id([graph_id, position])`.
pub(crate) fn extract_outputs(parent: &mut Store, child: &Store, graph_id: &NodeId) {
    for node in &child.nodes {
        let Some(position) = child.out_names.iter().position(|o| *o == node.name) else {
            continue;
        };
        let target = pin_to_pin_id(&Pin::new(node.id.clone()));
        let Some(pipe) = child.pipe_of_target(&target) else {
            continue;
        };
        let Some(value) = child.output(&pin_to_pin_id(&pipe.from)).cloned() else {
            continue;
        };
        parent.seed_output(&Pin::at(graph_id.clone(), position), value);
    }
}

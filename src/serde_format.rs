//! The persistence format (§6.2): a lossless `{name, args?, outs?, nodes,
//! pipes}` document shared by a whole engine and a registered sub-graph
//! template.

use crate::engine::Dflow;
use crate::error::DflowError;
use crate::node::Node;
use crate::pipe::Pipe;
use crate::store::GraphTemplate;
use serde::{Deserialize, Serialize};

/// The wire form of an engine or a sub-graph template.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphDocument {
    /// The graph's name.
    pub name: String,
    /// Formal argument names, omitted when empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    /// Formal output names, omitted when empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outs: Vec<String>,
    /// The graph's nodes.
    pub nodes: Vec<Node>,
    /// The graph's pipes.
    pub pipes: Vec<Pipe>,
}

impl From<&Dflow> for GraphDocument {
    fn from(dflow: &Dflow) -> Self {
        GraphDocument {
            name: dflow.store.name.clone(),
            args: dflow.store.arg_names.clone(),
            outs: dflow.store.out_names.clone(),
            nodes: dflow.store.nodes.clone(),
            pipes: dflow.store.pipe_list(),
        }
    }
}

impl From<(&str, &GraphTemplate)> for GraphDocument {
    fn from((name, template): (&str, &GraphTemplate)) -> Self {
        GraphDocument {
            name: name.to_string(),
            args: template.args.clone(),
            outs: template.outs.clone(),
            nodes: template.nodes.clone(),
            pipes: template.pipes.clone(),
        }
    }
}

impl GraphDocument {
    /// Build a fresh, freestanding [`Dflow`] from this document: declare
    /// `args`/`outs` as I/O markers, then `insert` the nodes and pipes.
    /// No callables are bound — a document alone never carries them
    /// (§6.1's `Compiler` is the only source of those).
    pub fn into_engine(self) -> Result<Dflow, DflowError> {
        let mut dflow = Dflow::new(self.name);
        for arg in self.args {
            dflow.set_node_arg(arg)?;
        }
        for out in self.outs {
            dflow.set_node_out(out)?;
        }
        dflow.insert(self.nodes, self.pipes)?;
        Ok(dflow)
    }

    fn into_template(self) -> GraphTemplate {
        GraphTemplate {
            args: self.args,
            outs: self.outs,
            nodes: self.nodes,
            pipes: self.pipes,
        }
    }
}

/// Register `document` as a sub-graph template under its own `name`,
/// the document-form counterpart of `Dflow::set_node_graph`.
pub fn register_template(dflow: &mut Dflow, document: GraphDocument) -> Result<(), DflowError> {
    let name = document.name.clone();
    dflow.store.set_node_graph(name, document.into_template())
}

/// The document form of a registered sub-graph template, the other half
/// of §6.2's "an engine (or sub-graph template)" equivalence.
pub fn template_document(dflow: &Dflow, name: &str) -> Option<GraphDocument> {
    dflow
        .store
        .graph_template(name)
        .map(|template| GraphDocument::from((name, template)))
}

/// Serialize an engine to its canonical JSON document (§6.2).
pub fn to_value(dflow: &Dflow) -> Result<serde_json::Value, DflowError> {
    serde_json::to_value(GraphDocument::from(dflow)).map_err(|err| DflowError::NodeExecution {
        node_id: crate::node::NodeId::from(dflow.name()),
        node_name: dflow.name().to_string(),
        node_error_message: err.to_string(),
    })
}

/// Parse a canonical JSON document into a freestanding engine (§6.2).
pub fn from_value(value: serde_json::Value) -> Result<Dflow, DflowError> {
    let document: GraphDocument =
        serde_json::from_value(value).map_err(|err| DflowError::NodeExecution {
            node_id: crate::node::NodeId::from("<document>"),
            node_name: "<document>".to_string(),
            node_error_message: err.to_string(),
        })?;
    document.into_engine()
}

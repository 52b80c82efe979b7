//! The error taxonomy surfaced by a [`crate::Dflow`].

use crate::node::NodeId;
use crate::pipe::Pipe;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An error raised by the graph store, scheduler, dispatcher or sub-graph
/// executor.
///
/// Every variant serializes to `{errorName, ..payload}` (see the
/// `serde(rename_all)` / `tag` attributes), matching the wire shape
/// external tooling expects from a dataflow engine error.
#[derive(Debug, Error, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "errorName")]
pub enum DflowError {
    /// `add_pipe` was given a pipe whose source or target node is absent.
    #[error("broken pipe: {pipe:?}")]
    #[serde(rename = "DflowErrorBrokenPipe")]
    BrokenPipe {
        /// The pipe that could not be inserted.
        pipe: Pipe,
    },

    /// A callable (or a sub-graph it dispatched into) raised an error.
    #[error("node `{node_id}` ({node_name}) failed: {node_error_message}")]
    #[serde(rename = "DflowErrorNodeExecution")]
    NodeExecution {
        /// The id of the node that failed.
        node_id: NodeId,
        /// The name bound to the failing node.
        node_name: String,
        /// The message carried by the underlying error.
        node_error_message: String,
    },

    /// An operation referenced a node id that does not exist.
    #[error("node `{node_id}` not found")]
    #[serde(rename = "DflowErrorNodeNotFound")]
    NodeNotFound {
        /// The id that could not be resolved.
        node_id: NodeId,
    },

    /// A `set_*` call targeted a `Name` that is already bound.
    #[error("name `{node_name}` is already bound")]
    #[serde(rename = "DflowErrorNodeOverride")]
    NodeOverride {
        /// The name that was already taken.
        node_name: String,
    },
}

impl DflowError {
    /// Re-wrap a sub-graph's error with the parent's `graphId`/`graphName`,
    /// preserving the nested message text (§7).
    ///
    /// Errors other than [`DflowError::NodeExecution`] are wrapped as-is;
    /// only node-execution failures carry a message worth nesting.
    pub fn wrap_subgraph(self, graph_id: &NodeId, graph_name: &str) -> Self {
        let message = match &self {
            DflowError::NodeExecution {
                node_id,
                node_name,
                node_error_message,
            } => format!("{node_id} ({node_name}): {node_error_message}"),
            other => other.to_string(),
        };
        DflowError::NodeExecution {
            node_id: graph_id.clone(),
            node_name: graph_name.to_string(),
            node_error_message: message,
        }
    }
}

//! Node identifiers and the `(NodeId, Name)` association stored per vertex.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A node's identifier.
///
/// Generated externally (the engine never invents one): non-empty and
/// free of commas, since a comma separates a [`crate::Pin`]'s node id from
/// its position in the [`crate::PinId`] wire form.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(String);

impl NodeId {
    /// Borrow the id as a plain string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        NodeId(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        NodeId(s)
    }
}

impl std::borrow::Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A vertex in the graph: an id paired with the `Name` it resolves to.
///
/// The `name` is looked up at dispatch time against the graph store's
/// callable table, sub-graph template table and I/O-marker set; nothing
/// here requires `name` to already be bound (§4.2, `add_node`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// The node's unique id within its containing graph.
    pub id: NodeId,
    /// The name this node resolves to.
    pub name: String,
}

impl Node {
    /// Construct a node from an id and a name.
    pub fn new(id: impl Into<NodeId>, name: impl Into<String>) -> Self {
        Node {
            id: id.into(),
            name: name.into(),
        }
    }
}
